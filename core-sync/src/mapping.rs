//! # Field Tables
//!
//! One ordered `(source field, column, converter)` table per module and a
//! single routine that applies it to a vendor record.

use crate::normalize::{
    duration_seconds, email_from, json_text_or_none, name_from, parse_bool, parse_date,
    parse_datetime, parse_float, parse_int, python_json, safe_str,
};
use core_store::{ColumnValue, EntityRecord, Module};
use serde_json::Value;

/// How a source value becomes a column value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    Text,
    Name,
    Email,
    Int,
    Real,
    Date,
    DateTime,
    Flag,
    Json,
    Duration,
}

impl Converter {
    pub fn apply(self, value: Option<&Value>) -> ColumnValue {
        match self {
            Converter::Text => ColumnValue::Text(safe_str(value)),
            Converter::Name => ColumnValue::Text(name_from(value)),
            Converter::Email => ColumnValue::Text(email_from(value)),
            Converter::Int => ColumnValue::Integer(parse_int(value)),
            Converter::Real => ColumnValue::Real(parse_float(value)),
            Converter::Date => ColumnValue::Date(parse_date(value)),
            Converter::DateTime => ColumnValue::DateTime(parse_datetime(value)),
            Converter::Flag => ColumnValue::Boolean(parse_bool(value)),
            Converter::Json => ColumnValue::Text(json_text_or_none(value)),
            Converter::Duration => ColumnValue::Integer(duration_seconds(value)),
        }
    }
}

/// One row of a field table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: &'static str,
    pub column: &'static str,
    pub converter: Converter,
}

const fn field(source: &'static str, column: &'static str, converter: Converter) -> FieldMapping {
    FieldMapping {
        source,
        column,
        converter,
    }
}

use Converter::{
    Date as D, DateTime as Dt, Duration as Dur, Email as E, Flag as F, Int as I, Json as J,
    Name as N, Real as R, Text as T,
};

pub static CONTACTS: &[FieldMapping] = &[
    field("Full_Name", "full_name", T),
    field("First_Name", "first_name", T),
    field("Last_Name", "last_name", T),
    field("Email", "email", T),
    field("Phone", "phone", T),
    field("Mobile", "mobile", T),
    field("Account_Name", "account_name", N),
    field("Title", "title", T),
    field("Department", "department", T),
    field("Owner", "owner_name", N),
    field("Owner", "owner_email", E),
    field("Mailing_Street", "mailing_street", T),
    field("Mailing_City", "mailing_city", T),
    field("Mailing_State", "mailing_state", T),
    field("Mailing_Zip", "mailing_zip", T),
    field("Mailing_Country", "mailing_country", T),
    field("Description", "description", T),
    field("Lead_Source", "lead_source", T),
];

pub static ACCOUNTS: &[FieldMapping] = &[
    field("Account_Name", "account_name", T),
    field("Firm_Name", "firm_name", T),
    field("Phone", "phone", T),
    field("Website", "website", T),
    field("Owner", "owner_name", N),
    field("Owner", "owner_email", E),
    field("Billing_Street", "billing_street", T),
    field("Billing_City", "billing_city", T),
    field("Billing_State", "billing_state", T),
    field("Billing_Code", "billing_code", T),
    field("Billing_Country", "billing_country", T),
    field("Line_of_Business", "line_of_business", T),
    field("No_of_Branches", "no_of_branches", I),
    field("Revenue_Type", "revenue_type", T),
    field("Payment_Terms", "payment_terms", T),
    field("GSTIN_UIN", "gstin_uin", T),
    field("Expected_Services_Type", "expected_services_type", T),
    field("Description", "description", T),
    field("Last_Activity_Time", "last_activity_time", Dt),
];

pub static PIPELINES: &[FieldMapping] = &[
    field("Deal_Name", "deal_name", T),
    field("Account_Name", "account_name", N),
    field("Contact_Name", "contact_name", N),
    field("Stage", "stage", T),
    field("Amount", "amount", R),
    field("Closing_Date", "closing_date", D),
    field("Pipeline", "pipeline", T),
    field("Sub_Pipeline", "sub_pipeline", T),
    field("Owner", "owner_name", N),
    field("Owner", "owner_email", E),
    field("Deal_Type", "deal_type", T),
    field("Business_Type", "business_type", T),
    field("Expected_Services_Type", "expected_services_type", T),
    field("Lead_Source", "lead_source", T),
    field("Lead_Source_From", "lead_source_from", T),
    field("Lead_Origin", "lead_origin", T),
    field("Probability", "probability", R),
    field("Next_Step", "next_step", T),
    field("Revenue_Type", "revenue_type", T),
    field("Recurring_Mode", "recurring_mode", T),
    field("Follow_up_Date", "follow_up_date", D),
    field("Description", "description", T),
    field("Last_Activity_Time", "last_activity_time", Dt),
];

pub static CALLS: &[FieldMapping] = &[
    field("Subject", "subject", T),
    field("Call_Type", "call_type", T),
    field("Call_Status", "call_status", T),
    field("Call_Purpose", "call_purpose", T),
    field("Call_Agenda", "call_agenda", T),
    field("Call_Duration", "call_duration", T),
    field("Call_Duration", "call_duration_seconds", Dur),
    field("Call_Start_Time", "call_start_time", Dt),
    field("Caller_ID", "caller_id", T),
    field("Who_Id", "who_id_name", N),
    field("Owner", "owner_name", N),
    field("Owner", "owner_email", E),
    field("Description", "description", T),
    field("Voice_Recording__s", "voice_recording", T),
    field("Reminder", "reminder", T),
];

pub static EVENTS: &[FieldMapping] = &[
    field("Event_Title", "event_title", T),
    field("Start_DateTime", "start_datetime", Dt),
    field("End_DateTime", "end_datetime", Dt),
    field("All_day", "all_day", F),
    field("Venue", "venue", T),
    field("Owner", "owner_name", N),
    field("Owner", "owner_email", E),
    field("Description", "description", T),
    field("Participants", "participants", J),
    field("Remind_At", "remind_at", Dt),
    field("Check_In_Time", "check_in_time", Dt),
    field("RIQ_Check_out_Time", "check_out_time", Dt),
    field("RIQ_Time_Spent_at_Location_mins", "time_spent_mins", I),
    field("$related_module", "related_module", T),
    field("BookingId", "booking_id", T),
];

pub static TASKS: &[FieldMapping] = &[
    field("Subject", "subject", T),
    field("Due_Date", "due_date", D),
    field("Status", "status", T),
    field("Priority", "priority", T),
    field("Owner", "owner_name", N),
    field("Owner", "owner_email", E),
    field("Related_To", "related_to_name", N),
    field("$related_module", "related_to_module", T),
    field("Description", "description", T),
    field("Remind_At", "remind_at", Dt),
];

pub static NOTES: &[FieldMapping] = &[
    field("Note_Title", "note_title", T),
    field("Note_Content", "note_content", T),
    field("Owner", "owner_name", N),
    field("Owner", "owner_email", E),
    field("Parent_Id", "parent_id_name", N),
    field("$se_module", "parent_module", T),
];

pub fn field_table(module: Module) -> &'static [FieldMapping] {
    match module {
        Module::Contacts => CONTACTS,
        Module::Accounts => ACCOUNTS,
        Module::Pipelines => PIPELINES,
        Module::Calls => CALLS,
        Module::Events => EVENTS,
        Module::Tasks => TASKS,
        Module::Notes => NOTES,
    }
}

/// Vendor id of a record, if it has a usable one
pub fn external_id(record: &Value) -> Option<String> {
    safe_str(record.get("id")).filter(|id| !id.trim().is_empty())
}

/// Apply the module's field table, plus the shared columns.
pub fn map_record(module: Module, zoho_id: &str, record: &Value) -> EntityRecord {
    let fields = field_table(module)
        .iter()
        .map(|mapping| (mapping.column, mapping.converter.apply(record.get(mapping.source))))
        .collect();

    EntityRecord {
        zoho_id: zoho_id.to_string(),
        created_time: parse_datetime(record.get("Created_Time")),
        modified_time: parse_datetime(record.get("Modified_Time")),
        data: python_json(record),
        fields,
    }
}
