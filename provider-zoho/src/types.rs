//! Bigin API response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page from a module list endpoint
///
/// Records stay as raw JSON; mapping happens in the sync engine.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecordsPage {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub info: PageInfo,
}

/// Pagination block of a list response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageInfo {
    #[serde(default)]
    pub more_records: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// Response of `settings/fields?module=`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FieldsResponse {
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldMeta {
    pub api_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl FieldsResponse {
    /// Comma-joined `api_name` list, or `None` when the module reports no fields
    pub fn field_list(&self) -> Option<String> {
        let names: Vec<&str> = self
            .fields
            .iter()
            .map(|f| f.api_name.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_page_deserialization() {
        let json = r#"{
            "data": [{"id": "1"}, {"id": "2", "Full_Name": "Ada"}],
            "info": {"per_page": 200, "count": 2, "page": 1, "more_records": true}
        }"#;

        let page: RecordsPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.data.len(), 2);
        assert!(page.info.more_records);
        assert_eq!(page.info.page, Some(1));
    }

    #[test]
    fn test_records_page_missing_info_means_last_page() {
        let page: RecordsPage = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(!page.info.more_records);
    }

    #[test]
    fn test_field_list() {
        let json = r#"{"fields": [
            {"api_name": "id", "data_type": "bigint"},
            {"api_name": "Full_Name"},
            {"api_name": "Owner", "data_type": "ownerlookup"}
        ]}"#;
        let response: FieldsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.field_list().as_deref(), Some("id,Full_Name,Owner"));

        let empty: FieldsResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.field_list(), None);
    }
}
