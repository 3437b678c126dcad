//! Entity repository trait and implementation
//!
//! Every module table shares the same shape (`id`, `zoho_id`, timestamps,
//! `data`, `created_at`) plus its own mapped columns, so one repository
//! serves all seven tables. Column lists come from [`EntityRecord::fields`];
//! names are checked by [`EntityRecord::validate`] before any SQL is built.

use crate::error::{Result, StoreError};
use crate::models::{ColumnValue, EntityRecord, Module, StoredEntity};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Read access to the mirror plus the entry point for batched writes.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Load every row of the module as `zoho_id -> id`
    async fn load_index(&self, module: Module) -> Result<HashMap<String, i64>>;

    /// Open a write batch backed by one transaction
    ///
    /// On a single-connection pool the batch holds the only connection until
    /// it is committed or rolled back.
    async fn begin(&self, module: Module) -> Result<Box<dyn EntityBatch>>;

    /// Find a row by its vendor id
    ///
    /// # Returns
    /// - `Ok(Some(entity))` if found
    /// - `Ok(None)` if not found
    async fn find_by_zoho_id(&self, module: Module, zoho_id: &str)
        -> Result<Option<StoredEntity>>;

    /// Count rows in the module table
    async fn count(&self, module: Module) -> Result<i64>;
}

/// Writes against one module table inside an open transaction.
#[async_trait]
pub trait EntityBatch: Send {
    /// Insert a new row, returning its local id
    ///
    /// # Errors
    /// Returns error if:
    /// - A row with the same `zoho_id` already exists
    /// - Record validation fails
    async fn insert(&mut self, record: &EntityRecord, created_at: i64) -> Result<i64>;

    /// Overwrite every column of an existing row
    ///
    /// `created_at` is left untouched.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if no row has this id
    async fn update(&mut self, id: i64, record: &EntityRecord) -> Result<()>;

    /// Delete a row by local id
    ///
    /// # Returns
    /// - `Ok(true)` if the row was deleted
    /// - `Ok(false)` if it was not found
    async fn delete(&mut self, id: i64) -> Result<bool>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// SQLite implementation of EntityStore
#[derive(Clone)]
pub struct SqliteEntityStore {
    pool: SqlitePool,
}

impl SqliteEntityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    #[instrument(skip(self))]
    async fn load_index(&self, module: Module) -> Result<HashMap<String, i64>> {
        let sql = format!("SELECT zoho_id, id FROM {}", module.table());
        let rows: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        debug!(module = %module, rows = rows.len(), "Loaded existing index");
        Ok(rows.into_iter().collect())
    }

    async fn begin(&self, module: Module) -> Result<Box<dyn EntityBatch>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteEntityBatch { module, tx }))
    }

    async fn find_by_zoho_id(
        &self,
        module: Module,
        zoho_id: &str,
    ) -> Result<Option<StoredEntity>> {
        let sql = format!(
            "SELECT id, zoho_id, created_time, modified_time, data, created_at FROM {} WHERE zoho_id = ?",
            module.table()
        );
        let entity = sqlx::query_as::<_, StoredEntity>(&sql)
            .bind(zoho_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn count(&self, module: Module) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", module.table());
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

/// An open transaction against one module table.
pub struct SqliteEntityBatch {
    module: Module,
    tx: Transaction<'static, Sqlite>,
}

impl SqliteEntityBatch {
    pub fn module(&self) -> Module {
        self.module
    }

    fn validate(&self, record: &EntityRecord) -> Result<()> {
        record.validate().map_err(|message| StoreError::InvalidInput {
            field: self.module.table().to_string(),
            message,
        })
    }
}

#[async_trait]
impl EntityBatch for SqliteEntityBatch {
    async fn insert(&mut self, record: &EntityRecord, created_at: i64) -> Result<i64> {
        self.validate(record)?;
        let sql = insert_sql(self.module, record);

        let mut query = sqlx::query(&sql)
            .bind(record.zoho_id.clone())
            .bind(record.created_time)
            .bind(record.modified_time)
            .bind(record.data.clone())
            .bind(created_at);
        for (_, value) in &record.fields {
            query = bind_value(query, value);
        }

        let result = query.execute(&mut *self.tx).await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(&mut self, id: i64, record: &EntityRecord) -> Result<()> {
        self.validate(record)?;
        let sql = update_sql(self.module, record);

        let mut query = sqlx::query(&sql)
            .bind(record.created_time)
            .bind(record.modified_time)
            .bind(record.data.clone());
        for (_, value) in &record.fields {
            query = bind_value(query, value);
        }

        let result = query.bind(id).execute(&mut *self.tx).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity_type: self.module.table().to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&mut self, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.module.table());
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// =============================================================================
// SQL building
// =============================================================================

fn insert_sql(module: Module, record: &EntityRecord) -> String {
    let mut columns = vec!["zoho_id", "created_time", "modified_time", "data", "created_at"];
    columns.extend(record.fields.iter().map(|(name, _)| *name));
    let placeholders = vec!["?"; columns.len()].join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        module.table(),
        columns.join(", "),
        placeholders
    )
}

fn update_sql(module: Module, record: &EntityRecord) -> String {
    let assignments = ["created_time", "modified_time", "data"]
        .into_iter()
        .chain(record.fields.iter().map(|(name, _)| *name))
        .map(|column| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    format!("UPDATE {} SET {} WHERE id = ?", module.table(), assignments)
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &ColumnValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        ColumnValue::Text(v) => query.bind(v.clone()),
        ColumnValue::Integer(v) => query.bind(*v),
        ColumnValue::Real(v) => query.bind(*v),
        ColumnValue::Boolean(v) => query.bind(*v),
        ColumnValue::Date(v) => query.bind(*v),
        ColumnValue::DateTime(v) => query.bind(*v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use chrono::{NaiveDate, TimeZone, Utc};

    async fn setup_store() -> SqliteEntityStore {
        let pool = create_test_pool().await.unwrap();
        SqliteEntityStore::new(pool)
    }

    fn contact(zoho_id: &str, name: &str) -> EntityRecord {
        EntityRecord {
            zoho_id: zoho_id.to_string(),
            created_time: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            modified_time: None,
            data: format!(r#"{{"id":"{}"}}"#, zoho_id),
            fields: vec![
                ("full_name", ColumnValue::Text(Some(name.to_string()))),
                ("email", ColumnValue::Text(None)),
            ],
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = setup_store().await;

        let mut batch = store.begin(Module::Contacts).await.unwrap();
        let id = batch.insert(&contact("100", "Ada"), 1_700_000_000).await.unwrap();
        batch.commit().await.unwrap();

        let found = store
            .find_by_zoho_id(Module::Contacts, "100")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.created_at, 1_700_000_000);
        assert_eq!(
            found.created_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(found.data.as_deref(), Some(r#"{"id":"100"}"#));
        assert_eq!(store.count(Module::Contacts).await.unwrap(), 1);
        assert_eq!(store.count(Module::Accounts).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_overwrites_and_keeps_created_at() {
        let store = setup_store().await;

        let mut batch = store.begin(Module::Contacts).await.unwrap();
        let id = batch.insert(&contact("100", "Ada"), 10).await.unwrap();
        batch.update(id, &contact("100", "Grace")).await.unwrap();
        batch.commit().await.unwrap();

        let (name, created_at): (Option<String>, i64) =
            sqlx::query_as("SELECT full_name, created_at FROM contacts WHERE id = ?")
                .bind(id)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(name.as_deref(), Some("Grace"));
        assert_eq!(created_at, 10);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = setup_store().await;

        let mut batch = store.begin(Module::Contacts).await.unwrap();
        let err = batch.update(42, &contact("1", "Ada")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        batch.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_zoho_id_fails_without_breaking_batch() {
        let store = setup_store().await;

        let mut batch = store.begin(Module::Contacts).await.unwrap();
        batch.insert(&contact("1", "Ada"), 0).await.unwrap();
        assert!(batch.insert(&contact("1", "Again"), 0).await.is_err());
        batch.insert(&contact("2", "Grace"), 0).await.unwrap();
        batch.commit().await.unwrap();

        assert_eq!(store.count(Module::Contacts).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_zoho_id_length_enforced() {
        let store = setup_store().await;

        let mut batch = store.begin(Module::Contacts).await.unwrap();
        let long_id = "9".repeat(101);
        assert!(batch.insert(&contact(&long_id, "Ada"), 0).await.is_err());
        batch.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = setup_store().await;

        let mut batch = store.begin(Module::Contacts).await.unwrap();
        batch.insert(&contact("1", "Ada"), 0).await.unwrap();
        batch.rollback().await.unwrap();

        assert_eq!(store.count(Module::Contacts).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_index_and_delete() {
        let store = setup_store().await;

        let mut batch = store.begin(Module::Contacts).await.unwrap();
        let a = batch.insert(&contact("A", "Ada"), 0).await.unwrap();
        let b = batch.insert(&contact("B", "Bob"), 0).await.unwrap();
        batch.commit().await.unwrap();

        let index = store.load_index(Module::Contacts).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("A"), Some(&a));
        assert_eq!(index.get("B"), Some(&b));

        let mut batch = store.begin(Module::Contacts).await.unwrap();
        assert!(batch.delete(a).await.unwrap());
        assert!(!batch.delete(a).await.unwrap());
        batch.commit().await.unwrap();

        assert!(store
            .find_by_zoho_id(Module::Contacts, "A")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_typed_columns_round_trip() {
        let store = setup_store().await;
        let record = EntityRecord {
            zoho_id: "P1".to_string(),
            created_time: None,
            modified_time: None,
            data: "{}".to_string(),
            fields: vec![
                ("deal_name", ColumnValue::Text(Some("Big deal".to_string()))),
                ("amount", ColumnValue::Real(Some(1250.5))),
                (
                    "closing_date",
                    ColumnValue::Date(NaiveDate::from_ymd_opt(2024, 3, 31)),
                ),
                ("probability", ColumnValue::Real(None)),
            ],
        };

        let mut batch = store.begin(Module::Pipelines).await.unwrap();
        batch.insert(&record, 0).await.unwrap();
        batch.commit().await.unwrap();

        let (amount, closing, probability): (Option<f64>, Option<NaiveDate>, Option<f64>) =
            sqlx::query_as(
                "SELECT amount, closing_date, probability FROM pipelines WHERE zoho_id = 'P1'",
            )
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(amount, Some(1250.5));
        assert_eq!(closing, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(probability, None);
    }

    #[tokio::test]
    async fn test_flag_column_stored_as_integer() {
        let store = setup_store().await;
        let record = EntityRecord {
            zoho_id: "E1".to_string(),
            created_time: None,
            modified_time: None,
            data: "{}".to_string(),
            fields: vec![("all_day", ColumnValue::Boolean(Some(true)))],
        };

        let mut batch = store.begin(Module::Events).await.unwrap();
        batch.insert(&record, 0).await.unwrap();
        batch.commit().await.unwrap();

        let (all_day,): (Option<i64>,) =
            sqlx::query_as("SELECT all_day FROM events WHERE zoho_id = 'E1'")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(all_day, Some(1));
    }

    #[tokio::test]
    async fn test_invalid_column_name_rejected() {
        let store = setup_store().await;
        let mut record = contact("1", "Ada");
        record.fields.push(("bad column", ColumnValue::Text(None)));

        let mut batch = store.begin(Module::Contacts).await.unwrap();
        let err = batch.insert(&record, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput { .. }));
        batch.rollback().await.unwrap();
    }

    #[test]
    fn test_sql_builders() {
        let record = contact("1", "Ada");
        assert_eq!(
            insert_sql(Module::Contacts, &record),
            "INSERT INTO contacts (zoho_id, created_time, modified_time, data, created_at, full_name, email) VALUES (?, ?, ?, ?, ?, ?, ?)"
        );
        assert_eq!(
            update_sql(Module::Contacts, &record),
            "UPDATE contacts SET created_time = ?, modified_time = ?, data = ?, full_name = ?, email = ? WHERE id = ?"
        );
    }
}
