//! SQLite Settings Store
//!
//! Persists settings in a relational table with a configurable name and
//! tenant column prefix (`{prefix}_type`, `{prefix}_id`).

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use tracing::debug;

use crate::codec::TypeTag;
use crate::error::{Result, SettingsError};
use crate::store::{encode_for_storage, Setting, SettingsStore};
use crate::tenant::TenantScope;

// == SQLite Settings Store ==
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
    table: String,
    column_prefix: String,
}

impl SqliteSettingsStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>, table: &str, column_prefix: &str) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn, table, column_prefix)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory(table: &str, column_prefix: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, table, column_prefix)
    }

    fn with_connection(conn: Connection, table: &str, column_prefix: &str) -> Result<Self> {
        for (option, name) in [("table_name", table), ("tenant_column_prefix", column_prefix)] {
            if !is_identifier(name) {
                return Err(SettingsError::Configuration(format!(
                    "{} must be a plain SQL identifier, got '{}'",
                    option, name
                )));
            }
        }

        let store = Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            column_prefix: column_prefix.to_string(),
        };
        store.init_schema()?;
        debug!(table, column_prefix, "SQLite settings store ready");
        Ok(store)
    }

    /// Creates the table and the (key, tenant) uniqueness index.
    fn init_schema(&self) -> Result<()> {
        let (t, p) = (&self.table, &self.column_prefix);
        self.conn.lock().execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {t} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL,
                value TEXT,
                type TEXT NOT NULL DEFAULT 'string',
                description TEXT,
                {p}_type TEXT,
                {p}_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS {t}_key_tenant_unique
                ON {t} (key, IFNULL({p}_type, ''), IFNULL({p}_id, 0));
            CREATE INDEX IF NOT EXISTS {t}_tenant_idx ON {t} ({p}_type, {p}_id);
            "#
        ))?;
        Ok(())
    }

    fn columns(&self) -> String {
        let p = &self.column_prefix;
        format!(
            "id, key, value, type, description, {p}_type, {p}_id, created_at, updated_at"
        )
    }

    /// Null-safe scope predicate bound to parameters `?1` (type) and `?2` (id).
    fn scope_clause(&self) -> String {
        let p = &self.column_prefix;
        format!("{p}_type IS ?1 AND {p}_id IS ?2")
    }

    fn fetch(conn: &Connection, sql: &str, id: i64) -> Result<Setting> {
        Ok(conn.query_row(sql, [id], row_to_setting)?)
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn find(&self, scope: &TenantScope, key: &str) -> Result<Option<Setting>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} AND key = ?3",
            self.columns(),
            self.table,
            self.scope_clause()
        );
        let conn = self.conn.lock();
        let setting = conn
            .query_row(
                &sql,
                params![scope.model_type(), scope.tenant_id(), key],
                row_to_setting,
            )
            .optional()?;
        Ok(setting)
    }

    fn upsert(
        &self,
        scope: &TenantScope,
        key: &str,
        value: &Value,
        description: Option<&str>,
    ) -> Result<Setting> {
        let (type_tag, raw_value) = encode_for_storage(value);
        let now = Utc::now().to_rfc3339();
        let p = &self.column_prefix;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT id FROM {} WHERE {} AND key = ?3",
                    self.table,
                    self.scope_clause()
                ),
                params![scope.model_type(), scope.tenant_id(), key],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                tx.execute(
                    &format!(
                        "UPDATE {} SET value = ?1, type = ?2, \
                         description = COALESCE(?3, description), updated_at = ?4 \
                         WHERE id = ?5",
                        self.table
                    ),
                    params![raw_value, type_tag.as_str(), description, now, id],
                )?;
                id
            }
            None => {
                tx.execute(
                    &format!(
                        "INSERT INTO {} (key, value, type, description, {p}_type, {p}_id, \
                         created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                        self.table
                    ),
                    params![
                        key,
                        raw_value,
                        type_tag.as_str(),
                        description,
                        scope.model_type(),
                        scope.tenant_id(),
                        now
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        let sql = format!("SELECT {} FROM {} WHERE id = ?1", self.columns(), self.table);
        let setting = Self::fetch(&tx, &sql, id)?;
        tx.commit()?;
        Ok(setting)
    }

    fn delete(&self, scope: &TenantScope, key: &str) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE {} AND key = ?3",
            self.table,
            self.scope_clause()
        );
        let removed = self
            .conn
            .lock()
            .execute(&sql, params![scope.model_type(), scope.tenant_id(), key])?;
        Ok(removed > 0)
    }

    fn list(&self, scope: &TenantScope) -> Result<Vec<Setting>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY key",
            self.columns(),
            self.table,
            self.scope_clause()
        );
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let settings = stmt
            .query_map(params![scope.model_type(), scope.tenant_id()], row_to_setting)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(settings)
    }

    fn delete_all(&self, scope: &TenantScope) -> Result<usize> {
        let sql = format!("DELETE FROM {} WHERE {}", self.table, self.scope_clause());
        let removed = self
            .conn
            .lock()
            .execute(&sql, params![scope.model_type(), scope.tenant_id()])?;
        Ok(removed)
    }

    fn list_scopes(&self) -> Result<Vec<TenantScope>> {
        let p = &self.column_prefix;
        let sql = format!("SELECT DISTINCT {p}_type, {p}_id FROM {}", self.table);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let scopes = stmt
            .query_map([], |row| {
                let model_type: Option<String> = row.get(0)?;
                let id: Option<i64> = row.get(1)?;
                Ok(match (model_type, id) {
                    (Some(model_type), Some(id)) => TenantScope::Tenant { model_type, id },
                    _ => TenantScope::Global,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(scopes)
    }
}

// == Row Mapping ==
fn row_to_setting(row: &Row<'_>) -> rusqlite::Result<Setting> {
    let type_name: String = row.get(3)?;
    let type_tag = type_name
        .parse::<TypeTag>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Setting {
        id: row.get(0)?,
        key: row.get(1)?,
        raw_value: row.get(2)?,
        type_tag,
        description: row.get(4)?,
        tenant_type: row.get(5)?,
        tenant_id: row.get(6)?,
        created_at: parse_timestamp(row, 7)?,
        updated_at: parse_timestamp(row, 8)?,
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
