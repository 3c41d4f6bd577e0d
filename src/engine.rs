//! Execution bridge for hana-bridge.
//!
//! [`HanaConnection`] owns the call-level transport and turns SQL text into
//! result sets. Every statement handle it opens is closed before the call
//! returns, on success and on failure.

use std::fmt;
use std::time::Instant;

use serde::de::DeserializeOwned;

use crate::ast::Value;
use crate::cache::SchemaCache;
use crate::config::ConnectionConfig;
use crate::error::{HanaError, HanaResult};
use crate::quoting::{BoundValue, Quoting};
use crate::schema::{ColumnDefinition, Sequence};
use crate::transpiler;
use crate::transport::{StatementGuard, Transport};

pub const ADAPTER_NAME: &str = "Hana";

/// Isolation levels accepted by [`HanaConnection::set_isolation_level`].
pub const ISOLATION_LEVELS: [&str; 3] = ["READ COMMITTED", "REPEATABLE READ", "SERIALIZABLE"];

/// A value to bind, optionally typed by the column it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub column: Option<ColumnDefinition>,
    pub value: Value,
}

impl Bind {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            column: None,
            value: value.into(),
        }
    }

    pub fn for_column(column: ColumnDefinition, value: impl Into<Value>) -> Self {
        Self {
            column: Some(column),
            value: value.into(),
        }
    }
}

/// Column names (lower-cased) plus raw rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| Record::new(self.columns.iter().cloned().zip(row.iter().cloned()).collect()))
            .collect()
    }
}

/// One result row. Field lookup ignores case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }

    /// Deserialize into a host type by field name.
    pub fn instantiate<T: DeserializeOwned>(&self) -> HanaResult<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "READ ONLY",
            AccessMode::ReadWrite => "READ WRITE",
        }
    }
}

/// A live connection speaking the HANA dialect.
pub struct HanaConnection {
    transport: Box<dyn Transport>,
    config: ConnectionConfig,
    quoting: Quoting,
    cache: SchemaCache,
}

impl fmt::Debug for HanaConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HanaConnection")
            .field("schema", &self.config.schema())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl HanaConnection {
    /// Wrap a transport without touching the server.
    ///
    /// Fails with a configuration error when a required option is missing.
    pub fn new(transport: Box<dyn Transport>, config: ConnectionConfig) -> HanaResult<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            quoting: Quoting::new(config.default_timezone),
            config,
            cache: SchemaCache::default(),
        })
    }

    /// Wrap a transport and make sure the configured schema exists and is current.
    pub fn open(transport: Box<dyn Transport>, config: ConnectionConfig) -> HanaResult<Self> {
        let mut conn = Self::new(transport, config)?;
        conn.setup_schema()?;
        tracing::info!(schema = %conn.schema_name(), "connected");
        Ok(conn)
    }

    pub fn adapter_name(&self) -> &'static str {
        ADAPTER_NAME
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn quoting(&self) -> &Quoting {
        &self.quoting
    }

    pub fn schema_name(&self) -> &str {
        self.config.schema()
    }

    pub(crate) fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut SchemaCache {
        &mut self.cache
    }

    /// Run `f` against the transport, logging the statement and its duration.
    pub(crate) fn logged<T>(
        &mut self,
        sql: &str,
        name: Option<&str>,
        f: impl FnOnce(&mut dyn Transport) -> HanaResult<T>,
    ) -> HanaResult<T> {
        let name = name.unwrap_or("SQL");
        let started = Instant::now();
        let result = f(self.transport.as_mut());
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(_) => tracing::debug!(name, sql, elapsed_ms, "statement"),
            Err(err) => tracing::warn!(name, sql, elapsed_ms, error = %err, "statement failed"),
        }
        result
    }

    // === Queries ===

    /// Run a statement and fetch all of its rows.
    ///
    /// Without binds the SQL is sent as-is; otherwise the values are cast
    /// and bound positionally.
    pub fn exec_query(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &[Bind],
    ) -> HanaResult<QueryResult> {
        let params: Vec<BoundValue> = binds
            .iter()
            .map(|bind| self.quoting.cast_value(&bind.value, bind.column.as_ref()))
            .collect();
        self.logged(sql, name, |transport| {
            let mut statement = StatementGuard::new(transport.run(sql, &params)?);
            let columns = statement
                .columns()
                .into_iter()
                .map(|c| c.name.to_lowercase())
                .collect();
            let rows = statement.fetch_all()?;
            statement.release()?;
            Ok(QueryResult { columns, rows })
        })
    }

    /// Run a statement for its side effects.
    pub fn execute(&mut self, sql: &str, name: Option<&str>) -> HanaResult<()> {
        self.logged(sql, name, |transport| {
            let statement = StatementGuard::new(transport.run(sql, &[])?);
            Ok(statement.release()?)
        })
    }

    pub fn select_all(&mut self, sql: &str, name: Option<&str>) -> HanaResult<Vec<Record>> {
        Ok(self.exec_query(sql, name, &[])?.records())
    }

    pub fn select_one(&mut self, sql: &str, name: Option<&str>) -> HanaResult<Option<Record>> {
        Ok(self.select_all(sql, name)?.into_iter().next())
    }

    pub fn select_rows(&mut self, sql: &str, name: Option<&str>) -> HanaResult<Vec<Vec<Value>>> {
        Ok(self.exec_query(sql, name, &[])?.rows)
    }

    /// First column of the first row.
    pub fn select_value(&mut self, sql: &str, name: Option<&str>) -> HanaResult<Option<Value>> {
        Ok(self
            .select_rows(sql, name)?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next()))
    }

    /// First column of every row.
    pub fn select_values(&mut self, sql: &str, name: Option<&str>) -> HanaResult<Vec<Value>> {
        Ok(self
            .select_rows(sql, name)?
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    /// Typed rows, deserialized by field name.
    pub fn select_as<T: DeserializeOwned>(
        &mut self,
        sql: &str,
        name: Option<&str>,
    ) -> HanaResult<Vec<T>> {
        self.select_all(sql, name)?
            .iter()
            .map(Record::instantiate)
            .collect()
    }

    /// Run an INSERT and report the key of the new row.
    ///
    /// An explicit `id_value` wins; otherwise the sequence's current value is
    /// read back.
    pub fn insert(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &[Bind],
        id_value: Option<Value>,
        sequence: Option<&Sequence>,
    ) -> HanaResult<Option<Value>> {
        self.exec_query(sql, name, binds)?;
        match (id_value, sequence) {
            (Some(id), _) => Ok(Some(id)),
            (None, Some(sequence)) => self.last_insert_value(sequence),
            (None, None) => Ok(None),
        }
    }

    pub fn explain(&mut self, sql: &str, binds: &[Bind]) -> HanaResult<String> {
        let result = self.exec_query(&format!("EXPLAIN PLAN FOR {}", sql), Some("EXPLAIN"), binds)?;
        let lines: Vec<String> = result
            .rows
            .iter()
            .map(|row| row.iter().map(Value::to_string).collect::<Vec<_>>().join("|"))
            .collect();
        Ok(lines.join("\n") + "\n")
    }

    // === Transactions ===

    /// The server opens transactions implicitly.
    pub fn begin_db_transaction(&mut self) -> HanaResult<()> {
        Ok(())
    }

    pub fn commit_db_transaction(&mut self) -> HanaResult<()> {
        self.execute("COMMIT", Some("TRANSACTION"))
    }

    pub fn rollback_db_transaction(&mut self) -> HanaResult<()> {
        self.execute("ROLLBACK", Some("TRANSACTION"))
    }

    pub fn create_savepoint(&mut self, _name: &str) -> HanaResult<()> {
        Err(HanaError::Unsupported("savepoints"))
    }

    pub fn rollback_to_savepoint(&mut self, _name: &str) -> HanaResult<()> {
        Err(HanaError::Unsupported("savepoints"))
    }

    pub fn release_savepoint(&mut self, _name: &str) -> HanaResult<()> {
        Err(HanaError::Unsupported("savepoints"))
    }

    pub fn set_isolation_level(&mut self, level: &str) -> HanaResult<()> {
        let normalized = level.trim().replace('_', " ").to_uppercase();
        if !ISOLATION_LEVELS.contains(&normalized.as_str()) {
            return Err(HanaError::argument(format!(
                "Invalid isolation level, {}. Supported levels include {}.",
                level,
                ISOLATION_LEVELS.join(", ")
            )));
        }
        self.execute(
            &format!("SET TRANSACTION ISOLATION LEVEL {}", normalized),
            Some("TRANSACTION"),
        )
    }

    pub fn set_access_mode(&mut self, mode: AccessMode) -> HanaResult<()> {
        self.execute(&format!("SET TRANSACTION {}", mode.keyword()), Some("TRANSACTION"))
    }

    pub fn lock_table(&mut self, table: &str) -> HanaResult<()> {
        self.execute(&transpiler::lock_table_sql(table), Some("LOCK"))
    }

    // === Connection state ===

    /// Whether the server still answers a trivial query.
    pub fn active(&mut self) -> bool {
        self.select_value("SELECT 1 FROM DUMMY", Some("PING")).is_ok()
    }

    pub fn disconnect(&mut self) -> HanaResult<()> {
        self.cache.clear();
        Ok(self.transport.disconnect()?)
    }

    /// Forget cached metadata.
    pub fn reset(&mut self) {
        self.cache.clear();
    }
}
