//! Schema statements: tables, columns, indexes, sequences and catalog
//! introspection, run through the execution bridge.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::ast::{LogicalType, Value};
use crate::engine::HanaConnection;
use crate::error::{HanaError, HanaResult};
use crate::quoting::{quote_column_name, unqualify_table_name};
use crate::transpiler::{self, catalog};

/// Storage kind placed after `CREATE` in a table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Row,
    #[default]
    Column,
    HistoryColumn,
    GlobalTemporary,
    LocalTemporary,
}

impl TableKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            TableKind::Row => "ROW",
            TableKind::Column => "COLUMN",
            TableKind::HistoryColumn => "HISTORY COLUMN",
            TableKind::GlobalTemporary => "GLOBAL TEMPORARY",
            TableKind::LocalTemporary => "LOCAL TEMPORARY",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for TableKind {
    type Err = HanaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "row" => Ok(TableKind::Row),
            "column" => Ok(TableKind::Column),
            "history" | "history_column" => Ok(TableKind::HistoryColumn),
            "global_temporary" => Ok(TableKind::GlobalTemporary),
            "local_temporary" => Ok(TableKind::LocalTemporary),
            other => Err(HanaError::argument(format!("Unknown table kind '{}'", other))),
        }
    }
}

/// Column as reported by `TABLE_COLUMNS`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    name: String,
    sql_type: String,
    null: bool,
    default: Option<String>,
    precision: Option<u32>,
    scale: Option<u32>,
    logical_type: Option<LogicalType>,
}

impl ColumnDefinition {
    pub fn new(
        name: impl Into<String>,
        sql_type: impl Into<String>,
        null: bool,
        default: Option<String>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> Self {
        let sql_type = sql_type.into();
        Self {
            name: name.into(),
            logical_type: LogicalType::from_sql_type(&sql_type),
            sql_type,
            null,
            default,
            precision,
            scale,
        }
    }

    /// Build from a `table_structure` row:
    /// `[COLUMN_NAME, DEFAULT_VALUE, DATA_TYPE_NAME, IS_NULLABLE, LENGTH, SCALE]`.
    pub fn from_catalog_row(row: &[Value]) -> Self {
        let text = |i: usize| row.get(i).filter(|v| !v.is_null()).map(|v| v.to_string());
        let number = |i: usize| {
            row.get(i)
                .and_then(Value::as_i64)
                .and_then(|n| u32::try_from(n).ok())
        };
        let null = match row.get(3) {
            Some(Value::Bool(b)) => *b,
            Some(v) => v.to_string().eq_ignore_ascii_case("TRUE"),
            None => true,
        };
        Self::new(
            text(0).unwrap_or_default(),
            text(2).unwrap_or_default(),
            null,
            text(1),
            number(4),
            number(5),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    pub fn null(&self) -> bool {
        self.null
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    pub fn scale(&self) -> Option<u32> {
        self.scale
    }

    pub fn logical_type(&self) -> Option<LogicalType> {
        self.logical_type
    }

    /// Type with its length or precision, suitable for re-declaring the column.
    pub fn full_sql_type(&self) -> String {
        let upper = self.sql_type.to_uppercase();
        let sized = upper.contains("CHAR") || upper.contains("BINARY") || upper == "ALPHANUM";
        match (self.precision, self.scale) {
            (Some(p), Some(s)) if upper.contains("DECIMAL") => format!("{}({},{})", upper, p, s),
            (Some(len), _) if sized => format!("{}({})", upper, len),
            _ => upper,
        }
    }
}

/// Memoized view of one table's structure.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    /// Keyed by lower-cased column name.
    pub columns_hash: HashMap<String, ColumnDefinition>,
    pub primary_key: Option<String>,
}

impl TableMetadata {
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns_hash.get(&name.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub table: String,
    pub name: String,
    pub unique: bool,
}

/// The counter object backing a table's auto-assigned key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence {
    table: String,
}

impl Sequence {
    pub fn for_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `users` -> `users_seq`
    pub fn name(&self) -> String {
        format!("{}_seq", self.table)
    }

    /// `users` -> `"USERS_seq"`
    pub fn quoted(&self) -> String {
        format!("\"{}_seq\"", self.table.to_uppercase().replace('"', "\"\""))
    }
}

/// Abstract column definition for DDL.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: LogicalType,
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub default: Option<Value>,
    pub null: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: LogicalType) -> Self {
        Self {
            name: name.into(),
            ty,
            limit: None,
            precision: None,
            scale: None,
            default: None,
            null: true,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.null = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    /// Storage kind; the configured default when `None`.
    pub kind: Option<TableKind>,
    /// Add the auto-assigned primary key column.
    pub id: bool,
    pub primary_key: Option<String>,
    /// Drop an existing table of the same name first.
    pub force: bool,
    /// Raw text appended after the column list.
    pub options: Option<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            kind: None,
            id: true,
            primary_key: None,
            force: false,
            options: None,
        }
    }
}

impl TableOptions {
    pub fn kind(mut self, kind: TableKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn without_id(mut self) -> Self {
        self.id = false;
        self
    }

    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }
}

impl HanaConnection {
    // === Tables ===

    pub fn tables(&mut self) -> HanaResult<Vec<String>> {
        let sql = catalog::tables(self.schema_name());
        Ok(strings(self.select_values(&sql, Some("SCHEMA"))?))
    }

    pub fn views(&mut self) -> HanaResult<Vec<String>> {
        let sql = catalog::views(self.schema_name());
        Ok(strings(self.select_values(&sql, Some("SCHEMA"))?))
    }

    pub fn table_exists(&mut self, table: &str) -> HanaResult<bool> {
        if table.trim().is_empty() {
            return Ok(false);
        }
        let name = unqualify_table_name(table).to_lowercase();
        Ok(self.tables()?.contains(&name) || self.views()?.contains(&name))
    }

    /// Raw `TABLE_COLUMNS` rows for a table.
    pub fn table_structure(&mut self, table: &str) -> HanaResult<Vec<Vec<Value>>> {
        let sql = catalog::table_structure(self.schema_name(), table);
        let rows = self.select_rows(&sql, Some("SCHEMA"))?;
        if rows.is_empty() {
            return Err(HanaError::StatementInvalid(format!("Could not find table '{}'", table)));
        }
        Ok(rows)
    }

    /// Columns straight from the catalog, bypassing the schema cache.
    pub fn load_columns(&mut self, table: &str) -> HanaResult<Vec<ColumnDefinition>> {
        if table.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .table_structure(table)?
            .iter()
            .map(|row| ColumnDefinition::from_catalog_row(row))
            .collect())
    }

    /// Primary key straight from the catalog, bypassing the schema cache.
    pub fn load_primary_key(&mut self, table: &str) -> HanaResult<Option<String>> {
        let sql = catalog::primary_key(self.schema_name(), table);
        Ok(self
            .select_value(&sql, Some("SCHEMA"))?
            .filter(|v| !v.is_null())
            .map(|v| v.to_string()))
    }

    pub fn column_for(&mut self, table: &str, column: &str) -> HanaResult<ColumnDefinition> {
        self.columns(table)?
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(column))
            .ok_or_else(|| {
                HanaError::StatementInvalid(format!("No such column: {}.{}", table, column))
            })
    }

    fn column_exists(&mut self, table: &str, column: &str) -> HanaResult<bool> {
        let sql = catalog::column_exists(self.schema_name(), table, column);
        Ok(self
            .select_value(&sql, Some("SCHEMA"))?
            .and_then(|v| v.as_i64())
            == Some(1))
    }

    /// Create a table together with its backing sequence.
    ///
    /// The sequence exists before the table does; if the CREATE fails the
    /// sequence is dropped again.
    pub fn create_table(
        &mut self,
        table: &str,
        columns: &[ColumnSpec],
        options: &TableOptions,
    ) -> HanaResult<()> {
        let primary_key = options
            .primary_key
            .clone()
            .unwrap_or_else(|| self.config().primary_key.clone());
        let sql = transpiler::create_table_sql(
            table,
            columns,
            options,
            &primary_key,
            self.config().default_table_type,
            self.quoting(),
        )?;

        if options.force && self.table_exists(table)? {
            self.drop_table(table)?;
        }

        let sequence = Sequence::for_table(table);
        self.create_sequence(&sequence)?;
        if let Err(err) = self.execute(&sql, Some("CREATE TABLE")) {
            if let Err(cleanup) = self.drop_sequence(&sequence) {
                tracing::warn!(
                    sequence = %sequence.name(),
                    error = %cleanup,
                    "orphaned sequence after failed CREATE TABLE"
                );
            }
            return Err(err);
        }

        if self.column_exists(table, &primary_key)? {
            let reset = transpiler::reset_sequence_sql(&sequence, &primary_key);
            self.execute(&reset, Some("SEQUENCE"))?;
        }
        self.clear_cache();
        Ok(())
    }

    /// Rename a table and move its sequence along.
    ///
    /// The dialect cannot rename sequences, so a new one continues at the
    /// old one's next value and the old one is dropped. When the new
    /// sequence cannot be created the table keeps its old name.
    pub fn rename_table(&mut self, table: &str, new_name: &str) -> HanaResult<()> {
        self.execute(&transpiler::rename_table_sql(table, new_name), Some("RENAME TABLE"))?;

        let old_sequence = Sequence::for_table(table);
        let new_sequence = Sequence::for_table(new_name);
        let primary_key = self.config().primary_key.clone();
        let created = self.next_sequence_value(&old_sequence).and_then(|start| {
            let sql = transpiler::continue_sequence_sql(&new_sequence, start, &primary_key);
            self.execute(&sql, Some("SEQUENCE"))
        });
        if let Err(err) = created {
            let revert_sql = transpiler::rename_table_sql(new_name, table);
            if let Err(revert) = self.execute(&revert_sql, Some("RENAME TABLE")) {
                tracing::warn!(table = %new_name, error = %revert, "could not revert table rename");
            }
            return Err(err);
        }

        self.drop_sequence(&old_sequence)?;
        self.clear_cache();
        Ok(())
    }

    pub fn drop_table(&mut self, table: &str) -> HanaResult<()> {
        self.execute(&transpiler::drop_table_sql(table), Some("DROP TABLE"))?;
        self.drop_sequence(&Sequence::for_table(table))?;
        self.clear_cache();
        Ok(())
    }

    // === Columns ===

    pub fn add_column(&mut self, table: &str, spec: &ColumnSpec) -> HanaResult<()> {
        let sql = transpiler::add_column_sql(table, spec, self.quoting())?;
        self.execute(&sql, Some("ADD COLUMN"))?;
        self.clear_cache();
        Ok(())
    }

    pub fn change_column(&mut self, table: &str, spec: &ColumnSpec) -> HanaResult<()> {
        let sql = transpiler::change_column_sql(table, spec, self.quoting())?;
        self.execute(&sql, Some("CHANGE COLUMN"))?;
        self.clear_cache();
        Ok(())
    }

    /// Re-declare the column with a new default; nullability is kept.
    pub fn change_column_default(
        &mut self,
        table: &str,
        column: &str,
        default: &Value,
    ) -> HanaResult<()> {
        let existing = self.column_for(table, column)?;
        let literal = self.quoting().quote(default, Some(&existing));
        let sql = transpiler::change_column_raw_sql(
            table,
            existing.name(),
            &existing.full_sql_type(),
            Some(&literal),
            existing.null(),
        );
        self.execute(&sql, Some("CHANGE COLUMN"))?;
        self.clear_cache();
        Ok(())
    }

    /// Re-declare the column with new nullability; the catalog default is kept.
    pub fn change_column_null(&mut self, table: &str, column: &str, null: bool) -> HanaResult<()> {
        let existing = self.column_for(table, column)?;
        let literal = existing
            .default()
            .map(|default| self.quoting().quote(&Value::from(default), Some(&existing)));
        let sql = transpiler::change_column_raw_sql(
            table,
            existing.name(),
            &existing.full_sql_type(),
            literal.as_deref(),
            null,
        );
        self.execute(&sql, Some("CHANGE COLUMN"))?;
        self.clear_cache();
        Ok(())
    }

    pub fn rename_column(&mut self, table: &str, column: &str, new_name: &str) -> HanaResult<()> {
        let sql = transpiler::rename_column_sql(table, column, new_name);
        self.execute(&sql, Some("RENAME COLUMN"))?;
        self.clear_cache();
        Ok(())
    }

    /// Drop a column; the primary key constraint goes first when it is the key.
    pub fn remove_column(&mut self, table: &str, column: &str) -> HanaResult<()> {
        self.remove_columns(table, &[column])
    }

    pub fn remove_columns(&mut self, table: &str, columns: &[&str]) -> HanaResult<()> {
        let primary_key = self.load_primary_key(table)?;
        for column in columns {
            if primary_key.as_deref().map(quote_column_name) == Some(quote_column_name(column)) {
                self.execute(&transpiler::drop_primary_key_sql(table), Some("DROP PRIMARY KEY"))?;
            }
            self.execute(&transpiler::drop_column_sql(table, column), Some("REMOVE COLUMN"))?;
        }
        self.clear_cache();
        Ok(())
    }

    // === Indexes ===

    pub fn indexes(&mut self, table: &str) -> HanaResult<Vec<IndexDefinition>> {
        if !self.table_exists(table)? {
            return Ok(Vec::new());
        }
        let sql = catalog::indexes(self.schema_name(), table);
        let records = self.select_all(&sql, Some("INDEXES"))?;
        Ok(records
            .iter()
            .map(|record| {
                let text = |key: &str| {
                    record
                        .get(key)
                        .filter(|v| !v.is_null())
                        .map(|v| v.to_string())
                };
                let constraint = text("constraint").unwrap_or_default().to_lowercase();
                IndexDefinition {
                    table: text("table_name").unwrap_or_default(),
                    name: text("index_name").unwrap_or_default(),
                    unique: constraint.contains("unique") || constraint == "primary key",
                }
            })
            .collect())
    }

    /// Create an index; named `index_<table>_on_<cols>` unless `name` is given.
    pub fn add_index(
        &mut self,
        table: &str,
        columns: &[&str],
        unique: bool,
        name: Option<&str>,
    ) -> HanaResult<()> {
        if columns.is_empty() {
            return Err(HanaError::argument("An index needs at least one column"));
        }
        let index = name
            .map(str::to_string)
            .unwrap_or_else(|| transpiler::index_name(table, columns));
        let sql = transpiler::create_index_sql(table, &index, columns, unique);
        self.execute(&sql, Some("ADD INDEX"))
    }

    pub fn remove_index(&mut self, index: &str) -> HanaResult<()> {
        self.execute(&transpiler::drop_index_sql(index), Some("REMOVE INDEX"))
    }

    pub fn rename_index(&mut self, index: &str, new_name: &str) -> HanaResult<()> {
        self.execute(&transpiler::rename_index_sql(index, new_name), Some("RENAME INDEX"))
    }

    // === Sequences ===

    pub fn default_sequence_name(&self, table: &str) -> Sequence {
        Sequence::for_table(table)
    }

    pub fn create_sequence(&mut self, sequence: &Sequence) -> HanaResult<()> {
        self.execute(&transpiler::create_sequence_sql(sequence), Some("SEQUENCE"))
    }

    pub fn drop_sequence(&mut self, sequence: &Sequence) -> HanaResult<()> {
        self.execute(&transpiler::drop_sequence_sql(sequence), Some("SEQUENCE"))
    }

    /// Advance the sequence and return the new value.
    pub fn next_sequence_value(&mut self, sequence: &Sequence) -> HanaResult<i64> {
        self.select_value(&transpiler::next_value_sql(sequence), Some("SEQUENCE"))?
            .and_then(|v| v.as_i64())
            .ok_or_else(|| {
                HanaError::StatementInvalid(format!(
                    "Sequence {} returned no value",
                    sequence.name()
                ))
            })
    }

    /// The sequence's current value, i.e. the last key handed out.
    pub fn last_insert_value(&mut self, sequence: &Sequence) -> HanaResult<Option<Value>> {
        Ok(self
            .select_value(&transpiler::current_value_sql(sequence), Some("SEQUENCE"))?
            .filter(|v| !v.is_null()))
    }

    // === Schemas ===

    pub fn schemas(&mut self) -> HanaResult<Vec<String>> {
        Ok(strings(self.select_values(&catalog::schemas(), Some("SCHEMA"))?))
    }

    pub fn create_schema(&mut self, name: &str) -> HanaResult<()> {
        self.execute(&transpiler::create_schema_sql(name), Some("SCHEMA"))
    }

    pub fn set_schema(&mut self, name: &str) -> HanaResult<()> {
        self.execute(&transpiler::set_schema_sql(name), Some("SCHEMA"))
    }

    pub fn drop_schema(&mut self, name: &str) -> HanaResult<()> {
        self.execute(&transpiler::drop_schema_sql(name), Some("SCHEMA"))
    }

    /// Create the configured schema when missing, then switch to it.
    pub fn setup_schema(&mut self) -> HanaResult<()> {
        let desired = self.schema_name().to_string();
        if !self.schemas()?.contains(&desired.to_lowercase()) {
            self.create_schema(&desired)?;
        }
        self.set_schema(&desired)
    }
}

fn strings(values: Vec<Value>) -> Vec<String> {
    values
        .into_iter()
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .collect()
}
