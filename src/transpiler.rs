//! Dialect SQL text generation.
//!
//! Pure functions from abstract definitions to statement text. Nothing in
//! here touches a transport; [`crate::schema`] runs what this module builds.

use crate::ast::LogicalType;
use crate::error::{HanaError, HanaResult};
use crate::quoting::{
    Quoting, quote_column_name, quote_identifier, quote_schema_name, quote_string, quote_table_name,
};
use crate::schema::{ColumnSpec, Sequence, TableKind, TableOptions};

/// Largest precision a DECIMAL column accepts.
pub const MAX_DECIMAL_PRECISION: u32 = 38;
pub const DEFAULT_STRING_LIMIT: u32 = 255;

/// Column type used for the auto-assigned key.
pub const PRIMARY_KEY_TYPE: &str = "BIGINT NOT NULL PRIMARY KEY";

/// Native type name and default limit for a logical type.
pub fn native_type(ty: LogicalType) -> (&'static str, Option<u32>) {
    match ty {
        LogicalType::PrimaryKey => (PRIMARY_KEY_TYPE, None),
        LogicalType::String => ("NVARCHAR", Some(DEFAULT_STRING_LIMIT)),
        LogicalType::Text => ("NCLOB", None),
        LogicalType::Integer => ("INTEGER", None),
        LogicalType::Float => ("FLOAT", None),
        LogicalType::Decimal => ("DECIMAL", None),
        LogicalType::Datetime | LogicalType::Timestamp => ("TIMESTAMP", None),
        LogicalType::Time => ("TIME", None),
        LogicalType::Date => ("DATE", None),
        LogicalType::Binary => ("BLOB", None),
        LogicalType::Boolean => ("TINYINT", None),
        LogicalType::Bigint => ("BIGINT", None),
    }
}

/// Map a logical type to the dialect's column type.
pub fn type_to_sql(
    ty: LogicalType,
    limit: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> HanaResult<String> {
    match ty {
        LogicalType::Decimal => {
            let precision = precision.map(|p| p.min(MAX_DECIMAL_PRECISION));
            Ok(match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({},{})", p, s),
                (Some(p), None) => format!("DECIMAL({})", p),
                (None, Some(_)) => {
                    return Err(HanaError::argument(concat!(
                        "Error adding decimal column: ",
                        "precision cannot be empty if scale is specified"
                    )));
                }
                (None, None) => "DECIMAL".to_string(),
            })
        }
        LogicalType::Integer => match limit {
            None => Ok("integer".to_string()),
            Some(1) => Ok("tinyint".to_string()),
            Some(2) => Ok("smallint".to_string()),
            Some(3 | 4) => Ok("integer".to_string()),
            Some(5..=8) => Ok("bigint".to_string()),
            Some(other) => Err(HanaError::argument(format!(
                "No integer type has byte size {}. Use a numeric with precision 0 instead.",
                other
            ))),
        },
        // Large-object types take no length.
        LogicalType::Text | LogicalType::Binary => Ok(native_type(ty).0.to_string()),
        _ => {
            let (name, default_limit) = native_type(ty);
            Ok(match limit.or(default_limit) {
                Some(l) => format!("{}({})", name, l),
                None => name.to_string(),
            })
        }
    }
}

/// `"NAME" TYPE[ DEFAULT x][ NOT NULL]`
pub fn column_sql(spec: &ColumnSpec, quoting: &Quoting) -> HanaResult<String> {
    let mut sql = format!(
        "{} {}",
        quote_column_name(&spec.name),
        type_to_sql(spec.ty, spec.limit, spec.precision, spec.scale)?
    );
    if let Some(default) = &spec.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&quoting.quote(default, None));
    }
    if !spec.null {
        sql.push_str(" NOT NULL");
    }
    Ok(sql)
}

/// Generate CREATE TABLE SQL with the storage kind after `CREATE`.
pub fn create_table_sql(
    table: &str,
    columns: &[ColumnSpec],
    options: &TableOptions,
    primary_key: &str,
    default_kind: TableKind,
    quoting: &Quoting,
) -> HanaResult<String> {
    let mut defs = Vec::with_capacity(columns.len() + 1);
    if options.id {
        defs.push(format!("{} {}", quote_column_name(primary_key), PRIMARY_KEY_TYPE));
    }
    for spec in columns {
        defs.push(column_sql(spec, quoting)?);
    }

    let kind = options.kind.unwrap_or(default_kind);
    let mut sql = format!(
        "CREATE {} TABLE {} ({})",
        kind.keyword(),
        quote_table_name(table),
        defs.join(", ")
    );
    if let Some(extra) = options.options.as_deref().filter(|o| !o.trim().is_empty()) {
        sql.push(' ');
        sql.push_str(extra.trim());
    }
    Ok(sql)
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE {}", quote_table_name(table))
}

pub fn rename_table_sql(table: &str, new_name: &str) -> String {
    format!("RENAME TABLE {} TO {}", quote_table_name(table), quote_table_name(new_name))
}

pub fn lock_table_sql(table: &str) -> String {
    format!("LOCK TABLE {} IN EXCLUSIVE MODE", quote_table_name(table))
}

// === Columns ===

pub fn add_column_sql(table: &str, spec: &ColumnSpec, quoting: &Quoting) -> HanaResult<String> {
    Ok(format!(
        "ALTER TABLE {} ADD ({})",
        quote_table_name(table),
        column_sql(spec, quoting)?
    ))
}

pub fn change_column_sql(table: &str, spec: &ColumnSpec, quoting: &Quoting) -> HanaResult<String> {
    Ok(format!(
        "ALTER TABLE {} ALTER ({})",
        quote_table_name(table),
        column_sql(spec, quoting)?
    ))
}

/// Re-declare a column keeping its catalog type name verbatim.
pub fn change_column_raw_sql(
    table: &str,
    column: &str,
    sql_type: &str,
    default: Option<&str>,
    null: bool,
) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ALTER ({} {}",
        quote_table_name(table),
        quote_column_name(column),
        sql_type
    );
    if let Some(default) = default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    if !null {
        sql.push_str(" NOT NULL");
    }
    sql.push(')');
    sql
}

pub fn drop_column_sql(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP ({})", quote_table_name(table), quote_column_name(column))
}

pub fn drop_primary_key_sql(table: &str) -> String {
    format!("ALTER TABLE {} DROP PRIMARY KEY", quote_table_name(table))
}

pub fn rename_column_sql(table: &str, column: &str, new_name: &str) -> String {
    format!(
        "RENAME COLUMN {}.{} TO {}",
        quote_table_name(table),
        quote_column_name(column),
        quote_column_name(new_name)
    )
}

// === Indexes ===

pub fn create_index_sql(table: &str, index: &str, columns: &[&str], unique: bool) -> String {
    let cols = columns
        .iter()
        .map(|c| quote_column_name(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if unique { "UNIQUE " } else { "" },
        quote_identifier(index),
        quote_table_name(table),
        cols
    )
}

pub fn drop_index_sql(index: &str) -> String {
    format!("DROP INDEX {}", quote_identifier(index))
}

pub fn rename_index_sql(index: &str, new_name: &str) -> String {
    format!("RENAME INDEX {} TO {}", quote_identifier(index), quote_identifier(new_name))
}

/// Default index name for a column list, e.g. `index_users_on_email`.
pub fn index_name(table: &str, columns: &[&str]) -> String {
    format!("index_{}_on_{}", table, columns.join("_and_"))
}

// === Sequences ===

pub fn create_sequence_sql(sequence: &Sequence) -> String {
    format!("CREATE SEQUENCE {} INCREMENT BY 1 START WITH 1 NO CYCLE", sequence.quoted())
}

/// Reset the sequence to one past the table's largest key.
pub fn reset_sequence_sql(sequence: &Sequence, primary_key: &str) -> String {
    format!(
        "ALTER SEQUENCE {} RESET BY {}",
        sequence.quoted(),
        max_key_query(sequence.table(), primary_key)
    )
}

/// Create the renamed table's sequence continuing at `start`.
pub fn continue_sequence_sql(sequence: &Sequence, start: i64, primary_key: &str) -> String {
    format!(
        "CREATE SEQUENCE {} INCREMENT BY 1 START WITH {} NO CYCLE RESET BY {}",
        sequence.quoted(),
        start,
        max_key_query(sequence.table(), primary_key)
    )
}

fn max_key_query(table: &str, primary_key: &str) -> String {
    format!(
        "SELECT IFNULL(MAX({}),0)+1 FROM {}",
        quote_column_name(primary_key),
        quote_table_name(table)
    )
}

pub fn drop_sequence_sql(sequence: &Sequence) -> String {
    format!("DROP SEQUENCE {}", sequence.quoted())
}

pub fn next_value_sql(sequence: &Sequence) -> String {
    format!("SELECT {}.NEXTVAL FROM DUMMY", sequence.quoted())
}

pub fn current_value_sql(sequence: &Sequence) -> String {
    format!("SELECT {}.CURRVAL FROM DUMMY", sequence.quoted())
}

// === Schemas ===

pub fn create_schema_sql(name: &str) -> String {
    format!("CREATE SCHEMA {}", quote_schema_name(name))
}

pub fn set_schema_sql(name: &str) -> String {
    format!("SET SCHEMA {}", quote_schema_name(name))
}

pub fn drop_schema_sql(name: &str) -> String {
    format!("DROP SCHEMA {} CASCADE", quote_schema_name(name))
}

/// Catalog queries, each scoped to one schema.
pub mod catalog {
    use super::*;

    fn upper_literal(name: &str) -> String {
        quote_string(&name.to_uppercase())
    }

    pub fn tables(schema: &str) -> String {
        format!("SELECT LOWER(TABLE_NAME) FROM TABLES WHERE SCHEMA_NAME={}", upper_literal(schema))
    }

    pub fn views(schema: &str) -> String {
        format!("SELECT LOWER(VIEW_NAME) FROM VIEWS WHERE SCHEMA_NAME={}", upper_literal(schema))
    }

    pub fn schemas() -> String {
        "SELECT LOWER(SCHEMA_NAME) FROM SCHEMAS".to_string()
    }

    pub fn indexes(schema: &str, table: &str) -> String {
        format!(
            concat!(
                "SELECT LOWER(TABLE_NAME) AS TABLE_NAME, LOWER(INDEX_NAME) AS INDEX_NAME, ",
                "LOWER(CONSTRAINT) AS CONSTRAINT FROM INDEXES ",
                "WHERE SCHEMA_NAME={} AND TABLE_NAME={}"
            ),
            upper_literal(schema),
            upper_literal(table)
        )
    }

    pub fn table_structure(schema: &str, table: &str) -> String {
        format!(
            concat!(
                "SELECT LOWER(COLUMN_NAME) AS COLUMN_NAME, DEFAULT_VALUE, DATA_TYPE_NAME, ",
                "IS_NULLABLE, LENGTH, SCALE FROM TABLE_COLUMNS ",
                "WHERE SCHEMA_NAME={} AND TABLE_NAME={} ORDER BY POSITION"
            ),
            upper_literal(schema),
            upper_literal(table)
        )
    }

    pub fn primary_key(schema: &str, table: &str) -> String {
        format!(
            concat!(
                "SELECT LOWER(COLUMN_NAME) FROM CONSTRAINTS ",
                "WHERE SCHEMA_NAME={} AND TABLE_NAME={} AND IS_PRIMARY_KEY='TRUE'"
            ),
            upper_literal(schema),
            upper_literal(table)
        )
    }

    pub fn column_exists(schema: &str, table: &str, column: &str) -> String {
        format!(
            "SELECT 1 FROM TABLE_COLUMNS WHERE SCHEMA_NAME={} AND TABLE_NAME={} AND COLUMN_NAME={}",
            upper_literal(schema),
            upper_literal(table),
            upper_literal(column)
        )
    }
}
