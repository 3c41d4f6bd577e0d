//! Quoting engine: identifiers, literals and bound values.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};

use crate::ast::{LogicalType, Value};
use crate::config::DefaultTimezone;
use crate::schema::ColumnDefinition;

pub const QUOTED_TRUE: &str = "1";
pub const QUOTED_FALSE: &str = "0";

const DB_DATE: &str = "%Y-%m-%d";
const DB_TIME: &str = "%H:%M:%S";
const DB_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// A value ready to be bound positionally through the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Upcase, wrap in double quotes and double any embedded quote.
///
/// Pass raw names only: quoting an already quoted name escapes it again.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.to_uppercase().replace('"', "\"\""))
}

pub fn quote_table_name(name: &str) -> String {
    quote_identifier(name)
}

pub fn quote_column_name(name: &str) -> String {
    quote_identifier(name)
}

pub fn quote_schema_name(name: &str) -> String {
    quote_identifier(name)
}

/// Single-quoted string literal with embedded quotes doubled.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `schema.[table]` -> `table`
pub fn unqualify_table_name(name: &str) -> String {
    name.rsplit('.')
        .next()
        .unwrap_or(name)
        .chars()
        .filter(|c| *c != '[' && *c != ']')
        .collect()
}

/// Hex literal for binary payloads.
pub fn hex_literal(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("x'{}'", hex)
}

/// Converts host values into dialect literals, honoring the configured zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quoting {
    pub timezone: DefaultTimezone,
}

impl Quoting {
    pub fn new(timezone: DefaultTimezone) -> Self {
        Self { timezone }
    }

    /// Cast a value for positional binding.
    ///
    /// Unsupported shapes never fail; they fall through to a serialized form.
    pub fn cast_value(&self, value: &Value, column: Option<&ColumnDefinition>) -> BoundValue {
        let column_type = column.and_then(|c| c.logical_type());
        match value {
            Value::Null => BoundValue::Null,
            Value::Bool(b) => {
                BoundValue::Text(if *b { QUOTED_TRUE } else { QUOTED_FALSE }.to_string())
            }
            Value::Decimal(d) => BoundValue::Text(d.to_string()),
            Value::Int(i) => match column {
                // Native integer binding overflows for large BIGINT values.
                Some(col) if col.sql_type().eq_ignore_ascii_case("BIGINT") => {
                    BoundValue::Text(i.to_string())
                }
                _ => BoundValue::Integer(*i),
            },
            Value::Float(f) => BoundValue::Float(*f),
            Value::Binary(bytes) => BoundValue::Text(hex_literal(bytes)),
            Value::Date(d) => BoundValue::Text(d.format(DB_DATE).to_string()),
            Value::Time(t) => BoundValue::Text(t.format(DB_TIME).to_string()),
            Value::Timestamp(ts) => match column_type {
                Some(LogicalType::Date) => BoundValue::Text(ts.date().format(DB_DATE).to_string()),
                _ => BoundValue::Text(ts.format(DB_TIMESTAMP).to_string()),
            },
            Value::DateTime(dt) => match column_type {
                Some(LogicalType::Date) => {
                    BoundValue::Text(self.quoted_date(dt).chars().take(10).collect())
                }
                _ => BoundValue::Text(self.quoted_date(dt)),
            },
            Value::String(s) => match column_type {
                None => BoundValue::Text(s.clone()),
                Some(LogicalType::Binary) => BoundValue::Text(hex_literal(s.as_bytes())),
                Some(LogicalType::Integer | LogicalType::Bigint) => {
                    BoundValue::Integer(leading_integer(s))
                }
                Some(LogicalType::Float) => BoundValue::Float(leading_float(s)),
                Some(LogicalType::Date) => match leading_date(s) {
                    Some(date) => BoundValue::Text(date.format(DB_DATE).to_string()),
                    None => BoundValue::Text(s.clone()),
                },
                Some(_) => BoundValue::Text(s.clone()),
            },
            Value::Symbol(s) => BoundValue::Text(s.clone()),
            Value::Other(v) => BoundValue::Text(v.to_string()),
        }
    }

    /// Render a value as inline SQL literal text.
    pub fn quote(&self, value: &Value, column: Option<&ColumnDefinition>) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => quote_string(if *b { QUOTED_TRUE } else { QUOTED_FALSE }),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => float_literal(*f),
            Value::Decimal(d) => d.to_string(),
            Value::Binary(bytes) => hex_literal(bytes),
            other => {
                let raw_hex = matches!(other, Value::String(_))
                    && column.and_then(|c| c.logical_type()) == Some(LogicalType::Binary);
                match self.cast_value(other, column) {
                    BoundValue::Null => "NULL".to_string(),
                    BoundValue::Integer(i) => i.to_string(),
                    BoundValue::Float(f) => float_literal(f),
                    BoundValue::Text(text) if raw_hex => text,
                    BoundValue::Text(text) => quote_string(&text),
                }
            }
        }
    }

    /// Timestamp text in the configured zone, without zone suffix.
    pub fn quoted_date(&self, value: &DateTime<FixedOffset>) -> String {
        match self.timezone {
            DefaultTimezone::Utc => value.with_timezone(&Utc).format(DB_TIMESTAMP).to_string(),
            DefaultTimezone::Local => value.with_timezone(&Local).format(DB_TIMESTAMP).to_string(),
        }
    }
}

/// NaN and infinities have no literal form.
fn float_literal(f: f64) -> String {
    if f.is_finite() {
        f.to_string()
    } else {
        "NULL".to_string()
    }
}

fn leading_date(s: &str) -> Option<NaiveDate> {
    s.trim()
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, DB_DATE).ok())
}

fn leading_number(s: &str, allow_fraction: bool) -> &str {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        let ok = c.is_ascii_digit()
            || (i == 0 && (c == '-' || c == '+'))
            || (allow_fraction && c == '.' && !seen_dot);
        if !ok {
            break;
        }
        if c == '.' {
            seen_dot = true;
        }
        end = i + c.len_utf8();
    }
    &s[..end]
}

fn leading_integer(s: &str) -> i64 {
    leading_number(s, false).parse().unwrap_or(0)
}

fn leading_float(s: &str) -> f64 {
    leading_number(s, true).trim_end_matches('.').parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn column(sql_type: &str) -> ColumnDefinition {
        ColumnDefinition::new("c", sql_type, true, None, None, None)
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"USERS\"");
        assert_eq!(quote_identifier("we\"ird"), "\"WE\"\"IRD\"");
        // Already quoted input is escaped again.
        assert_eq!(quote_identifier("\"x\""), "\"\"\"X\"\"\"");
    }

    #[test]
    fn test_unqualify() {
        assert_eq!(unqualify_table_name("app.[users]"), "users");
        assert_eq!(unqualify_table_name("users"), "users");
    }

    #[test]
    fn test_cast_scalars() {
        let q = Quoting::default();
        assert_eq!(q.cast_value(&Value::Bool(true), None), BoundValue::Text("1".into()));
        assert_eq!(q.cast_value(&Value::Bool(false), None), BoundValue::Text("0".into()));
        assert_eq!(q.cast_value(&Value::Null, None), BoundValue::Null);
        assert_eq!(q.cast_value(&Value::Int(7), None), BoundValue::Integer(7));
        assert_eq!(
            q.cast_value(&Value::Int(9_007_199_254_740_993), Some(&column("BIGINT"))),
            BoundValue::Text("9007199254740993".into())
        );
    }

    #[test]
    fn test_decimal_is_fixed_point() {
        let q = Quoting::default();
        let d = Decimal::from_str("0.00000001").unwrap();
        assert_eq!(q.cast_value(&Value::Decimal(d), None), BoundValue::Text("0.00000001".into()));
    }

    #[test]
    fn test_binary_hex() {
        let q = Quoting::default();
        assert_eq!(
            q.cast_value(&Value::Binary(vec![0xde, 0xad]), None),
            BoundValue::Text("x'dead'".into())
        );
        assert_eq!(
            q.cast_value(&Value::String("AB".into()), Some(&column("BLOB"))),
            BoundValue::Text("x'4142'".into())
        );
    }

    #[test]
    fn test_datetime_converted_to_utc() {
        let q = Quoting::new(DefaultTimezone::Utc);
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let dt = offset.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(
            q.cast_value(&Value::DateTime(dt), None),
            BoundValue::Text("2024-03-01 08:30:00".into())
        );
        assert_eq!(
            q.cast_value(&Value::DateTime(dt), Some(&column("DATE"))),
            BoundValue::Text("2024-03-01".into())
        );
    }

    #[test]
    fn test_string_for_typed_columns() {
        let q = Quoting::default();
        assert_eq!(
            q.cast_value(&"42abc".into(), Some(&column("INTEGER"))),
            BoundValue::Integer(42)
        );
        assert_eq!(q.cast_value(&"abc".into(), Some(&column("INTEGER"))), BoundValue::Integer(0));
        assert_eq!(q.cast_value(&"2.5x".into(), Some(&column("DOUBLE"))), BoundValue::Float(2.5));
        assert_eq!(
            q.cast_value(&"2024-01-02 10:00:00".into(), Some(&column("DATE"))),
            BoundValue::Text("2024-01-02".into())
        );
    }

    #[test]
    fn test_fallback_serializes() {
        let q = Quoting::default();
        let v = Value::Other(serde_json::json!({"a": [1, 2]}));
        assert_eq!(q.cast_value(&v, None), BoundValue::Text("{\"a\":[1,2]}".into()));
    }

    #[test]
    fn test_inline_literals() {
        let q = Quoting::default();
        assert_eq!(q.quote(&"O'Brien".into(), None), "'O''Brien'");
        assert_eq!(q.quote(&Value::Int(23), None), "23");
        assert_eq!(q.quote(&Value::Null, None), "NULL");
        assert_eq!(q.quote(&Value::Bool(true), None), "'1'");
        let t = NaiveTime::from_hms_opt(8, 5, 0).unwrap();
        assert_eq!(q.quote(&Value::Time(t), None), "'08:05:00'");
        assert_eq!(q.quote(&Value::Float(1.5), None), "1.5");
        assert_eq!(q.quote(&Value::Float(f64::NAN), None), "NULL");
        assert_eq!(q.quote(&Value::Float(f64::NEG_INFINITY), None), "NULL");
    }

    #[test]
    fn test_spatial_columns_keep_text() {
        let q = Quoting::default();
        let point = column("ST_POINT");
        assert_eq!(point.logical_type(), None);
        assert_eq!(
            q.cast_value(&"POINT(1 2)".into(), Some(&point)),
            BoundValue::Text("POINT(1 2)".into())
        );
        assert_eq!(q.quote(&"POINT(1 2)".into(), Some(&point)), "'POINT(1 2)'");
    }
}
