//! Output parameters and their typed buffer mapping.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::ast::Value;
use crate::error::HanaError;
use crate::transport::ParamType;

/// A call argument the procedure writes into.
///
/// Clones share the same slot, so the caller keeps a handle while the
/// bridge fills it in.
#[derive(Debug, Clone, Default)]
pub struct OutputParameter {
    slot: Rc<RefCell<Option<Value>>>,
}

impl OutputParameter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(value.into()))),
        }
    }

    pub fn value(&self) -> Option<Value> {
        self.slot.borrow().clone()
    }

    pub fn is_set(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub(crate) fn set(&self, value: Value) {
        *self.slot.borrow_mut() = Some(value);
    }

    /// Whether both handles point at the same slot.
    pub fn same_slot(&self, other: &OutputParameter) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Display for OutputParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.borrow().as_ref() {
            Some(value) => write!(f, "{}", value),
            None => Ok(()),
        }
    }
}

/// Logical types an output slot may be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
    Bigint,
    Char,
    Date,
    Decimal,
    Double,
    Float,
    Integer,
    Real,
    Smallint,
    Time,
    Tinyint,
    Varchar,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Bigint => "bigint",
            OutputType::Char => "char",
            OutputType::Date => "date",
            OutputType::Decimal => "decimal",
            OutputType::Double => "double",
            OutputType::Float => "float",
            OutputType::Integer => "integer",
            OutputType::Real => "real",
            OutputType::Smallint => "smallint",
            OutputType::Time => "time",
            OutputType::Tinyint => "tinyint",
            OutputType::Varchar => "varchar",
        }
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            OutputType::Bigint => ParamType::BigInt,
            OutputType::Char => ParamType::Char,
            OutputType::Date => ParamType::Date,
            OutputType::Decimal => ParamType::Decimal,
            OutputType::Double => ParamType::Double,
            OutputType::Float => ParamType::Float,
            OutputType::Integer => ParamType::Integer,
            OutputType::Real => ParamType::Real,
            OutputType::Smallint => ParamType::SmallInt,
            OutputType::Time => ParamType::Time,
            OutputType::Tinyint => ParamType::TinyInt,
            OutputType::Varchar => ParamType::VarChar,
        }
    }

    /// Buffer size in bytes used when the transport does not report one.
    pub fn default_buffer_size(&self) -> usize {
        match self {
            OutputType::Bigint => 8,
            OutputType::Char => 1,
            OutputType::Date => 10,
            OutputType::Decimal => 16,
            OutputType::Double => 8,
            OutputType::Float => 8,
            OutputType::Integer => 4,
            OutputType::Real => 4,
            OutputType::Smallint => 2,
            OutputType::Time => 8,
            OutputType::Tinyint => 1,
            OutputType::Varchar => 5000,
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputType {
    type Err = HanaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bigint" => Ok(OutputType::Bigint),
            "char" => Ok(OutputType::Char),
            "date" => Ok(OutputType::Date),
            "decimal" => Ok(OutputType::Decimal),
            "double" => Ok(OutputType::Double),
            "float" => Ok(OutputType::Float),
            "integer" => Ok(OutputType::Integer),
            "real" => Ok(OutputType::Real),
            "smallint" => Ok(OutputType::Smallint),
            "time" => Ok(OutputType::Time),
            "tinyint" => Ok(OutputType::Tinyint),
            "varchar" => Ok(OutputType::Varchar),
            _ => Err(HanaError::UnsupportedType(s.to_string())),
        }
    }
}
