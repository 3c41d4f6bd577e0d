//! Call-level transport boundary.
//!
//! The crate never opens network connections itself. A driver implements
//! [`Transport`] and [`Statement`]; everything above this module only talks to
//! those traits. Statement handles must be released explicitly, which
//! [`StatementGuard`] guarantees on every exit path.

use std::fmt;
use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::ast::Value;
use crate::quoting::BoundValue;

/// Failure reported by the driver. Propagated unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Native error code, when the driver reports one.
    pub code: Option<i32>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Result column as described by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_name: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Generic parameter type codes used when marking output slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Char,
    VarChar,
    Decimal,
    Integer,
    SmallInt,
    TinyInt,
    BigInt,
    Float,
    Real,
    Double,
    Date,
    Time,
}

impl ParamType {
    /// Numeric code as understood by call-level interfaces.
    pub fn code(&self) -> i16 {
        match self {
            ParamType::Char => 1,
            ParamType::Decimal => 3,
            ParamType::Integer => 4,
            ParamType::SmallInt => 5,
            ParamType::Float => 6,
            ParamType::Real => 7,
            ParamType::Double => 8,
            ParamType::VarChar => 12,
            ParamType::Date => 91,
            ParamType::Time => 92,
            ParamType::BigInt => -5,
            ParamType::TinyInt => -6,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// A synchronous connection that runs SQL text.
pub trait Transport {
    /// Run SQL, binding `params` positionally when non-empty.
    fn run(&mut self, sql: &str, params: &[BoundValue]) -> TransportResult<Box<dyn Statement>>;

    /// Prepare SQL for the output-parameter protocol.
    fn prepare(&mut self, sql: &str) -> TransportResult<Box<dyn Statement>>;

    fn disconnect(&mut self) -> TransportResult<()> {
        Ok(())
    }
}

/// An open statement handle. Must be closed exactly once.
pub trait Statement {
    fn columns(&self) -> Vec<ColumnDescriptor>;

    fn fetch_all(&mut self) -> TransportResult<Vec<Vec<Value>>>;

    /// Mark parameter `index` as an output slot with a buffer of `size` bytes.
    fn bind_output(
        &mut self,
        index: usize,
        size: usize,
        param_type: ParamType,
    ) -> TransportResult<()>;

    /// Buffer size the driver reports for parameter `index`, if it knows one.
    fn output_size(&self, _index: usize) -> Option<usize> {
        None
    }

    fn execute(&mut self, params: &[BoundValue]) -> TransportResult<()>;

    fn output_value(&mut self, index: usize) -> TransportResult<Value>;

    fn close(&mut self) -> TransportResult<()>;
}

/// Owns a statement handle and closes it when dropped.
///
/// [`StatementGuard::release`] closes on the success path and reports a
/// disposal failure. On every other path the drop glue closes the handle and
/// only logs a failure, so the caller's original error is never masked.
pub struct StatementGuard {
    statement: Box<dyn Statement>,
    released: bool,
}

impl StatementGuard {
    pub fn new(statement: Box<dyn Statement>) -> Self {
        Self {
            statement,
            released: false,
        }
    }

    pub fn release(mut self) -> TransportResult<()> {
        self.released = true;
        self.statement.close()
    }
}

impl Deref for StatementGuard {
    type Target = dyn Statement;

    fn deref(&self) -> &Self::Target {
        self.statement.as_ref()
    }
}

impl DerefMut for StatementGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.statement.as_mut()
    }
}

impl Drop for StatementGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.statement.close() {
            tracing::warn!(error = %err, "failed to release statement handle");
        }
    }
}
