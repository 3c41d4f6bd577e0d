//! Calling stored procedures.
//!
//! A call runs in two passes over the same `CALL` text: the generic query
//! path fetches the result rows, then a prepared statement reads the
//! declared output slots through typed buffers.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::ast::Value;
use crate::engine::{HanaConnection, Record};
use crate::error::HanaResult;
use crate::parser::bind_placeholders;
use crate::quoting::BoundValue;
use crate::transport::StatementGuard;

use super::output::{OutputParameter, OutputType};
use super::quote_procedure_name;

/// Output values keyed by declared slot name.
pub type OutputValues = HashMap<String, Value>;

/// Receives the shaped result and the output values. Its return is ignored.
pub type ResultCallback = Rc<dyn Fn(&ProcedureResult, &OutputValues)>;

/// One positional argument of a call.
#[derive(Debug, Clone)]
pub enum Argument {
    In(Value),
    Out(OutputParameter),
}

impl Argument {
    pub fn as_output(&self) -> Option<&OutputParameter> {
        match self {
            Argument::Out(param) => Some(param),
            Argument::In(_) => None,
        }
    }
}

impl From<OutputParameter> for Argument {
    fn from(param: OutputParameter) -> Self {
        Argument::Out(param)
    }
}

impl From<&OutputParameter> for Argument {
    fn from(param: &OutputParameter) -> Self {
        Argument::Out(param.clone())
    }
}

macro_rules! impl_in_argument {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Argument::In(Value::from(value))
                }
            }
        )*
    };
}

impl_in_argument!(
    Value,
    bool,
    i32,
    i64,
    f64,
    Decimal,
    &str,
    String,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
);

/// Build an argument list from mixed IN values and output parameters.
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::procedure::Argument::from($arg)),*]
    };
}

/// Per-procedure call options.
#[derive(Clone, Default)]
pub struct CallOptions {
    /// Declared output slots in positional order: `(name, type name)`.
    pub output_parameters: Vec<(String, String)>,
    /// Keep only the first row.
    pub single: bool,
    pub callback: Option<ResultCallback>,
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("output_parameters", &self.output_parameters)
            .field("single", &self.single)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl CallOptions {
    pub fn output(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.output_parameters.push((name.into(), ty.into()));
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn on_result<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProcedureResult, &OutputValues) + 'static,
    {
        self.callback = Some(Rc::new(callback));
        self
    }
}

/// Rows returned by a call, shaped by [`CallOptions::single`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProcedureResult {
    Relation(Vec<Record>),
    Single(Option<Record>),
}

impl ProcedureResult {
    pub fn records(&self) -> &[Record] {
        match self {
            ProcedureResult::Relation(records) => records,
            ProcedureResult::Single(Some(record)) => std::slice::from_ref(record),
            ProcedureResult::Single(None) => &[],
        }
    }

    pub fn first(&self) -> Option<&Record> {
        self.records().first()
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            ProcedureResult::Relation(records) => records,
            ProcedureResult::Single(record) => record.into_iter().collect(),
        }
    }

    /// Deserialize every record into `T`.
    pub fn instantiate<T: DeserializeOwned>(&self) -> HanaResult<Vec<T>> {
        self.records().iter().map(Record::instantiate).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct OutputSlot {
    name: String,
    ty: OutputType,
}

/// Resolve declared output types up front so a bad type fails before any
/// statement is sent.
fn resolve_output_slots(declared: &[(String, String)]) -> HanaResult<Vec<OutputSlot>> {
    declared
        .iter()
        .map(|(name, ty)| -> HanaResult<OutputSlot> {
            Ok(OutputSlot {
                name: name.clone(),
                ty: ty.parse()?,
            })
        })
        .collect()
}

/// Append fresh output parameters until there are `declared` of them.
fn inject_implicit_output_parameters(arguments: &mut Vec<Argument>, declared: usize) {
    let provided = arguments.iter().filter(|a| a.as_output().is_some()).count();
    for _ in provided..declared {
        arguments.push(Argument::Out(OutputParameter::new()));
    }
}

/// `CALL "name"(?, ?, ...)` with one placeholder per argument.
pub fn call_statement(name: &str, arity: usize) -> String {
    format!("CALL {}({})", quote_procedure_name(name), vec!["?"; arity].join(", "))
}

impl HanaConnection {
    /// Call a procedure and shape its rows; runs the callback if one is set.
    pub fn call_stored_procedure(
        &mut self,
        name: &str,
        arguments: Vec<Argument>,
        options: &CallOptions,
    ) -> HanaResult<ProcedureResult> {
        let (result, output_values) = self.execute_procedure(name, arguments, options)?;
        if let Some(callback) = &options.callback {
            callback(&result, &output_values);
        }
        Ok(result)
    }

    /// Call a procedure and deserialize each row into `T`.
    pub fn call_stored_procedure_as<T: DeserializeOwned>(
        &mut self,
        name: &str,
        arguments: Vec<Argument>,
        options: &CallOptions,
    ) -> HanaResult<Vec<T>> {
        self.call_stored_procedure(name, arguments, options)?.instantiate()
    }

    /// Call a procedure and return the shaped rows with the output values.
    pub fn execute_procedure(
        &mut self,
        name: &str,
        mut arguments: Vec<Argument>,
        options: &CallOptions,
    ) -> HanaResult<(ProcedureResult, OutputValues)> {
        let slots = resolve_output_slots(&options.output_parameters)?;
        inject_implicit_output_parameters(&mut arguments, slots.len());

        let literals: Vec<Option<String>> = arguments
            .iter()
            .map(|argument| match argument {
                Argument::In(value) => Some(self.quoting().quote(value, None)),
                Argument::Out(_) => None,
            })
            .collect();
        let sql = bind_placeholders(&call_statement(name, arguments.len()), &literals)?;

        let records = self.select_all(&sql, Some("CALL"))?;
        let output_values = if slots.is_empty() {
            OutputValues::new()
        } else {
            self.fetch_output_values(&sql, &arguments, &slots)?
        };

        let result = if options.single {
            ProcedureResult::Single(records.into_iter().next())
        } else {
            ProcedureResult::Relation(records)
        };
        Ok((result, output_values))
    }

    fn fetch_output_values(
        &mut self,
        sql: &str,
        arguments: &[Argument],
        slots: &[OutputSlot],
    ) -> HanaResult<OutputValues> {
        let outputs: Vec<&OutputParameter> =
            arguments.iter().filter_map(Argument::as_output).collect();
        self.logged(sql, Some("CALL OUTPUT"), |transport| {
            let mut statement = StatementGuard::new(transport.prepare(sql)?);
            for (index, slot) in slots.iter().enumerate() {
                let size = statement
                    .output_size(index)
                    .unwrap_or_else(|| slot.ty.default_buffer_size());
                statement.bind_output(index, size, slot.ty.param_type())?;
            }
            statement.execute(&vec![BoundValue::Null; outputs.len()])?;

            let mut values = OutputValues::new();
            for (index, slot) in slots.iter().enumerate() {
                let value = statement.output_value(index)?;
                if let Some(param) = outputs.get(index) {
                    param.set(value.clone());
                }
                values.insert(slot.name.clone(), value);
            }
            statement.release()?;
            Ok(values)
        })
    }
}
