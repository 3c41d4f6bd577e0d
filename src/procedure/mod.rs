//! Stored-procedure bridge: definitions, calls with output parameters,
//! and bound callables.

pub mod call;
pub mod migration;
pub mod output;
pub mod registry;

pub use call::{
    Argument, CallOptions, OutputValues, ProcedureResult, ResultCallback, call_statement,
};
pub use migration::{
    DefinitionSource, ProcedureOptions, create_procedure_sql, drop_procedure_sql,
    procedure_create_statement,
};
pub use output::{OutputParameter, OutputType};
pub use registry::{BoundProcedure, Location, ProcedureRegistry, Scope, UseOptions};

/// Procedure names keep their case; only embedded quotes are doubled.
pub fn quote_procedure_name(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
