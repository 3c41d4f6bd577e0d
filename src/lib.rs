//! # hana-bridge
//!
//! SQL dialect layer and stored-procedure bridge for SAP HANA, spoken over
//! a synchronous call-level transport.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use hana_bridge::prelude::*;
//!
//! let mut conn = HanaConnection::open(Box::new(transport), ConnectionConfig::discover()?)?;
//!
//! conn.create_table(
//!     "users",
//!     &[ColumnSpec::new("email", LogicalType::String).limit(120).not_null()],
//!     &TableOptions::default(),
//! )?;
//! // CREATE SEQUENCE "USERS_seq" INCREMENT BY 1 START WITH 1 NO CYCLE
//! // CREATE COLUMN TABLE "USERS"
//! //     ("ID" BIGINT NOT NULL PRIMARY KEY, "EMAIL" NVARCHAR(120) NOT NULL)
//!
//! let total = OutputParameter::new();
//! conn.call_stored_procedure(
//!     "sum_orders",
//!     args![23, &total],
//!     &CallOptions::default().output("total", "decimal"),
//! )?;
//! ```
//!
//! ## Layers
//!
//! | Module       | Role                                             |
//! |--------------|--------------------------------------------------|
//! | `quoting`    | identifiers, literals, bound values              |
//! | `transpiler` | pure DDL and catalog SQL                         |
//! | `schema`     | DDL and introspection run on a connection        |
//! | `engine`     | statement execution, transactions                |
//! | `procedure`  | create, drop and call stored procedures          |

pub mod adapter;
pub mod ast;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod limits;
pub mod parser;
pub mod procedure;
pub mod quoting;
pub mod schema;
pub mod transpiler;
pub mod transport;

pub mod prelude {
    pub use crate::adapter::AdapterRegistry;
    pub use crate::args;
    pub use crate::ast::{LogicalType, Value};
    pub use crate::config::{ConnectionConfig, DefaultTimezone, Dsn};
    pub use crate::engine::{AccessMode, Bind, HanaConnection, QueryResult, Record};
    pub use crate::error::{HanaError, HanaResult};
    pub use crate::procedure::{
        Argument, BoundProcedure, CallOptions, DefinitionSource, Location, OutputParameter,
        ProcedureOptions, ProcedureRegistry, ProcedureResult, Scope, UseOptions,
    };
    pub use crate::quoting::{BoundValue, Quoting, quote_column_name, quote_table_name};
    pub use crate::schema::{
        ColumnDefinition, ColumnSpec, IndexDefinition, Sequence, TableKind, TableOptions,
    };
    pub use crate::transport::{
        ColumnDescriptor, ParamType, Statement, Transport, TransportError, TransportResult,
    };
}
