//! Bound procedure callables and their registration table.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::engine::HanaConnection;
use crate::error::{HanaError, HanaResult};

use super::call::{Argument, CallOptions, OutputValues, ProcedureResult};

/// Scope a wrapper is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    #[default]
    Class,
    Instance,
    Both,
}

impl Location {
    fn includes(&self, scope: Scope) -> bool {
        matches!(
            (self, scope),
            (Location::Both, _)
                | (Location::Class, Scope::Class)
                | (Location::Instance, Scope::Instance)
        )
    }
}

/// Scope a wrapper is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Class,
    Instance,
}

#[derive(Debug, Clone, Default)]
pub struct UseOptions {
    /// Register under this name instead of the procedure's own.
    pub alias: Option<String>,
    pub location: Location,
    pub call: CallOptions,
}

impl UseOptions {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn call(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }
}

type Invoke =
    dyn Fn(&mut HanaConnection, Vec<Argument>, &CallOptions) -> HanaResult<ProcedureResult>;

/// A procedure call with its name and options already captured.
#[derive(Clone)]
pub struct BoundProcedure {
    procedure_name: String,
    options: CallOptions,
    invoke: Rc<Invoke>,
}

impl fmt::Debug for BoundProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundProcedure")
            .field("procedure_name", &self.procedure_name)
            .field("options", &self.options)
            .finish()
    }
}

impl BoundProcedure {
    pub fn new(procedure_name: &str, options: CallOptions) -> Self {
        let name = procedure_name.to_string();
        Self {
            procedure_name: procedure_name.to_string(),
            options,
            invoke: Rc::new(
                move |conn: &mut HanaConnection, arguments: Vec<Argument>, options: &CallOptions| {
                    conn.call_stored_procedure(&name, arguments, options)
                },
            ),
        }
    }

    pub fn procedure_name(&self) -> &str {
        &self.procedure_name
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    pub fn call(
        &self,
        conn: &mut HanaConnection,
        arguments: Vec<Argument>,
    ) -> HanaResult<ProcedureResult> {
        (self.invoke)(conn, arguments, &self.options)
    }

    /// Call with a trailing callback; it replaces any callback bound earlier.
    pub fn call_with<F>(
        &self,
        conn: &mut HanaConnection,
        arguments: Vec<Argument>,
        callback: F,
    ) -> HanaResult<ProcedureResult>
    where
        F: Fn(&ProcedureResult, &OutputValues) + 'static,
    {
        let options = self.options.clone().on_result(callback);
        (self.invoke)(conn, arguments, &options)
    }
}

/// Name -> callable tables for class and instance scope.
#[derive(Debug, Clone, Default)]
pub struct ProcedureRegistry {
    class_scope: BTreeMap<String, BoundProcedure>,
    instance_scope: BTreeMap<String, BoundProcedure>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `procedure_name` and register it under its name or alias.
    pub fn use_stored_procedure(
        &mut self,
        procedure_name: &str,
        options: UseOptions,
    ) -> BoundProcedure {
        let method_name = options.alias.clone().unwrap_or_else(|| procedure_name.to_string());
        let bound = BoundProcedure::new(procedure_name, options.call);
        if options.location.includes(Scope::Class) {
            self.class_scope.insert(method_name.clone(), bound.clone());
        }
        if options.location.includes(Scope::Instance) {
            self.instance_scope.insert(method_name.clone(), bound.clone());
        }
        tracing::debug!(
            procedure = procedure_name,
            name = %method_name,
            location = ?options.location,
            "bound stored procedure"
        );
        bound
    }

    pub fn get(&self, scope: Scope, name: &str) -> Option<&BoundProcedure> {
        match scope {
            Scope::Class => self.class_scope.get(name),
            Scope::Instance => self.instance_scope.get(name),
        }
    }

    pub fn responds_to(&self, scope: Scope, name: &str) -> bool {
        self.get(scope, name).is_some()
    }

    pub fn names(&self, scope: Scope) -> Vec<&str> {
        let table = match scope {
            Scope::Class => &self.class_scope,
            Scope::Instance => &self.instance_scope,
        };
        table.keys().map(String::as_str).collect()
    }

    pub fn invoke(
        &self,
        scope: Scope,
        name: &str,
        conn: &mut HanaConnection,
        arguments: Vec<Argument>,
    ) -> HanaResult<ProcedureResult> {
        self.get(scope, name)
            .ok_or_else(|| {
                HanaError::argument(format!("No stored procedure wrapper named '{}'", name))
            })?
            .call(conn, arguments)
    }
}
