//! Creating and dropping stored procedures.

use std::io;
use std::path::PathBuf;

use crate::engine::HanaConnection;
use crate::error::{HanaError, HanaResult};
use crate::parser::{NAME_PLACEHOLDER, is_create_procedure};

use super::quote_procedure_name;

/// Where a procedure body comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefinitionSource {
    #[default]
    None,
    /// Relative paths resolve against the configured procedures directory.
    File(PathBuf),
    Inline(String),
}

impl DefinitionSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        DefinitionSource::File(path.into())
    }

    pub fn inline(body: impl Into<String>) -> Self {
        DefinitionSource::Inline(body.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcedureOptions {
    /// Adds `READS SQL DATA` to the generated header.
    pub read_only: bool,
}

impl Default for ProcedureOptions {
    fn default() -> Self {
        Self { read_only: true }
    }
}

impl ProcedureOptions {
    pub fn writable() -> Self {
        Self { read_only: false }
    }
}

/// Wrap a body in the SQLScript procedure skeleton.
pub fn procedure_create_statement(name: &str, body: &str, read_only: bool) -> String {
    let body = body.trim();
    let terminator = if body.ends_with(';') { "" } else { ";" };
    let indented = body.lines().collect::<Vec<_>>().join("\n\t");
    format!(
        concat!(
            "CREATE PROCEDURE {}\n\tLANGUAGE SQLSCRIPT\n\tSQL SECURITY INVOKER{}\n",
            "AS\nBEGIN\n\t{}{}\nEND\n"
        ),
        quote_procedure_name(name),
        if read_only { "\n\tREADS SQL DATA" } else { "" },
        indented,
        terminator
    )
}

/// Statement for `definition`: verbatim (with `{name}` replaced) when it
/// already carries a `CREATE PROCEDURE` header, otherwise wrapped.
pub fn create_procedure_sql(
    name: &str,
    definition: &str,
    options: &ProcedureOptions,
) -> HanaResult<String> {
    let definition = definition.trim();
    if definition.is_empty() {
        return Err(missing_definition(name));
    }
    if is_create_procedure(definition) {
        Ok(definition.replace(NAME_PLACEHOLDER, name))
    } else {
        Ok(procedure_create_statement(name, definition, options.read_only))
    }
}

pub fn drop_procedure_sql(name: &str) -> String {
    format!("DROP PROCEDURE {}", quote_procedure_name(name))
}

fn missing_definition(name: &str) -> HanaError {
    HanaError::argument(format!("Missing definition for stored procedure '{}'.", name))
}

impl HanaConnection {
    /// Read the body a source points at. `None` when there is no source.
    pub fn resolve_definition(&self, source: &DefinitionSource) -> HanaResult<Option<String>> {
        match source {
            DefinitionSource::None => Ok(None),
            DefinitionSource::Inline(body) => Ok(Some(body.clone())),
            DefinitionSource::File(file) => {
                let path = if file.is_absolute() {
                    file.clone()
                } else {
                    self.config().procedures_dir.join(file)
                };
                if !path.exists() {
                    return Err(HanaError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("File not found: '{}'.", path.display()),
                    )));
                }
                Ok(Some(std::fs::read_to_string(&path)?))
            }
        }
    }

    pub fn create_procedure(
        &mut self,
        name: &str,
        options: &ProcedureOptions,
        source: &DefinitionSource,
    ) -> HanaResult<()> {
        let definition = self
            .resolve_definition(source)?
            .ok_or_else(|| missing_definition(name))?;
        let sql = create_procedure_sql(name, &definition, options)?;
        self.execute(&sql, Some("CREATE PROCEDURE"))
    }

    /// Drop a procedure; dropping one that does not exist succeeds.
    pub fn drop_procedure(&mut self, name: &str) -> HanaResult<()> {
        match self.execute(&drop_procedure_sql(name), Some("DROP PROCEDURE")) {
            Err(err) if err.transport_message_contains("invalid name") => {
                tracing::debug!(procedure = name, "procedure did not exist");
                Ok(())
            }
            other => other,
        }
    }
}
