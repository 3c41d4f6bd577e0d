//! Explicit adapter registry.
//!
//! Host code registers a transport factory under a name and opens
//! connections through the registry instead of relying on load-time hooks.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::ConnectionConfig;
use crate::engine::HanaConnection;
use crate::error::{HanaError, HanaResult};
use crate::transport::Transport;

pub type TransportFactory = Box<dyn Fn(&ConnectionConfig) -> HanaResult<Box<dyn Transport>>>;

#[derive(Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, TransportFactory>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ConnectionConfig) -> HanaResult<Box<dyn Transport>> + 'static,
    {
        tracing::debug!(adapter = name, "registered adapter");
        self.factories.insert(name.to_lowercase(), Box::new(factory));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Validate `config`, open a transport and set up the configured schema.
    ///
    /// Configuration errors surface before the factory is invoked.
    pub fn connect(&self, name: &str, config: ConnectionConfig) -> HanaResult<HanaConnection> {
        let factory = self
            .factories
            .get(&name.to_lowercase())
            .ok_or_else(|| HanaError::Config(format!("No adapter registered under '{}'", name)))?;
        config.validate()?;
        let transport = factory(&config)?;
        HanaConnection::open(transport, config)
    }
}
