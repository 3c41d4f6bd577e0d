//! Connection configuration.
//!
//! Loaded from TOML (`hana.toml` in the working directory, or
//! `<config dir>/hana-bridge/hana.toml`). Required options are checked by
//! [`ConnectionConfig::validate`] before any transport is opened.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{HanaError, HanaResult};
use crate::schema::TableKind;

pub const CONFIG_FILE: &str = "hana.toml";

/// Zone that datetimes are converted to before being rendered as literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultTimezone {
    #[default]
    Utc,
    Local,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionConfig {
    pub dsn: Option<String>,
    /// Driver name used when `dsn` is an attribute string.
    pub dsn_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Schema every catalog query is scoped to.
    pub database: Option<String>,
    #[serde(default)]
    pub default_timezone: DefaultTimezone,
    #[serde(default)]
    pub default_table_type: TableKind,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default = "default_procedures_dir")]
    pub procedures_dir: PathBuf,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_procedures_dir() -> PathBuf {
    PathBuf::from("db").join("procedures")
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            dsn_name: None,
            username: None,
            password: None,
            database: None,
            default_timezone: DefaultTimezone::default(),
            default_table_type: TableKind::default(),
            primary_key: default_primary_key(),
            procedures_dir: default_procedures_dir(),
        }
    }
}

/// How the transport should locate the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Dsn {
    /// A registered data-source name.
    Named(String),
    /// `KEY=VALUE;KEY=VALUE` driver attributes. Malformed pairs are dropped.
    Attributes {
        driver: String,
        attrs: BTreeMap<String, String>,
    },
}

impl ConnectionConfig {
    pub fn from_toml_str(content: &str) -> HanaResult<Self> {
        toml::from_str(content).map_err(|e| HanaError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> HanaResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HanaError::Config(format!("Failed to read '{}': {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load `hana.toml` from the working directory or the user config dir.
    pub fn discover() -> HanaResult<Self> {
        let local = Path::new(CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }
        match Self::user_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Err(HanaError::Config(format!(
                "{} not found in the working directory or user config dir",
                CONFIG_FILE
            ))),
        }
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hana-bridge").join(CONFIG_FILE))
    }

    /// Check that every option needed to connect is present.
    pub fn validate(&self) -> HanaResult<()> {
        let required = [
            ("dsn", &self.dsn),
            ("username", &self.username),
            ("password", &self.password),
            ("database", &self.database),
        ];
        for (name, value) in required {
            if value.is_none() {
                return Err(HanaError::missing_option(name));
            }
        }
        Ok(())
    }

    /// Configured schema name, or an empty string before validation.
    pub fn schema(&self) -> &str {
        self.database.as_deref().unwrap_or_default()
    }

    pub fn parsed_dsn(&self) -> HanaResult<Dsn> {
        let dsn = self.dsn.as_deref().ok_or_else(|| HanaError::missing_option("dsn"))?;
        if !dsn.contains(';') {
            return Ok(Dsn::Named(dsn.to_string()));
        }
        let attrs = dsn
            .split(';')
            .filter_map(|pair| {
                let parts: Vec<&str> = pair.split('=').collect();
                match parts.as_slice() {
                    [key, value] => Some((key.to_string(), value.to_string())),
                    _ => None,
                }
            })
            .collect();
        Ok(Dsn::Attributes {
            driver: self.dsn_name.clone().unwrap_or_else(|| "Driver1".to_string()),
            attrs,
        })
    }
}
