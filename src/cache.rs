//! Per-connection memo of table structure.
//!
//! Entries are filled on first lookup and only ever discarded all at once.

use std::collections::HashMap;

use crate::engine::HanaConnection;
use crate::error::HanaResult;
use crate::schema::{ColumnDefinition, TableMetadata};

#[derive(Debug, Default, Clone)]
pub struct SchemaCache {
    columns: HashMap<String, Vec<ColumnDefinition>>,
    columns_hash: HashMap<String, HashMap<String, ColumnDefinition>>,
    primary_keys: HashMap<String, Option<String>>,
}

/// Identifiers are upcased when quoted, so `users` and `USERS` share an entry.
fn key(table: &str) -> String {
    table.to_lowercase()
}

impl SchemaCache {
    pub fn columns(&self, table: &str) -> Option<&Vec<ColumnDefinition>> {
        self.columns.get(&key(table))
    }

    pub fn columns_hash(&self, table: &str) -> Option<&HashMap<String, ColumnDefinition>> {
        self.columns_hash.get(&key(table))
    }

    pub fn primary_key(&self, table: &str) -> Option<&Option<String>> {
        self.primary_keys.get(&key(table))
    }

    pub fn insert_columns(&mut self, table: &str, columns: Vec<ColumnDefinition>) {
        let hash = columns
            .iter()
            .map(|c| (c.name().to_lowercase(), c.clone()))
            .collect();
        self.columns_hash.insert(key(table), hash);
        self.columns.insert(key(table), columns);
    }

    pub fn insert_primary_key(&mut self, table: &str, primary_key: Option<String>) {
        self.primary_keys.insert(key(table), primary_key);
    }

    /// Number of tables with memoized columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.primary_keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.columns_hash.clear();
        self.primary_keys.clear();
    }
}

impl HanaConnection {
    /// Columns of `table`, loaded from the catalog once per cache lifetime.
    pub fn columns(&mut self, table: &str) -> HanaResult<Vec<ColumnDefinition>> {
        if let Some(columns) = self.cache().columns(table) {
            return Ok(columns.clone());
        }
        let columns = self.load_columns(table)?;
        self.cache_mut().insert_columns(table, columns.clone());
        Ok(columns)
    }

    /// Columns of `table` keyed by lower-cased name.
    pub fn columns_hash(&mut self, table: &str) -> HanaResult<HashMap<String, ColumnDefinition>> {
        if self.cache().columns_hash(table).is_none() {
            self.columns(table)?;
        }
        Ok(self.cache().columns_hash(table).cloned().unwrap_or_default())
    }

    /// Primary key of `table`; `None` when the table does not exist.
    pub fn primary_key(&mut self, table: &str) -> HanaResult<Option<String>> {
        if let Some(primary_key) = self.cache().primary_key(table) {
            return Ok(primary_key.clone());
        }
        let primary_key = if self.table_exists(table)? {
            self.load_primary_key(table)?
        } else {
            None
        };
        self.cache_mut().insert_primary_key(table, primary_key.clone());
        Ok(primary_key)
    }

    pub fn table_metadata(&mut self, table: &str) -> HanaResult<TableMetadata> {
        let columns = self.columns(table)?;
        let columns_hash = self.columns_hash(table)?;
        let primary_key = self.primary_key(table)?;
        Ok(TableMetadata {
            name: table.to_string(),
            columns,
            columns_hash,
            primary_key,
        })
    }

    pub fn clear_cache(&mut self) {
        let count = self.cache().len();
        self.cache_mut().clear();
        tracing::debug!("Invalidated {} schema cache entries", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_is_all_or_nothing() {
        let mut cache = SchemaCache::default();
        cache.insert_columns(
            "users",
            vec![ColumnDefinition::new("ID", "BIGINT", false, None, None, None)],
        );
        cache.insert_primary_key("users", Some("id".into()));
        assert_eq!(cache.len(), 1);
        assert!(cache.columns_hash("users").unwrap().contains_key("id"));

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.columns("users").is_none());
        assert!(cache.primary_key("users").is_none());
    }

    #[test]
    fn test_table_names_fold_case() {
        let mut cache = SchemaCache::default();
        cache.insert_columns("users", Vec::new());
        cache.insert_primary_key("Users", None);

        assert!(cache.columns("USERS").is_some());
        assert!(cache.columns_hash("Users").is_some());
        assert_eq!(cache.primary_key("users"), Some(&None));
        assert_eq!(cache.len(), 1);
    }
}
