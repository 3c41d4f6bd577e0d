//! Server limits and feature flags reported to the host framework.

use crate::engine::HanaConnection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseLimits {
    pub table_alias_length: usize,
    pub column_name_length: usize,
    pub table_name_length: usize,
    pub index_name_length: usize,
    pub columns_per_table: usize,
    pub indexes_per_table: usize,
    pub columns_per_multicolumn_index: usize,
    pub in_clause_length: usize,
    pub sql_query_length: usize,
    pub joins_per_query: usize,
}

pub const LIMITS: DatabaseLimits = DatabaseLimits {
    table_alias_length: 128,
    column_name_length: 127,
    table_name_length: 127,
    index_name_length: 127,
    columns_per_table: 1000,
    indexes_per_table: 1023,
    columns_per_multicolumn_index: 16,
    in_clause_length: 65_536,
    sql_query_length: 65_536 * 4_096,
    joins_per_query: 256,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub migrations: bool,
    pub primary_key: bool,
    pub savepoints: bool,
    pub explain: bool,
    pub ddl_transactions: bool,
    pub bulk_alter: bool,
    pub count_distinct: bool,
    pub index_sort_order: bool,
    pub statement_cache: bool,
    /// Keys are drawn from the sequence before the INSERT runs.
    pub prefetch_primary_key: bool,
}

pub const CAPABILITIES: Capabilities = Capabilities {
    migrations: true,
    primary_key: true,
    savepoints: false,
    explain: true,
    ddl_transactions: false,
    bulk_alter: false,
    count_distinct: true,
    index_sort_order: false,
    statement_cache: true,
    prefetch_primary_key: true,
};

impl HanaConnection {
    pub fn limits(&self) -> &'static DatabaseLimits {
        &LIMITS
    }

    pub fn capabilities(&self) -> &'static Capabilities {
        &CAPABILITIES
    }
}
