//! Database introspection
//!
//! This module provides functionality for extracting schema information
//! from databases. Each supported dialect has its own feature-gated submodule
//! that owns its connection for the duration of one introspection.

use tracing::info;

use crate::config::{ConnectionTarget, Dialect};
use crate::prelude::{DatabaseSchema, SqlgenError};

/// Filters to apply during introspection
#[derive(Debug, Default, Clone)]
pub struct TableFilter {
    /// Only include these tables (if Some)
    pub include: Option<Vec<String>>,
    /// Exclude these tables
    pub exclude: Option<Vec<String>>,
}

impl TableFilter {
    /// Check if a table should be included
    pub fn should_include(&self, table_name: &str) -> bool {
        let listed = |names: &Option<Vec<String>>| {
            names
                .as_ref()
                .map(|names| names.iter().any(|t| t == table_name))
        };

        listed(&self.include).unwrap_or(true) && !listed(&self.exclude).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }
}

/// Trait for database introspection implementations
pub trait Introspector {
    /// Introspect a namespace and return structured schema information
    fn introspect(
        &mut self,
        namespace: &str,
        filter: &TableFilter,
    ) -> Result<DatabaseSchema, SqlgenError>;
}

/// Something that can produce a schema for a connection target
pub trait SchemaSource {
    fn load(
        &mut self,
        target: &ConnectionTarget,
        filter: &TableFilter,
    ) -> Result<DatabaseSchema, SqlgenError>;
}

/// Schema source backed by a live database connection
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveDatabase;

impl SchemaSource for LiveDatabase {
    fn load(
        &mut self,
        target: &ConnectionTarget,
        filter: &TableFilter,
    ) -> Result<DatabaseSchema, SqlgenError> {
        info!(
            dialect = %target.dialect,
            dsn = %target.redacted_dsn(),
            namespace = ?target.namespace(),
            "Introspecting database"
        );

        match target.dialect {
            Dialect::Pg => introspect_postgres(target, filter),
            Dialect::Mysql => introspect_mysql(target, filter),
        }
    }
}

#[cfg(feature = "postgres")]
fn introspect_postgres(
    target: &ConnectionTarget,
    filter: &TableFilter,
) -> Result<DatabaseSchema, SqlgenError> {
    postgres::introspect(target, filter)
}

#[cfg(not(feature = "postgres"))]
fn introspect_postgres(
    _target: &ConnectionTarget,
    _filter: &TableFilter,
) -> Result<DatabaseSchema, SqlgenError> {
    Err(SqlgenError::DialectDisabled(Dialect::Pg))
}

#[cfg(feature = "mysql")]
fn introspect_mysql(
    target: &ConnectionTarget,
    filter: &TableFilter,
) -> Result<DatabaseSchema, SqlgenError> {
    mysql::introspect(target, filter)
}

#[cfg(not(feature = "mysql"))]
fn introspect_mysql(
    _target: &ConnectionTarget,
    _filter: &TableFilter,
) -> Result<DatabaseSchema, SqlgenError> {
    Err(SqlgenError::DialectDisabled(Dialect::Mysql))
}

// Feature-gated database implementations
#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "mysql")]
mod mysql;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresIntrospector;

#[cfg(feature = "mysql")]
pub use self::mysql::MySqlIntrospector;
