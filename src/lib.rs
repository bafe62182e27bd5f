//! # sqlgen
//!
//! Generate JavaScript table definitions from live database schemas
//!
//! This crate provides a CLI tool and library for introspecting MySQL and
//! PostgreSQL schemas and rendering them as node-sql, waterline or plain
//! JavaScript definitions.

pub mod codegen;
pub mod config;
pub mod error;
pub mod generate;
pub mod introspect;
pub mod naming;
pub mod schema;

pub mod prelude {
    pub use crate::codegen::{CodeGenerator, GenerationOptions, JavaScriptGenerator, Target};
    pub use crate::config::{ConnectionOptions, ConnectionTarget, Dialect};
    pub use crate::error::SqlgenError;
    pub use crate::generate::{generate, generate_with, GenerationResult, GenerationStats, Options};
    pub use crate::introspect::{Introspector, LiveDatabase, SchemaSource, TableFilter};
    pub use crate::schema::{Column, DataType, DatabaseSchema, Table};
}

pub use generate::{generate, generate_with};

#[cfg(feature = "postgres")]
pub use introspect::PostgresIntrospector;

#[cfg(feature = "mysql")]
pub use introspect::MySqlIntrospector;
