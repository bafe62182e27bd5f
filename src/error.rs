use thiserror::Error;

use crate::config::Dialect;

/// Boxed driver error carried by I/O failures
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// sqlgen errors
#[derive(Error, Debug)]
pub enum SqlgenError {
    #[error("options.dsn is required")]
    MissingDsn,

    #[error("options.dialect is required")]
    MissingDialect,

    #[error("options.dialect must be either \"mysql\" or \"pg\", got \"{0}\"")]
    UnsupportedDialect(String),

    #[error("options.database is required if it is not part of the DSN")]
    MissingDatabase,

    #[error("{0} support not enabled. Rebuild with --features {feat}", feat = .0.feature())]
    DialectDisabled(Dialect),

    #[error("Failed to connect to {dialect} database: {source}")]
    Connection {
        dialect: Dialect,
        #[source]
        source: DriverError,
    },

    #[error("Failed to introspect schema '{schema}': {message}")]
    Query {
        schema: String,
        message: String,
        #[source]
        source: DriverError,
    },

    #[error("Code generation failed for table '{table}': {message}")]
    CodeGen { table: String, message: String },

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SqlgenError {
    /// True for errors raised before any database I/O
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SqlgenError::MissingDsn
                | SqlgenError::MissingDialect
                | SqlgenError::UnsupportedDialect(_)
                | SqlgenError::MissingDatabase
        )
    }
}
