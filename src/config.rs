//! Connection configuration
//!
//! Resolves a DSN plus explicit overrides into a fully specified connection
//! target. Defaults can be read from environment variables, optionally
//! loading a .env file first.

use std::{env, fmt, path::Path, str::FromStr};

use percent_encoding::percent_decode_str;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::prelude::SqlgenError;

/// Default Postgres schema when none is given
pub const DEFAULT_PG_SCHEMA: &str = "public";

/// Supported database dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Mysql,
    Pg,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Mysql => "mysql",
            Dialect::Pg => "pg",
        }
    }

    /// Cargo feature that compiles in this dialect's driver
    pub fn feature(&self) -> &'static str {
        match self {
            Dialect::Mysql => "mysql",
            Dialect::Pg => "postgres",
        }
    }

    /// Dialect implied by a DSN scheme, if any
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Dialect::Mysql),
            "postgres" | "postgresql" => Some(Dialect::Pg),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = SqlgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(Dialect::Mysql),
            "pg" => Ok(Dialect::Pg),
            other => Err(SqlgenError::UnsupportedDialect(other.to_string())),
        }
    }
}

/// Caller-supplied connection options, not yet validated
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    pub dsn: Option<String>,
    /// Raw dialect name, validated by [`ConnectionOptions::resolve`]
    pub dialect: Option<String>,
    pub database: Option<String>,
    /// Postgres only
    pub schema: Option<String>,
}

impl ConnectionOptions {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: Some(dsn.into()),
            ..Self::default()
        }
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Read connection options from environment variables
    ///
    /// All variables are optional:
    /// - DATABASE_URL
    /// - DB_DIALECT
    /// - DB_NAME
    /// - DB_SCHEMA
    pub fn from_env() -> Self {
        debug!("Loading connection options from environment");

        let read = |key: &str| match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => {
                trace!(key = ?key, "Environment variable not set");
                None
            }
        };

        Self {
            dsn: read("DATABASE_URL"),
            dialect: read("DB_DIALECT"),
            database: read("DB_NAME"),
            schema: read("DB_SCHEMA"),
        }
    }

    /// Load a .env file and then read options from environment
    pub fn load(env_file: &Path) -> Result<Self, SqlgenError> {
        if env_file.exists() {
            debug!(path = ?env_file, "Loading environment file");
            dotenvy::from_path(env_file).map_err(|e| {
                error!(path = ?env_file, error = ?e, "Failed to load environment file");
                SqlgenError::Config(format!("Failed to load {}: {}", env_file.display(), e))
            })?;
        } else {
            warn!(path = ?env_file, "Environment file not found, using existing environment");
        }

        Ok(Self::from_env())
    }

    /// Fill unset fields from `fallback`
    pub fn or(self, fallback: ConnectionOptions) -> Self {
        Self {
            dsn: self.dsn.or(fallback.dsn),
            dialect: self.dialect.or(fallback.dialect),
            database: self.database.or(fallback.database),
            schema: self.schema.or(fallback.schema),
        }
    }

    /// Validate the options into a connection target
    ///
    /// Pure: never touches the network.
    pub fn resolve(&self) -> Result<ConnectionTarget, SqlgenError> {
        let dsn = non_empty(&self.dsn).ok_or(SqlgenError::MissingDsn)?;

        // An unparsable DSN simply has no scheme and no path
        let url = Url::parse(dsn).ok();

        let dialect = match non_empty(&self.dialect) {
            Some(explicit) => explicit.parse::<Dialect>()?,
            None => url
                .as_ref()
                .and_then(|u| Dialect::from_scheme(u.scheme()))
                .ok_or(SqlgenError::MissingDialect)?,
        };

        let database = match non_empty(&self.database) {
            Some(explicit) => explicit.to_string(),
            None => match url.as_ref().and_then(database_from_url) {
                Some(segment) => decode_segment(segment)?,
                None => return Err(SqlgenError::MissingDatabase),
            },
        };

        let schema = match dialect {
            Dialect::Pg => non_empty(&self.schema).map(str::to_string),
            Dialect::Mysql => {
                if self.schema.is_some() {
                    debug!("Ignoring schema option for mysql dialect");
                }
                None
            }
        };

        let target = ConnectionTarget {
            dialect,
            dsn: dsn.to_string(),
            database,
            schema,
        };
        debug!(
            dialect = %target.dialect,
            dsn = %target.redacted_dsn(),
            database = ?target.database,
            schema = ?target.schema,
            "Resolved connection target"
        );
        Ok(target)
    }
}

/// A validated, fully specified connection target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub dialect: Dialect,
    pub dsn: String,
    pub database: String,
    pub schema: Option<String>,
}

impl ConnectionTarget {
    /// Namespace whose tables are introspected
    ///
    /// The Postgres schema (default `public`), or the MySQL database.
    pub fn namespace(&self) -> &str {
        match self.dialect {
            Dialect::Pg => self.schema.as_deref().unwrap_or(DEFAULT_PG_SCHEMA),
            Dialect::Mysql => &self.database,
        }
    }

    /// DSN with password redacted (for logs and error messages)
    pub fn redacted_dsn(&self) -> String {
        match Url::parse(&self.dsn) {
            Ok(mut url) => {
                if url.password().is_some() {
                    // Only fails for cannot-be-a-base URLs, which have no password
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            }
            Err(_) => "***".to_string(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn database_from_url(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|mut segments| segments.next())
        .filter(|segment| !segment.is_empty())
}

/// Path segments stay percent-encoded in a parsed URL
fn decode_segment(segment: &str) -> Result<String, SqlgenError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| SqlgenError::Config(format!("Invalid database name in DSN: {}", e)))
}
