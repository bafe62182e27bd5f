use std::str::FromStr;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Row};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, info, trace, warn};

use super::{Introspector, TableFilter};
use crate::config::{ConnectionTarget, Dialect};
use crate::prelude::SqlgenError;
use crate::schema::{extract_length, Column, DataType, DatabaseSchema, Table};

/// Connect, introspect and disconnect
///
/// sqlx is async, so the connection is driven on a private current-thread
/// runtime. The connection is closed on both success and failure paths.
pub(super) fn introspect(
    target: &ConnectionTarget,
    filter: &TableFilter,
) -> Result<DatabaseSchema, SqlgenError> {
    let connection_error = |e: sqlx::Error| {
        error!(dsn = %target.redacted_dsn(), error = ?e, "Failed to connect to MySQL");
        SqlgenError::Connection {
            dialect: Dialect::Mysql,
            source: Box::new(e),
        }
    };

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SqlgenError::Connection {
            dialect: Dialect::Mysql,
            source: Box::new(e),
        })?;

    let options = MySqlConnectOptions::from_str(&target.dsn)
        .map_err(connection_error)?
        .database(&target.database);

    info!(dsn = %target.redacted_dsn(), database = ?target.database, "Connecting to MySQL");
    let mut conn = runtime
        .block_on(MySqlConnection::connect_with(&options))
        .map_err(connection_error)?;
    info!("Connected to database");

    let result =
        MySqlIntrospector::new(&runtime, &mut conn).introspect(target.namespace(), filter);

    if let Err(e) = runtime.block_on(conn.close()) {
        warn!(error = ?e, "Failed to close MySQL connection");
    }

    result
}

/// MySQL introspector
pub struct MySqlIntrospector<'a> {
    runtime: &'a Runtime,
    conn: &'a mut MySqlConnection,
    /// MariaDB reports column defaults as SQL expressions
    mariadb: bool,
}

impl<'a> MySqlIntrospector<'a> {
    pub fn new(runtime: &'a Runtime, conn: &'a mut MySqlConnection) -> Self {
        Self {
            runtime,
            conn,
            mariadb: false,
        }
    }

    /// Run a catalog query with string parameters
    fn fetch(&mut self, sql: &str, args: &[&str]) -> Result<Vec<MySqlRow>, sqlx::Error> {
        let mut query = sqlx::query(sql);
        for arg in args {
            query = query.bind(*arg);
        }
        self.runtime.block_on(query.fetch_all(&mut *self.conn))
    }

    /// Detect whether the server is MariaDB
    fn query_server_flavor(&mut self, database: &str) -> Result<bool, SqlgenError> {
        let rows = self
            .fetch("SELECT CAST(VERSION() AS CHAR) AS version", &[])
            .map_err(|e| query_error(database, "Failed to query server version".to_string(), e))?;

        let version: Option<String> = match rows.first() {
            Some(row) => row
                .try_get("version")
                .map_err(|e| query_error(database, "Failed to read server version".to_string(), e))?,
            None => None,
        };
        let mariadb = version.as_deref().is_some_and(is_mariadb_version);
        debug!(version = ?version, mariadb, "Server version");
        Ok(mariadb)
    }

    /// Query all base table names in a database
    fn query_tables(&mut self, database: &str) -> Result<Vec<String>, SqlgenError> {
        trace!(database = ?database, "Querying tables");

        let sql = r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ?
                AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows = self
            .fetch(sql, &[database])
            .map_err(|e| query_error(database, "Failed to query tables".to_string(), e))?;

        let tables = rows
            .iter()
            .map(|row| row.try_get("table_name"))
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| query_error(database, "Failed to read table name".to_string(), e))?;
        trace!(tables = ?tables, "Tables found");
        Ok(tables)
    }

    /// Query all columns for a table
    fn query_columns(&mut self, database: &str, table_name: &str) -> Result<Vec<Column>, SqlgenError> {
        trace!(database = ?database, table = ?table_name, "Querying columns");

        let sql = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(COLUMN_TYPE AS CHAR) AS column_type,
                CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                CAST(EXTRA AS CHAR) AS extra,
                CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS max_length,
                CAST(NUMERIC_PRECISION AS SIGNED) AS numeric_precision,
                CAST(NUMERIC_SCALE AS SIGNED) AS numeric_scale
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ?
                AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let columns_error = |e: sqlx::Error| {
            query_error(
                database,
                format!("Failed to query columns for table '{}'", table_name),
                e,
            )
        };

        let rows = self.fetch(sql, &[database, table_name]).map_err(columns_error)?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let column = read_column(&row, self.mariadb).map_err(columns_error)?;
            trace!(
                column = ?column.name,
                data_type = ?column.sql_type,
                parsed_type = ?column.data_type,
                is_nullable = ?column.is_nullable,
                default = ?column.default,
                is_auto_generated = ?column.is_auto_generated,
                "Parsed column"
            );
            columns.push(column);
        }

        Ok(columns)
    }

    /// Query primary key columns for a table
    fn query_primary_key(
        &mut self,
        database: &str,
        table_name: &str,
    ) -> Result<Vec<String>, SqlgenError> {
        trace!(database = ?database, table = ?table_name, "Querying primary key");

        let sql = r#"
            SELECT CAST(COLUMN_NAME AS CHAR) AS column_name
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ?
                AND TABLE_NAME = ?
                AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;

        let pk_error = |e: sqlx::Error| {
            query_error(
                database,
                format!("Failed to query primary key for table '{}'", table_name),
                e,
            )
        };

        let rows = self.fetch(sql, &[database, table_name]).map_err(pk_error)?;
        let pk_columns = rows
            .iter()
            .map(|row| row.try_get("column_name"))
            .collect::<Result<Vec<String>, _>>()
            .map_err(pk_error)?;
        trace!(table = ?table_name, primary_key = ?pk_columns, "Primary key found");
        Ok(pk_columns)
    }
}

impl Introspector for MySqlIntrospector<'_> {
    fn introspect(
        &mut self,
        database: &str,
        filter: &TableFilter,
    ) -> Result<DatabaseSchema, SqlgenError> {
        info!(database = ?database, "Starting schema introspection");

        self.mariadb = self.query_server_flavor(database)?;

        let table_names: Vec<String> = self
            .query_tables(database)?
            .into_iter()
            .filter(|name| filter.should_include(name))
            .collect();
        debug!(count = ?table_names.len(), "Tables after filtering");

        let mut tables = Vec::with_capacity(table_names.len());
        for table_name in table_names {
            debug!(table = ?table_name, "Introspecting table");

            let columns = self.query_columns(database, &table_name)?;
            let primary_key = self.query_primary_key(database, &table_name)?;

            tables.push(Table {
                name: table_name,
                columns,
                primary_key,
            });
        }

        info!(
            database = ?database,
            tables = ?tables.len(),
            "Schema introspection complete"
        );

        Ok(DatabaseSchema {
            name: database.to_string(),
            tables,
        })
    }
}

fn query_error(database: &str, message: String, e: sqlx::Error) -> SqlgenError {
    error!(database = ?database, error = ?e, "{}", message);
    SqlgenError::Query {
        schema: database.to_string(),
        message,
        source: Box::new(e),
    }
}

fn read_column(row: &MySqlRow, mariadb: bool) -> Result<Column, sqlx::Error> {
    let name: String = row.try_get("column_name")?;
    let sql_type: String = row.try_get("column_type")?;
    let is_nullable: String = row.try_get("is_nullable")?;
    let default: Option<String> = row.try_get("column_default")?;
    let extra: Option<String> = row.try_get("extra")?;
    let max_length: Option<i64> = row.try_get("max_length")?;
    let precision: Option<i64> = row.try_get("numeric_precision")?;
    let scale: Option<i64> = row.try_get("numeric_scale")?;

    let data_type = parse_data_type(&sql_type);
    let is_auto_generated = extra
        .as_deref()
        .is_some_and(|extra| extra.to_lowercase().contains("auto_increment"));

    Ok(Column {
        name,
        sql_type,
        data_type,
        is_nullable: is_nullable.eq_ignore_ascii_case("YES"),
        default: normalize_default(default, mariadb),
        is_auto_generated,
        max_length: max_length.and_then(|n| u32::try_from(n).ok()),
        precision: precision.and_then(|n| u32::try_from(n).ok()),
        scale: scale.and_then(|n| u32::try_from(n).ok()),
    })
}

fn is_mariadb_version(version: &str) -> bool {
    version.to_ascii_lowercase().contains("mariadb")
}

/// Map a COLUMN_DEFAULT value to the default's literal text
///
/// MariaDB 10.2.7+ reports the default as an expression: `NULL` for no
/// default and string literals in single quotes. MySQL reports the raw value.
fn normalize_default(default: Option<String>, mariadb: bool) -> Option<String> {
    if !mariadb {
        return default;
    }

    let default = default?;
    if default == "NULL" {
        return None;
    }

    match default
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        Some(literal) => Some(literal.replace("''", "'")),
        None => Some(default),
    }
}

/// Parse a MySQL COLUMN_TYPE string into DataType enum
fn parse_data_type(type_str: &str) -> DataType {
    let lower = type_str.to_lowercase();
    let trimmed = lower
        .trim()
        .trim_end_matches(" zerofill")
        .trim_end_matches(" unsigned");

    // tinyint(1) is MySQL's boolean
    if trimmed == "tinyint(1)" {
        return DataType::Boolean;
    }

    let base = trimmed.split('(').next().unwrap_or(trimmed).trim();
    match base {
        "tinyint" | "smallint" | "year" => DataType::SmallInt,
        "mediumint" | "int" | "integer" => DataType::Integer,
        "bigint" => DataType::BigInt,
        "bool" | "boolean" | "bit" => DataType::Boolean,
        "float" => DataType::Real,
        "double" | "double precision" | "real" => DataType::DoublePrecision,
        "decimal" | "numeric" | "dec" | "fixed" => DataType::Numeric,
        "varchar" => DataType::Varchar(extract_length(trimmed)),
        "char" => DataType::Char(extract_length(trimmed)),
        "tinytext" | "text" | "mediumtext" | "longtext" => DataType::Text,
        "datetime" | "timestamp" => DataType::Timestamp,
        "date" => DataType::Date,
        "time" => DataType::Time,
        "json" => DataType::Json,
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
            DataType::Binary
        }
        _ => DataType::Other(type_str.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_types() {
        assert_eq!(parse_data_type("int(11)"), DataType::Integer);
        assert_eq!(parse_data_type("int unsigned"), DataType::Integer);
        assert_eq!(parse_data_type("bigint(20) unsigned"), DataType::BigInt);
        assert_eq!(parse_data_type("smallint(6)"), DataType::SmallInt);
        assert_eq!(parse_data_type("mediumint(8) unsigned zerofill"), DataType::Integer);
    }

    #[test]
    fn test_parse_tinyint_one_is_boolean() {
        assert_eq!(parse_data_type("tinyint(1)"), DataType::Boolean);
        assert_eq!(parse_data_type("tinyint(4)"), DataType::SmallInt);
    }

    #[test]
    fn test_parse_strings() {
        assert_eq!(parse_data_type("varchar(255)"), DataType::Varchar(Some(255)));
        assert_eq!(parse_data_type("char(2)"), DataType::Char(Some(2)));
        assert_eq!(parse_data_type("longtext"), DataType::Text);
    }

    #[test]
    fn test_parse_temporal_and_binary() {
        assert_eq!(parse_data_type("datetime"), DataType::Timestamp);
        assert_eq!(parse_data_type("timestamp"), DataType::Timestamp);
        assert_eq!(parse_data_type("date"), DataType::Date);
        assert_eq!(parse_data_type("blob"), DataType::Binary);
        assert_eq!(parse_data_type("decimal(10,2)"), DataType::Numeric);
    }

    #[test]
    fn test_mysql_defaults_are_raw() {
        assert_eq!(normalize_default(None, false), None);
        assert_eq!(
            normalize_default(Some("NULL".to_string()), false),
            Some("NULL".to_string())
        );
        assert_eq!(
            normalize_default(Some("'abc'".to_string()), false),
            Some("'abc'".to_string())
        );
    }

    #[test]
    fn test_mariadb_null_default_is_none() {
        assert_eq!(normalize_default(Some("NULL".to_string()), true), None);
        assert_eq!(normalize_default(None, true), None);
    }

    #[test]
    fn test_mariadb_string_default_is_unquoted() {
        assert_eq!(
            normalize_default(Some("'abc'".to_string()), true),
            Some("abc".to_string())
        );
        assert_eq!(
            normalize_default(Some("'it''s'".to_string()), true),
            Some("it's".to_string())
        );
        assert_eq!(
            normalize_default(Some("'NULL'".to_string()), true),
            Some("NULL".to_string())
        );
        assert_eq!(
            normalize_default(Some("''".to_string()), true),
            Some(String::new())
        );
    }

    #[test]
    fn test_mariadb_expression_default_kept() {
        assert_eq!(
            normalize_default(Some("0".to_string()), true),
            Some("0".to_string())
        );
        assert_eq!(
            normalize_default(Some("current_timestamp()".to_string()), true),
            Some("current_timestamp()".to_string())
        );
        assert_eq!(
            normalize_default(Some("'".to_string()), true),
            Some("'".to_string())
        );
    }

    #[test]
    fn test_mariadb_version_detection() {
        assert!(is_mariadb_version("10.11.6-MariaDB-0+deb12u1"));
        assert!(is_mariadb_version("5.5.5-10.6.12-MariaDB"));
        assert!(!is_mariadb_version("8.0.36"));
        assert!(!is_mariadb_version("8.0.36-0ubuntu0.22.04.1"));
    }

    #[test]
    fn test_parse_enum_falls_through() {
        assert_eq!(
            parse_data_type("enum('a','b')"),
            DataType::Other("enum('a','b')".to_string())
        );
    }
}
