use std::str::FromStr;

use postgres::{Client, Config, NoTls};
use tracing::{debug, error, info, trace, warn};

use super::{Introspector, TableFilter};
use crate::config::{ConnectionTarget, Dialect};
use crate::prelude::SqlgenError;
use crate::schema::{extract_length, extract_params, Column, DataType, DatabaseSchema, Table};

/// Connect, introspect and disconnect
///
/// The client is closed on both success and failure paths.
pub(super) fn introspect(
    target: &ConnectionTarget,
    filter: &TableFilter,
) -> Result<DatabaseSchema, SqlgenError> {
    let connection_error = |e: postgres::Error| {
        error!(dsn = %target.redacted_dsn(), error = ?e, "Failed to connect to PostgreSQL");
        SqlgenError::Connection {
            dialect: Dialect::Pg,
            source: Box::new(e),
        }
    };

    let mut config = Config::from_str(&target.dsn).map_err(connection_error)?;
    config.dbname(&target.database);

    info!(dsn = %target.redacted_dsn(), database = ?target.database, "Connecting to PostgreSQL");
    let mut client = config.connect(NoTls).map_err(connection_error)?;
    info!("Connected to database");

    let result = PostgresIntrospector::new(&mut client).introspect(target.namespace(), filter);

    if let Err(e) = client.close() {
        warn!(error = ?e, "Failed to close PostgreSQL connection");
    }

    result
}

/// PostgreSQL introspector
pub struct PostgresIntrospector<'a> {
    client: &'a mut Client,
}

impl<'a> PostgresIntrospector<'a> {
    pub fn new(client: &'a mut Client) -> Self {
        Self { client }
    }
}

impl Introspector for PostgresIntrospector<'_> {
    fn introspect(
        &mut self,
        schema_name: &str,
        filter: &TableFilter,
    ) -> Result<DatabaseSchema, SqlgenError> {
        info!(schema = ?schema_name, "Starting schema introspection");

        let all_table_names = query_tables(self.client, schema_name)?;
        debug!(count = ?all_table_names.len(), "Found all tables");

        let table_names: Vec<String> = all_table_names
            .into_iter()
            .filter(|name| filter.should_include(name))
            .collect();
        debug!(count = ?table_names.len(), "Tables after filtering");

        let mut tables = Vec::with_capacity(table_names.len());
        for table_name in table_names {
            debug!(table = ?table_name, "Introspecting table");

            let columns = query_columns(self.client, schema_name, &table_name)?;
            trace!(table = ?table_name, columns = ?columns.len(), "Found columns");

            let primary_key = query_primary_key(self.client, schema_name, &table_name)?;
            trace!(table = ?table_name, primary_key = ?primary_key, "Found primary key");

            tables.push(Table {
                name: table_name,
                columns,
                primary_key,
            });
        }

        info!(
            schema = ?schema_name,
            tables = ?tables.len(),
            "Schema introspection complete"
        );

        Ok(DatabaseSchema {
            name: schema_name.to_string(),
            tables,
        })
    }
}

fn query_error(schema_name: &str, message: String, e: postgres::Error) -> SqlgenError {
    error!(schema = ?schema_name, error = ?e, "{}", message);
    SqlgenError::Query {
        schema: schema_name.to_string(),
        message,
        source: Box::new(e),
    }
}

/// Query all table names in a schema
fn query_tables(client: &mut Client, schema_name: &str) -> Result<Vec<String>, SqlgenError> {
    trace!(schema = ?schema_name, "Querying tables");

    let sql = r#"
        SELECT c.relname::text AS table_name
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind IN ('r', 'p')
            AND NOT c.relispartition
            AND n.nspname = $1
        ORDER BY c.relname
    "#;

    let rows = client
        .query(sql, &[&schema_name])
        .map_err(|e| query_error(schema_name, "Failed to query tables".to_string(), e))?;

    let tables = rows.iter().map(|row| row.get("table_name")).collect();
    trace!(tables = ?tables, "Tables found");
    Ok(tables)
}

/// Query all columns for a table
fn query_columns(
    client: &mut Client,
    schema_name: &str,
    table_name: &str,
) -> Result<Vec<Column>, SqlgenError> {
    trace!(schema = ?schema_name, table = ?table_name, "Querying columns");

    let sql = r#"
        SELECT
            a.attname::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS data_type,
            NOT a.attnotnull AS is_nullable,
            pg_get_expr(d.adbin, d.adrelid) AS default_value,
            a.attidentity <> '' AS is_identity
        FROM pg_attribute a
        JOIN pg_class c ON c.oid = a.attrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_attrdef d ON d.adrelid = c.oid AND d.adnum = a.attnum
        WHERE c.relname = $1
            AND n.nspname = $2
            AND a.attnum > 0
            AND NOT a.attisdropped
        ORDER BY a.attnum
    "#;

    let rows = client
        .query(sql, &[&table_name, &schema_name])
        .map_err(|e| {
            query_error(
                schema_name,
                format!("Failed to query columns for table '{}'", table_name),
                e,
            )
        })?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let column_name: String = row.get("column_name");
        let data_type_str: String = row.get("data_type");
        let is_nullable: bool = row.get("is_nullable");
        let default_value: Option<String> = row.get("default_value");
        let is_identity: bool = row.get("is_identity");

        let is_auto_generated = is_identity || is_auto_generated_column(&default_value);
        let data_type = parse_data_type(&data_type_str);
        let max_length = match &data_type {
            DataType::Varchar(len) | DataType::Char(len) => *len,
            _ => None,
        };
        let (precision, scale) = match data_type {
            DataType::Numeric => extract_params(&data_type_str),
            _ => (None, None),
        };

        trace!(
            column = ?column_name,
            data_type = ?data_type_str,
            parsed_type = ?data_type,
            is_nullable = ?is_nullable,
            default = ?default_value,
            is_auto_generated = ?is_auto_generated,
            "Parsed column"
        );

        columns.push(Column {
            name: column_name,
            sql_type: data_type_str,
            data_type,
            is_nullable,
            default: default_value,
            is_auto_generated,
            max_length,
            precision,
            scale,
        });
    }

    Ok(columns)
}

/// Query primary key columns for a table
fn query_primary_key(
    client: &mut Client,
    schema_name: &str,
    table_name: &str,
) -> Result<Vec<String>, SqlgenError> {
    trace!(schema = ?schema_name, table = ?table_name, "Querying primary key");

    let sql = r#"
        SELECT a.attname::text AS column_name
        FROM pg_constraint con
        JOIN pg_class c ON c.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(con.conkey)
        WHERE con.contype = 'p'
            AND c.relname = $1
            AND n.nspname = $2
        ORDER BY array_position(con.conkey, a.attnum)
    "#;

    let rows = client
        .query(sql, &[&table_name, &schema_name])
        .map_err(|e| {
            query_error(
                schema_name,
                format!("Failed to query primary key for table '{}'", table_name),
                e,
            )
        })?;

    let pk_columns = rows.iter().map(|row| row.get("column_name")).collect();
    trace!(table = ?table_name, primary_key = ?pk_columns, "Primary key found");
    Ok(pk_columns)
}

/// Check if a default expression marks a SERIAL/BIGSERIAL column
fn is_auto_generated_column(default_value: &Option<String>) -> bool {
    default_value
        .as_deref()
        .is_some_and(|default| default.to_lowercase().contains("nextval("))
}

/// Parse PostgreSQL type string into DataType enum
fn parse_data_type(type_str: &str) -> DataType {
    let lower = type_str.to_lowercase();
    let trimmed = lower.trim();

    // Arrays first (e.g., "integer[]", "character varying(255)[]")
    if let Some(inner_type) = trimmed.strip_suffix("[]") {
        return DataType::Array(Box::new(parse_data_type(inner_type)));
    }

    if trimmed.starts_with("character varying") || trimmed.starts_with("varchar") {
        return DataType::Varchar(extract_length(trimmed));
    }
    if trimmed.starts_with("character(") || trimmed.starts_with("char(") || trimmed == "character" {
        return DataType::Char(extract_length(trimmed));
    }
    if trimmed.starts_with("numeric") || trimmed.starts_with("decimal") {
        return DataType::Numeric;
    }

    if trimmed.starts_with("timestamp") {
        if trimmed.contains("with time zone") || trimmed.contains("timestamptz") {
            return DataType::TimestampTz;
        }
        return DataType::Timestamp;
    }

    if trimmed.starts_with("time ") || trimmed.starts_with("time(") || trimmed == "time" {
        if trimmed.contains("with time zone") {
            return DataType::TimeTz;
        }
        return DataType::Time;
    }

    match trimmed {
        "smallint" | "int2" => DataType::SmallInt,
        "integer" | "int" | "int4" => DataType::Integer,
        "bigint" | "int8" => DataType::BigInt,
        "boolean" | "bool" => DataType::Boolean,
        "text" => DataType::Text,
        "real" | "float4" => DataType::Real,
        "double precision" | "float8" => DataType::DoublePrecision,
        "date" => DataType::Date,
        "uuid" => DataType::Uuid,
        "json" => DataType::Json,
        "jsonb" => DataType::JsonBinary,
        "bytea" => DataType::Binary,
        "timetz" => DataType::TimeTz,
        "timestamptz" => DataType::TimestampTz,
        _ => DataType::Other(type_str.to_string()),
    }
}
