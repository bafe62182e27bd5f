//! Schema data structures
//!
//! These types represent database schema information and form the contract
//! between introspection (produces) and code generation (consumes). They are
//! never mutated after introspection returns.

/// A complete database schema
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSchema {
    /// Namespace the tables were read from (Postgres schema or MySQL database)
    pub name: String,
    /// Tables in the order the database reported them
    pub tables: Vec<Table>,
}

impl DatabaseSchema {
    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }
}

/// Database table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    /// Column names that form the primary key (in order)
    pub primary_key: Vec<String>,
}

impl Table {
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == column)
    }
}

/// A table column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Declared type exactly as the database reports it
    pub sql_type: String,
    pub data_type: DataType,
    pub is_nullable: bool,
    /// Server-side default expression
    pub default: Option<String>,
    /// Column is auto-generated (SERIAL, IDENTITY, AUTO_INCREMENT)
    pub is_auto_generated: bool,
    pub max_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl Column {
    /// Column with no metadata beyond name and type
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            data_type,
            is_nullable: true,
            default: None,
            is_auto_generated: false,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    SmallInt,
    Integer,
    BigInt,
    Boolean,
    Text,
    Varchar(Option<u32>),
    Char(Option<u32>),
    Real,
    DoublePrecision,
    Numeric,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    TimeTz,
    Uuid,
    Json,
    JsonBinary,
    Binary,
    Array(Box<DataType>),
    /// Anything else (custom enums, domains, spatial types), stores the type name
    Other(String),
}

/// Extract length parameter from type like "varchar(255)" or "character varying(100)"
///
/// For two-argument types like "numeric(10,2)" the first number is returned.
pub fn extract_length(type_str: &str) -> Option<u32> {
    extract_params(type_str).0
}

/// Extract `(precision, scale)` from a type like "numeric(10,2)"
pub fn extract_params(type_str: &str) -> (Option<u32>, Option<u32>) {
    let (Some(start), Some(end)) = (type_str.find('('), type_str.find(')')) else {
        return (None, None);
    };
    if end <= start {
        return (None, None);
    }

    let mut parts = type_str[start + 1..end].split(',').map(|p| p.trim().parse().ok());
    let first = parts.next().flatten();
    let second = parts.next().flatten();
    (first, second)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Two tables, listed out of alphabetical order
    pub fn schema() -> DatabaseSchema {
        let mut id = Column::new("id", "integer", DataType::Integer);
        id.is_nullable = false;
        id.is_auto_generated = true;
        id.default = Some("nextval('users_id_seq'::regclass)".to_string());

        let mut first_name = Column::new(
            "first_name",
            "character varying(50)",
            DataType::Varchar(Some(50)),
        );
        first_name.max_length = Some(50);

        let mut email = Column::new("email", "text", DataType::Text);
        email.is_nullable = false;

        let mut order_id = Column::new("order_id", "integer", DataType::Integer);
        order_id.is_nullable = false;

        let mut line_no = Column::new("line_no", "integer", DataType::Integer);
        line_no.is_nullable = false;

        let mut unit_price = Column::new("unit_price", "numeric(10,2)", DataType::Numeric);
        unit_price.is_nullable = false;
        unit_price.default = Some("0".to_string());
        unit_price.precision = Some(10);
        unit_price.scale = Some(2);

        DatabaseSchema {
            name: "public".to_string(),
            tables: vec![
                Table {
                    name: "users".to_string(),
                    columns: vec![id, first_name, email],
                    primary_key: vec!["id".to_string()],
                },
                Table {
                    name: "order_items".to_string(),
                    columns: vec![order_id, line_no, unit_price],
                    primary_key: vec!["order_id".to_string(), "line_no".to_string()],
                },
            ],
        }
    }
}
