//! Identifier naming
//!
//! Generated code refers to tables and columns through identifiers that may
//! differ from the database names. The views built here pair each schema
//! object with its identifier without touching the schema itself, so the
//! original names stay available to emitters.

use std::collections::HashMap;

use tracing::warn;

use crate::schema::{Column, DatabaseSchema, Table};

/// Convert snake_case to camelCase
///
/// The first segment is lower-cased and every following segment gets an
/// upper-case first letter. Names without underscores are returned unchanged,
/// as are names made only of underscores.
pub fn camelize(name: &str) -> String {
    if !name.contains('_') {
        return name.to_string();
    }

    let mut segments = name.split('_').filter(|s| !s.is_empty());
    let Some(first) = segments.next() else {
        return name.to_string();
    };

    let mut out = first.to_lowercase();
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(head) = chars.next() {
            out.extend(head.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// A table paired with its generated identifier
#[derive(Debug, Clone)]
pub struct TableView<'a> {
    pub table: &'a Table,
    pub identifier: String,
    pub columns: Vec<ColumnView<'a>>,
}

/// A column paired with its generated identifier
#[derive(Debug, Clone)]
pub struct ColumnView<'a> {
    pub column: &'a Column,
    pub identifier: String,
}

impl ColumnView<'_> {
    /// True when the identifier differs from the database name
    pub fn is_renamed(&self) -> bool {
        self.identifier != self.column.name
    }
}

/// Build identifier views over a schema, in schema order
pub fn views(schema: &DatabaseSchema, camel_case: bool) -> Vec<TableView<'_>> {
    let ident = |name: &str| {
        if camel_case {
            camelize(name)
        } else {
            name.to_string()
        }
    };

    let tables: Vec<TableView<'_>> = schema
        .tables
        .iter()
        .map(|table| {
            let view = TableView {
                table,
                identifier: ident(&table.name),
                columns: table
                    .columns
                    .iter()
                    .map(|column| ColumnView {
                        column,
                        identifier: ident(&column.name),
                    })
                    .collect(),
            };
            let columns = view
                .columns
                .iter()
                .map(|c| (c.identifier.as_str(), c.column.name.as_str()));
            for (first, second) in collisions(columns) {
                warn!(
                    table = ?table.name,
                    first = ?first,
                    second = ?second,
                    "Columns map to the same identifier"
                );
            }
            view
        })
        .collect();

    let names = tables
        .iter()
        .map(|t| (t.identifier.as_str(), t.table.name.as_str()));
    for (first, second) in collisions(names) {
        warn!(first = ?first, second = ?second, "Tables map to the same identifier");
    }

    tables
}

/// Pairs of names that share an identifier, given `(identifier, name)` items
pub fn collisions<'a>(
    items: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Vec<(&'a str, &'a str)> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut found = Vec::new();
    for (identifier, name) in items {
        match seen.get(identifier) {
            Some(first) => found.push((*first, name)),
            None => {
                seen.insert(identifier, name);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    #[test]
    fn test_camelize_simple() {
        assert_eq!(camelize("first_name"), "firstName");
        assert_eq!(camelize("order_line_items"), "orderLineItems");
    }

    #[test]
    fn test_camelize_passthrough() {
        assert_eq!(camelize("users"), "users");
        assert_eq!(camelize("UserId"), "UserId");
    }

    #[test]
    fn test_camelize_lowercases_first_segment() {
        assert_eq!(camelize("User_accounts"), "userAccounts");
    }

    #[test]
    fn test_camelize_extra_underscores() {
        assert_eq!(camelize("_id"), "id");
        assert_eq!(camelize("a__b"), "aB");
        assert_eq!(camelize("trailing_"), "trailing");
        assert_eq!(camelize("___"), "___");
    }

    #[test]
    fn test_views_keep_original_names() {
        let schema = DatabaseSchema {
            name: "public".to_string(),
            tables: vec![Table {
                name: "user_accounts".to_string(),
                columns: vec![
                    Column::new("id", "integer", DataType::Integer),
                    Column::new("first_name", "text", DataType::Text),
                ],
                primary_key: vec!["id".to_string()],
            }],
        };

        let views = views(&schema, true);

        assert_eq!(views[0].identifier, "userAccounts");
        assert_eq!(views[0].table.name, "user_accounts");
        assert_eq!(views[0].columns[1].identifier, "firstName");
        assert_eq!(views[0].columns[1].column.name, "first_name");
        assert!(views[0].columns[1].is_renamed());
        assert!(!views[0].columns[0].is_renamed());
        assert_eq!(schema.tables[0].columns[1].name, "first_name");
    }

    #[test]
    fn test_collisions() {
        let found = collisions([
            ("firstName", "first_name"),
            ("id", "id"),
            ("firstName", "firstName"),
        ]);
        assert_eq!(found, vec![("first_name", "firstName")]);

        assert!(collisions([("a", "a"), ("b", "b")]).is_empty());
    }

    #[test]
    fn test_views_with_colliding_columns() {
        let schema = DatabaseSchema {
            name: "public".to_string(),
            tables: vec![Table {
                name: "people".to_string(),
                columns: vec![
                    Column::new("first_name", "text", DataType::Text),
                    Column::new("firstName", "text", DataType::Text),
                ],
                primary_key: vec![],
            }],
        };

        let views = views(&schema, true);

        // Both columns are still emitted; the collision is only reported
        assert_eq!(views[0].columns.len(), 2);
        assert_eq!(views[0].columns[0].identifier, "firstName");
        assert_eq!(views[0].columns[1].identifier, "firstName");
        let pairs = views[0]
            .columns
            .iter()
            .map(|c| (c.identifier.as_str(), c.column.name.as_str()));
        assert_eq!(collisions(pairs), vec![("first_name", "firstName")]);
    }

    #[test]
    fn test_views_without_camel_case() {
        let schema = DatabaseSchema {
            name: "public".to_string(),
            tables: vec![Table {
                name: "user_accounts".to_string(),
                columns: vec![Column::new("first_name", "text", DataType::Text)],
                primary_key: vec![],
            }],
        };

        let views = views(&schema, false);

        assert_eq!(views[0].identifier, "user_accounts");
        assert!(!views[0].columns[0].is_renamed());
    }
}
