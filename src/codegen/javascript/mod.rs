//! JavaScript code generator
//!
//! Renders one definition per table for the node-sql, waterline and plain
//! targets, then assembles the banner, dependency handling and definitions
//! into a single buffer.

use minijinja::Environment;
use tracing::{debug, info};

use crate::codegen::{banner, reflow, CodeGenerator, GenerationOptions, Target};
use crate::error::SqlgenError;
use crate::naming::{views, ColumnView, TableView};
use crate::schema::{DataType, DatabaseSchema};

/// JavaScript code generator
pub struct JavaScriptGenerator {
    env: Environment<'static>,
}

impl JavaScriptGenerator {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_filter("quote", |value: String| js_string(&value));

        // Register templates
        env.add_template("node_sql", include_str!("templates/node_sql.js.jinja"))
            .expect("Failed to load node-sql template");
        env.add_template("waterline", include_str!("templates/waterline.js.jinja"))
            .expect("Failed to load waterline template");
        env.add_template("plain", include_str!("templates/plain.js.jinja"))
            .expect("Failed to load plain template");

        Self { env }
    }
}

impl Default for JavaScriptGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Variable and package a target's definitions depend on
struct Dependency {
    variable: &'static str,
    package: &'static str,
}

fn dependency(target: Target) -> Option<Dependency> {
    match target {
        Target::NodeSql => Some(Dependency {
            variable: "sql",
            package: "sql",
        }),
        Target::Waterline => Some(Dependency {
            variable: "Waterline",
            package: "waterline",
        }),
        Target::Plain => None,
    }
}

impl CodeGenerator for JavaScriptGenerator {
    fn generate(
        &self,
        schema: &DatabaseSchema,
        options: &GenerationOptions,
    ) -> Result<String, SqlgenError> {
        info!(
            output = %options.target,
            tables = schema.tables.len(),
            camelize = options.camelize,
            modularize = options.modularize,
            "Generating JavaScript code"
        );

        let definitions = views(schema, options.camelize)
            .iter()
            .map(|view| self.render_table(view, schema, options))
            .collect::<Result<Vec<_>, _>>()?;

        let mut text = String::new();
        if !options.omit_comments {
            text.push_str(&banner());
            text.push('\n');
        }

        match dependency(options.target) {
            Some(dep) if options.modularize => {
                let mut inner = vec!["var exports = {};".to_string()];
                inner.extend(definitions);
                inner.push("return exports;".to_string());

                text.push_str(&format!("module.exports = function({}) {{\n", dep.variable));
                text.push_str(&indent_lines(&inner.join("\n\n")));
                text.push_str("\n};");
            }
            Some(dep) => {
                let mut blocks = vec![format!("var {} = require('{}');", dep.variable, dep.package)];
                blocks.extend(definitions);
                text.push_str(&blocks.join("\n\n"));
            }
            None => text.push_str(&definitions.join("\n\n")),
        }
        text.push('\n');

        debug!(bytes = text.len(), "Rendered definitions");
        Ok(reflow(&text, &options.indent, &options.eol))
    }
}

impl JavaScriptGenerator {
    /// Render the definition of a single table
    fn render_table(
        &self,
        view: &TableView<'_>,
        schema: &DatabaseSchema,
        options: &GenerationOptions,
    ) -> Result<String, SqlgenError> {
        let table = view.table;
        let template_name = match options.target {
            Target::NodeSql => "node_sql",
            Target::Waterline => "waterline",
            Target::Plain => "plain",
        };

        let template = self
            .env
            .get_template(template_name)
            .map_err(|e| SqlgenError::CodeGen {
                table: table.name.clone(),
                message: format!("Template error: {}", e),
            })?;

        let columns: Vec<_> = view
            .columns
            .iter()
            .map(|col| {
                minijinja::context! {
                    key => property_key(&col.identifier),
                    fields => column_fields(options.target, view, col),
                }
            })
            .collect();

        let ctx = minijinja::context! {
            export_ref => export_ref(&view.identifier),
            name => &table.name,
            identity => table.name.to_lowercase(),
            schema => options.include_schema.then_some(&schema.name),
            primary_key => table.primary_key.iter().map(|pk| js_string(pk)).collect::<Vec<_>>().join(", "),
            columns => columns,
        };

        template.render(ctx).map_err(|e| SqlgenError::CodeGen {
            table: table.name.clone(),
            message: format!("Render error: {}", e),
        })
    }
}

/// Build the `key: value` entries describing a column for a target
fn column_fields(target: Target, table: &TableView<'_>, view: &ColumnView<'_>) -> Vec<String> {
    let col = view.column;
    let is_pk = table.table.is_primary_key(&col.name);
    let mut fields = Vec::new();

    match target {
        Target::NodeSql => {
            fields.push(format!("name: {}", js_string(&col.name)));
            if view.is_renamed() {
                fields.push(format!("property: {}", js_string(&view.identifier)));
            }
            fields.push(format!("dataType: {}", js_string(&col.sql_type)));
            if !col.is_nullable {
                fields.push("notNull: true".to_string());
            }
            if is_pk {
                fields.push("primaryKey: true".to_string());
            }
            if let Some(default) = &col.default {
                fields.push(format!("defaultValue: {}", js_string(default)));
            }
        }
        Target::Waterline => {
            fields.push(format!("type: {}", js_string(waterline_type(&col.data_type))));
            if view.is_renamed() {
                fields.push(format!("columnName: {}", js_string(&col.name)));
            }
            if let Some(size) = col.max_length {
                fields.push(format!("size: {}", size));
            }
            if is_pk {
                fields.push("primaryKey: true".to_string());
            }
            if col.is_auto_generated {
                fields.push("autoIncrement: true".to_string());
            }
            if !col.is_nullable && !col.has_default() && !col.is_auto_generated {
                fields.push("required: true".to_string());
            }
        }
        Target::Plain => {
            fields.push(format!("name: {}", js_string(&col.name)));
            if view.is_renamed() {
                fields.push(format!("property: {}", js_string(&view.identifier)));
            }
            fields.push(format!("type: {}", js_string(&col.sql_type)));
            fields.push(format!("nullable: {}", col.is_nullable));
            fields.push(format!(
                "defaultValue: {}",
                col.default.as_deref().map_or("null".to_string(), js_string)
            ));
            if is_pk {
                fields.push("primaryKey: true".to_string());
            }
            if let Some(len) = col.max_length {
                fields.push(format!("maxLength: {}", len));
            }
            if let Some(precision) = col.precision {
                fields.push(format!("precision: {}", precision));
            }
            if let Some(scale) = col.scale {
                fields.push(format!("scale: {}", scale));
            }
        }
    }

    fields
}

/// Map a column type onto a waterline attribute type
fn waterline_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::SmallInt | DataType::Integer | DataType::BigInt => "integer",
        DataType::Real | DataType::DoublePrecision | DataType::Numeric => "float",
        DataType::Boolean => "boolean",
        DataType::Text => "text",
        DataType::Varchar(_) | DataType::Char(_) | DataType::Uuid | DataType::Other(_) => "string",
        DataType::Timestamp | DataType::TimestampTz => "datetime",
        DataType::Date => "date",
        DataType::Time | DataType::TimeTz => "time",
        DataType::Json | DataType::JsonBinary => "json",
        DataType::Binary => "binary",
        DataType::Array(_) => "array",
    }
}

/// Quote a value as a single-quoted JavaScript string literal
pub fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `name` can be used as a bare JavaScript identifier
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');

    valid_start
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}

/// Object key for an identifier, quoted when necessary
fn property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        js_string(name)
    }
}

/// Assignment target on `exports` for an identifier
fn export_ref(name: &str) -> String {
    if is_identifier(name) {
        format!("exports.{}", name)
    } else {
        format!("exports[{}]", js_string(name))
    }
}

/// Indent every non-empty line by one level
fn indent_lines(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("\t{}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures;

    fn render(options: GenerationOptions) -> String {
        JavaScriptGenerator::new()
            .generate(&fixtures::schema(), &options.with_omit_comments(true))
            .unwrap()
    }

    #[test]
    fn test_node_sql_defaults() {
        let expected = "\
var sql = require('sql');

exports.users = sql.define({
\tname: 'users',
\tcolumns: [
\t\t{ name: 'id', dataType: 'integer', notNull: true, primaryKey: true, defaultValue: 'nextval(\\'users_id_seq\\'::regclass)' },
\t\t{ name: 'first_name', dataType: 'character varying(50)' },
\t\t{ name: 'email', dataType: 'text', notNull: true }
\t]
});

exports.order_items = sql.define({
\tname: 'order_items',
\tcolumns: [
\t\t{ name: 'order_id', dataType: 'integer', notNull: true, primaryKey: true },
\t\t{ name: 'line_no', dataType: 'integer', notNull: true, primaryKey: true },
\t\t{ name: 'unit_price', dataType: 'numeric(10,2)', notNull: true, defaultValue: '0' }
\t]
});
";
        assert_eq!(render(GenerationOptions::default()), expected);
    }

    #[test]
    fn test_node_sql_camelize_keeps_db_names() {
        let output = render(GenerationOptions::default().with_camelize(true));

        assert!(output.contains("exports.orderItems = sql.define({"));
        assert!(output.contains("\tname: 'order_items',"));
        assert!(output.contains("{ name: 'first_name', property: 'firstName', dataType: 'character varying(50)' },"));
    }

    #[test]
    fn test_node_sql_include_schema() {
        let output = render(GenerationOptions::default().with_include_schema(true));

        assert!(output.contains("\tname: 'users',\n\tschema: 'public',\n\tcolumns: ["));
        assert_eq!(output.matches("schema: 'public'").count(), 2);
    }

    #[test]
    fn test_node_sql_modularize() {
        let output = render(GenerationOptions::default().with_modularize(true));

        assert!(!output.contains("require("));
        assert!(output.starts_with("module.exports = function(sql) {\n\tvar exports = {};\n\n\texports.users = sql.define({\n\t\tname: 'users',"));
        assert!(output.ends_with("\t});\n\n\treturn exports;\n};\n"));
    }

    #[test]
    fn test_waterline() {
        let output = render(GenerationOptions::new(Target::Waterline).with_camelize(true));

        assert!(output.starts_with("var Waterline = require('waterline');\n\n"));
        assert!(output.contains("exports.orderItems = Waterline.Collection.extend({\n\tidentity: 'order_items',\n\ttableName: 'order_items',\n\tattributes: {\n"));
        assert!(output.contains("\t\tid: { type: 'integer', primaryKey: true, autoIncrement: true },\n"));
        assert!(output.contains("\t\tfirstName: { type: 'string', columnName: 'first_name', size: 50 },\n"));
        assert!(output.contains("\t\temail: { type: 'text', required: true }\n\t}\n});"));
        assert!(output.contains("\t\tunitPrice: { type: 'float', columnName: 'unit_price' }\n"));
    }

    #[test]
    fn test_waterline_include_schema() {
        let output = render(GenerationOptions::new(Target::Waterline).with_include_schema(true));
        assert!(output.contains("\tmeta: { schemaName: 'public' },\n"));
    }

    #[test]
    fn test_plain() {
        let output = render(GenerationOptions::new(Target::Plain));

        assert!(output.starts_with("exports.users = {\n\tname: 'users',\n\tprimaryKey: ['id'],\n\tcolumns: [\n"));
        assert!(output.contains("\t\t{ name: 'first_name', type: 'character varying(50)', nullable: true, defaultValue: null, maxLength: 50 },\n"));
        assert!(output.contains("\tprimaryKey: ['order_id', 'line_no'],\n"));
        assert!(output.contains("\t\t{ name: 'unit_price', type: 'numeric(10,2)', nullable: false, defaultValue: '0', precision: 10, scale: 2 }\n"));
        assert!(!output.contains("require("));
    }

    #[test]
    fn test_plain_include_schema() {
        let output = render(GenerationOptions::new(Target::Plain).with_include_schema(true));

        assert!(output.starts_with("exports.users = {\n\tname: 'users',\n\tschema: 'public',\n\tprimaryKey: ['id'],\n"));
        assert_eq!(output.matches("\tschema: 'public',\n").count(), 2);
        assert!(!render(GenerationOptions::new(Target::Plain)).contains("schema:"));
    }

    #[test]
    fn test_colliding_identifiers_are_all_emitted() {
        use crate::schema::{Column, Table};

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
        let options = GenerationOptions::new(Target::Waterline)
            .with_camelize(true)
            .with_omit_comments(true);

        let output = JavaScriptGenerator::new().generate(&schema, &options).unwrap();

        assert!(output.contains("\t\tfirstName: { type: 'text', columnName: 'first_name' },\n"));
        assert!(output.contains("\t\tfirstName: { type: 'text' }\n"));
    }

    #[test]
    fn test_plain_ignores_modularize() {
        assert_eq!(
            render(GenerationOptions::new(Target::Plain).with_modularize(true)),
            render(GenerationOptions::new(Target::Plain))
        );
    }

    #[test]
    fn test_banner_is_first_line() {
        let output = JavaScriptGenerator::new()
            .generate(&fixtures::schema(), &GenerationOptions::default())
            .unwrap();
        let (first, rest) = output.split_once('\n').unwrap();

        assert!(first.starts_with("// autogenerated by sqlgen"));
        assert_eq!(rest, render(GenerationOptions::default()));
    }

    #[test]
    fn test_custom_indent_and_eol() {
        let output = render(GenerationOptions::default().with_indent("  ").with_eol("\r\n"));

        assert!(output.contains("exports.users = sql.define({\r\n  name: 'users',\r\n  columns: [\r\n    { name: 'id'"));
        assert!(output.ends_with("});\r\n"));
        assert!(!output.contains('\t'));
    }

    #[test]
    fn test_empty_schema() {
        let schema = DatabaseSchema {
            name: "public".to_string(),
            tables: vec![],
        };
        let output = JavaScriptGenerator::new()
            .generate(&schema, &GenerationOptions::default().with_omit_comments(true))
            .unwrap();
        assert_eq!(output, "var sql = require('sql');\n");
    }

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string("plain"), "'plain'");
        assert_eq!(js_string("it's"), "'it\\'s'");
        assert_eq!(js_string("a\\b"), "'a\\\\b'");
        assert_eq!(js_string("line\nbreak"), "'line\\nbreak'");
        assert_eq!(js_string("\u{1}"), "'\\u0001'");
    }

    #[test]
    fn test_export_ref_quotes_invalid_identifiers() {
        assert_eq!(export_ref("users"), "exports.users");
        assert_eq!(export_ref("order items"), "exports['order items']");
        assert_eq!(export_ref("2fa_codes"), "exports['2fa_codes']");
        assert_eq!(export_ref("delete"), "exports['delete']");
        assert_eq!(property_key("$meta"), "$meta");
    }

    #[test]
    fn test_waterline_types() {
        assert_eq!(waterline_type(&DataType::BigInt), "integer");
        assert_eq!(waterline_type(&DataType::TimestampTz), "datetime");
        assert_eq!(waterline_type(&DataType::JsonBinary), "json");
        assert_eq!(
            waterline_type(&DataType::Array(Box::new(DataType::Text))),
            "array"
        );
        assert_eq!(waterline_type(&DataType::Other("citext".to_string())), "string");
    }
}
