//! Code generation
//!
//! This module renders an introspected schema into source text. Templates
//! are written with tab indentation and `\n` line breaks; [`reflow`] then maps
//! them onto the configured indent and EOL tokens so every target shares the
//! same formatting rules.

use std::fmt;

use crate::prelude::{DatabaseSchema, SqlgenError};

pub mod javascript;

pub use javascript::JavaScriptGenerator;

/// Output code style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Target {
    /// Table definitions for the `sql` package
    #[default]
    NodeSql,
    /// Waterline collections
    Waterline,
    /// Dependency-free table/column metadata
    Plain,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::NodeSql => "node-sql",
            Target::Waterline => "waterline",
            Target::Plain => "plain",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub target: Target,
    /// Indentation token, repeated once per nesting level
    pub indent: String,
    /// Line terminator token
    pub eol: String,
    /// Convert underscored names to camel case identifiers
    pub camelize: bool,
    /// Omit the autogenerated banner comment
    pub omit_comments: bool,
    /// Record the source schema on each table definition
    pub include_schema: bool,
    /// Raw text placed before the output
    pub prepend: Option<String>,
    /// Raw text placed after the output
    pub append: Option<String>,
    /// Wrap output in a function that receives its dependency
    pub modularize: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            target: Target::default(),
            indent: "\t".to_string(),
            eol: "\n".to_string(),
            camelize: false,
            omit_comments: false,
            include_schema: false,
            prepend: None,
            append: None,
            modularize: false,
        }
    }
}

impl GenerationOptions {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn with_eol(mut self, eol: impl Into<String>) -> Self {
        self.eol = eol.into();
        self
    }

    pub fn with_camelize(mut self, camelize: bool) -> Self {
        self.camelize = camelize;
        self
    }

    pub fn with_omit_comments(mut self, omit: bool) -> Self {
        self.omit_comments = omit;
        self
    }

    pub fn with_include_schema(mut self, include: bool) -> Self {
        self.include_schema = include;
        self
    }

    pub fn with_prepend(mut self, text: impl Into<String>) -> Self {
        self.prepend = Some(text.into());
        self
    }

    pub fn with_append(mut self, text: impl Into<String>) -> Self {
        self.append = Some(text.into());
        self
    }

    pub fn with_modularize(mut self, modularize: bool) -> Self {
        self.modularize = modularize;
        self
    }
}

/// Trait for code generators
pub trait CodeGenerator {
    /// Render the schema into a complete output buffer
    fn generate(
        &self,
        schema: &DatabaseSchema,
        options: &GenerationOptions,
    ) -> Result<String, SqlgenError>;
}

/// Banner comment placed at the top of generated output
pub fn banner() -> String {
    format!(
        "// autogenerated by {} v{} on {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    )
}

/// Re-indent and re-terminate tab/`\n` formatted text
///
/// Each leading tab of a line becomes one `indent` token and lines are joined
/// with `eol`. Blank lines carry no indentation.
pub fn reflow(text: &str, indent: &str, eol: &str) -> String {
    text.split('\n')
        .map(|line| {
            let body = line.trim_start_matches('\t');
            if body.is_empty() {
                return String::new();
            }
            let depth = line.len() - body.len();
            format!("{}{}", indent.repeat(depth), body)
        })
        .collect::<Vec<_>>()
        .join(eol)
}
