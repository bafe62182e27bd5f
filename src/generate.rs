//! Generation pipeline
//!
//! Validates options, introspects the database, renders the schema and wraps
//! the result with any prepend/append text. Every step must succeed for the
//! next one to run; there is no partial output.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::codegen::{CodeGenerator, GenerationOptions, JavaScriptGenerator};
use crate::config::ConnectionOptions;
use crate::introspect::{LiveDatabase, SchemaSource, TableFilter};
use crate::prelude::SqlgenError;

/// Everything a generation run needs
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub connection: ConnectionOptions,
    pub generation: GenerationOptions,
    pub filter: TableFilter,
}

impl Options {
    pub fn new(connection: ConnectionOptions, generation: GenerationOptions) -> Self {
        Self {
            connection,
            generation,
            filter: TableFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Run statistics, computed from the introspected schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationStats {
    pub tables: usize,
    pub columns: usize,
    pub elapsed: Duration,
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub buffer: String,
    pub stats: GenerationStats,
}

/// Generate code from a live database
pub fn generate(options: &Options) -> Result<GenerationResult, SqlgenError> {
    generate_with(options, &mut LiveDatabase)
}

/// Generate code from whatever schema `source` provides
pub fn generate_with<S: SchemaSource>(
    options: &Options,
    source: &mut S,
) -> Result<GenerationResult, SqlgenError> {
    let started = Instant::now();

    let target = options.connection.resolve()?;
    let schema = source.load(&target, &options.filter)?;

    let tables = schema.tables.len();
    let columns = schema.column_count();
    debug!(tables, columns, "Schema loaded");

    let generation = &options.generation;
    let rendered = JavaScriptGenerator::new().generate(&schema, generation)?;
    let buffer = wrap(rendered, generation);

    let stats = GenerationStats {
        tables,
        columns,
        elapsed: started.elapsed(),
    };
    info!(
        tables = stats.tables,
        columns = stats.columns,
        elapsed = ?stats.elapsed,
        "Generation complete"
    );

    Ok(GenerationResult { buffer, stats })
}

/// Apply prepend and append text around the rendered buffer
fn wrap(rendered: String, options: &GenerationOptions) -> String {
    let mut buffer = match &options.prepend {
        Some(prepend) => format!("{}{}{}", prepend, options.eol, rendered),
        None => rendered,
    };
    if let Some(append) = &options.append {
        buffer.push_str(&options.eol);
        buffer.push_str(append);
    }
    buffer
}
