//! File format handling for sluice
//!
//! Raw objects are parsed into a [`Dataset`]: an Arrow schema plus the record batches holding
//! the rows. Column types come from a pluggable [`csv::SchemaInference`].

use datafusion::arrow::{datatypes::SchemaRef, record_batch::RecordBatch};

mod error;
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Prelude module with commonly used types and functions
pub mod prelude;

pub mod csv;

/// In-memory tabular data parsed from a single object
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Dataset {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn schema(&self) -> SchemaRef {
        SchemaRef::clone(&self.schema)
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn into_parts(self) -> (SchemaRef, Vec<RecordBatch>) {
        (self.schema, self.batches)
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }
}
