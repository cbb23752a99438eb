//! CSV parsing.
//!
//! Parsing happens in two passes over the raw bytes: the first infers the schema, the second
//! decodes the rows into record batches.

use datafusion::arrow::{
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use sluice_schemas::{CsvOptions, InferenceMode};
use std::{collections::HashSet, fmt, io::Cursor, sync::Arc};
use tracing::debug;

use crate::{Dataset, Error, Result};

/// Strategy deriving the column types of a CSV object.
pub trait SchemaInference: Send + Sync + fmt::Debug {
    /// Infer the schema of `data`, reading at most `max_records` records when set.
    fn infer(&self, data: &[u8], format: &Format, max_records: Option<usize>) -> Result<Schema>;
}

/// Arrow's type inference: integers, floats, booleans, dates and timestamps are detected,
/// everything else is text. Columns without a single value become text as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowInference;

impl SchemaInference for ArrowInference {
    fn infer(&self, data: &[u8], format: &Format, max_records: Option<usize>) -> Result<Schema> {
        let (schema, _) = format.infer_schema(Cursor::new(data), max_records)?;

        Ok(map_fields(&schema, |field| match field.data_type() {
            DataType::Null => DataType::Utf8,
            other => other.clone(),
        }))
    }
}

/// Every column is text, leaving all typing to downstream SQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextInference;

impl SchemaInference for TextInference {
    fn infer(&self, data: &[u8], format: &Format, max_records: Option<usize>) -> Result<Schema> {
        let (schema, _) = format.infer_schema(Cursor::new(data), max_records)?;
        Ok(map_fields(&schema, |_| DataType::Utf8))
    }
}

/// Inference strategy for the configured mode
pub fn inference_for(mode: InferenceMode) -> Box<dyn SchemaInference> {
    match mode {
        InferenceMode::Infer => Box::new(ArrowInference),
        InferenceMode::Text => Box::new(TextInference),
    }
}

/// Parse CSV bytes using the inference mode configured in `options`.
pub fn parse_csv(data: &[u8], options: &CsvOptions) -> Result<Dataset> {
    let inference = inference_for(options.inference);
    parse_csv_with(data, options, inference.as_ref())
}

/// Parse CSV bytes with an explicit inference strategy.
///
/// Empty input is an error. Input holding only a header yields a dataset without rows.
pub fn parse_csv_with(
    data: &[u8],
    options: &CsvOptions,
    inference: &dyn SchemaInference,
) -> Result<Dataset> {
    options.validate()?;

    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::Empty);
    }

    let format = Format::default()
        .with_header(options.has_header)
        .with_delimiter(options.delimiter_byte())
        .with_quote(options.quote_byte());

    let inferred = inference.infer(data, &format, options.infer_records)?;
    let schema = Arc::new(normalize_headers(&inferred));
    debug!(?schema, "Inferred CSV schema");

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_format(format)
        .with_batch_size(options.batch_size)
        .build(Cursor::new(data))?;

    let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, _>>()?;

    Ok(Dataset::new(schema, batches))
}

fn map_fields(schema: &Schema, data_type: impl Fn(&Field) -> DataType) -> Schema {
    Schema::new(
        schema
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), data_type(field), true))
            .collect::<Vec<_>>(),
    )
}

/// Blank header names become `unnamed_<i>`, repeated names get a `_<n>` suffix.
fn normalize_headers(schema: &Schema) -> Schema {
    let mut seen = HashSet::new();

    let fields = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let base = match field.name().trim() {
                "" => format!("unnamed_{i}"),
                name => name.to_string(),
            };

            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{base}_{n}");
                n += 1;
            }

            Field::new(name, field.data_type().clone(), field.is_nullable())
        })
        .collect::<Vec<_>>();

    Schema::new(fields)
}
