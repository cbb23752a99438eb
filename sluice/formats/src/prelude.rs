//! Prelude module that exports commonly used types and functions.

pub use crate::csv::{
    inference_for, parse_csv, parse_csv_with, ArrowInference, SchemaInference, TextInference,
};
pub use crate::{Dataset, Error, Result};
