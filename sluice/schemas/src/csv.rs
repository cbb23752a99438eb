//! CSV parsing options.

use crate::error::ConfigError;
use crate::serde_helpers::{default_comma, default_csv_batch_size, default_quote, default_true};
use bon::Builder;
use serde::{Deserialize, Serialize};

/// How column types are derived from raw CSV data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// Infer integer, float, boolean, date and timestamp columns from the data
    #[default]
    Infer,
    /// Keep every column as text
    Text,
}

/// Options used when parsing a CSV object into a dataset.
///
/// # Examples
///
/// ```
/// use sluice_schemas::{CsvOptions, InferenceMode};
///
/// let options = CsvOptions::builder()
///     .delimiter(';')
///     .inference(InferenceMode::Text)
///     .build();
///
/// assert!(options.has_header);
/// assert_eq!(options.delimiter, ';');
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "snake_case")]
pub struct CsvOptions {
    /// Set to `true` if the first line holds the column names
    #[serde(default = "default_true")]
    #[builder(default = default_true())]
    pub has_header: bool,

    /// Field delimiter
    #[serde(default = "default_comma")]
    #[builder(default = default_comma())]
    pub delimiter: char,

    /// Quote character
    #[serde(default = "default_quote")]
    #[builder(default = default_quote())]
    pub quote: char,

    /// Number of records to read for schema inference, `None` reads the whole object
    #[serde(default)]
    pub infer_records: Option<usize>,

    /// Column type inference mode
    #[serde(default)]
    #[builder(default)]
    pub inference: InferenceMode,

    /// Rows per record batch
    #[serde(default = "default_csv_batch_size")]
    #[builder(default = default_csv_batch_size())]
    pub batch_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CsvOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for c in [self.delimiter, self.quote] {
            if !c.is_ascii() {
                return Err(ConfigError::NonAsciiCsvChar(c));
            }
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }

        Ok(())
    }

    /// Delimiter as a single byte, callers must have validated the options
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    /// Quote character as a single byte, callers must have validated the options
    pub fn quote_byte(&self) -> u8 {
        self.quote as u8
    }
}
