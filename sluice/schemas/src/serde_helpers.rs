//! Shared serde helper functions for default values.

pub fn default_true() -> bool {
    true
}

pub fn default_comma() -> char {
    ','
}

pub fn default_quote() -> char {
    '"'
}

pub fn default_csv_batch_size() -> usize {
    8192
}

/// Default batch size (rows) for warehouse inserts
pub fn default_insert_batch_size() -> usize {
    1000
}

pub fn default_prefix() -> String {
    "raw/".to_string()
}

pub fn default_extension() -> String {
    "csv".to_string()
}

pub fn default_region() -> String {
    "us-east-1".to_string()
}

pub fn default_scheme() -> String {
    "postgresql".to_string()
}

pub fn default_port() -> u16 {
    5432
}

pub fn default_odbc_driver() -> String {
    "PostgreSQL Unicode".to_string()
}

pub fn default_concurrency() -> usize {
    4
}

pub fn default_max_retries() -> u32 {
    2
}

pub fn default_retry_delay_ms() -> u64 {
    500
}
