//! Common test utilities for sluice core testing.
//!
//! Fixtures are written to temporary directories that are removed when dropped.

#![allow(dead_code)]

use sluice_core::tasks::TaskRunner;
use sluice_schemas::{IngestConfig, LoadConfig, RunnerConfig, TransformConfig, TransformScript};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// `orders.csv` with 3 columns and `rows` rows
pub fn orders_csv(rows: usize) -> String {
    let mut csv = String::from("order_id,customer_id,total\n");
    for i in 1..=rows {
        csv.push_str(&format!("o{i},c{},{}.50\n", (i % 5) + 1, i * 10));
    }
    csv
}

/// `customers.csv` with 2 columns and 5 rows
pub fn customers_csv() -> String {
    let mut csv = String::from("customer_id,city\n");
    for (i, city) in ["sao paulo", "rio de janeiro", "curitiba", "recife", "salvador"]
        .iter()
        .enumerate()
    {
        csv.push_str(&format!("c{},{city}\n", i + 1));
    }
    csv
}

/// A temporary source directory holding CSV files
pub struct SourceDir {
    dir: TempDir,
}

impl SourceDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Source directory with `orders.csv` (2 rows) and `customers.csv` (5 rows)
    pub fn olist() -> Self {
        let source = Self::new();
        source.write("orders.csv", &orders_csv(2));
        source.write("customers.csv", &customers_csv());
        source
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        path
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig::builder()
            .source_dir(self.path().to_path_buf())
            .build()
    }
}

/// A temporary directory of SQL scripts named `a.sql`, `b.sql`, ...
pub struct ScriptDir {
    dir: TempDir,
    scripts: Vec<TransformScript>,
}

impl ScriptDir {
    /// Write the scripts in order, assigning them to the silver, data quality and gold layers
    pub fn new(scripts: &[(&str, &str)]) -> Self {
        use sluice_schemas::Layer;

        let dir = TempDir::new().unwrap();
        let layers = [Layer::Silver, Layer::DataQuality, Layer::Gold];

        let scripts = scripts
            .iter()
            .enumerate()
            .map(|(i, (name, sql))| {
                fs::write(dir.path().join(name), sql).unwrap();
                TransformScript::new(layers[i % layers.len()], *name)
            })
            .collect();

        Self { dir, scripts }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn transform_config(&self) -> TransformConfig {
        TransformConfig::builder()
            .sql_dir(self.path().to_path_buf())
            .scripts(self.scripts.clone())
            .build()
    }
}

pub fn load_config() -> LoadConfig {
    LoadConfig::default()
}

/// Runner without retry delays
pub fn runner() -> TaskRunner {
    TaskRunner::new(
        &RunnerConfig::builder()
            .concurrency(4)
            .max_retries(1)
            .retry_delay_ms(1)
            .build(),
    )
}
