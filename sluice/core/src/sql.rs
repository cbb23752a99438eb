//! SQL script files.

use std::path::{Path, PathBuf};

/// Split a script into statements on `;`.
///
/// The split is purely syntactic: a `;` inside a string literal, a comment or a procedural
/// block also ends a statement. Scripts are expected to put exactly one statement before
/// each terminator.
pub fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

/// A SQL file split into the statements it runs, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScript {
    pub path: PathBuf,
    pub statements: Vec<String>,
}

impl SqlScript {
    pub fn new(path: impl Into<PathBuf>, sql: &str) -> Self {
        Self {
            path: path.into(),
            statements: split_statements(sql),
        }
    }

    /// Read and split a UTF-8 script file
    pub async fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let sql = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(path, &sql))
    }

    /// File name used to identify the script in logs and reports
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Statement by 1-based position
    pub fn statement(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.statements.get(i))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("SELECT 1;", vec!["SELECT 1"])]
    #[case("SELECT 1; SELECT 2", vec!["SELECT 1", "SELECT 2"])]
    #[case("  CREATE TABLE a (x INT);\n\n;  ;\nINSERT INTO a VALUES (1);\n", vec!["CREATE TABLE a (x INT)", "INSERT INTO a VALUES (1)"])]
    #[case("", vec![])]
    #[case(" ;\n; ", vec![])]
    fn splits_on_terminators(#[case] sql: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_statements(sql), expected);
    }

    #[test]
    fn semicolon_in_literal_splits_statement() {
        assert_eq!(
            split_statements("SELECT 'a;b'"),
            vec!["SELECT 'a", "b'"]
        );
    }

    #[test]
    fn statement_lookup_is_one_based() {
        let script = SqlScript::new("sql/olist_silver.sql", "SELECT 1; SELECT 2;");
        assert_eq!(script.name(), "olist_silver.sql");
        assert_eq!(script.statement(1), Some("SELECT 1"));
        assert_eq!(script.statement(2), Some("SELECT 2"));
        assert_eq!(script.statement(0), None);
        assert_eq!(script.statement(3), None);
    }

    #[tokio::test]
    async fn reads_script_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("olist_gold.sql");
        std::fs::write(&path, "CREATE TABLE g AS SELECT 1;\n").unwrap();

        let script = SqlScript::read(&path).await.unwrap();
        assert_eq!(script.statements, vec!["CREATE TABLE g AS SELECT 1"]);
        assert_eq!(script.path, path);
    }
}
