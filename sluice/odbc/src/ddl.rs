//! SQL generation for tables derived from Arrow schemas.
//!
//! Column types target PostgreSQL. Identifiers are always double quoted so file derived
//! names containing upper case letters, dashes or dots survive unchanged.

use datafusion::arrow::datatypes::{DataType, Schema};

/// PostgreSQL column type for an Arrow data type, anything without a direct mapping is `TEXT`
pub fn column_type(data_type: &DataType) -> String {
    match data_type {
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Int8 | DataType::Int16 | DataType::UInt8 => "SMALLINT".to_string(),
        DataType::Int32 | DataType::UInt16 => "INTEGER".to_string(),
        DataType::Int64 | DataType::UInt32 => "BIGINT".to_string(),
        DataType::UInt64 => "NUMERIC(20, 0)".to_string(),
        DataType::Float16 | DataType::Float32 => "REAL".to_string(),
        DataType::Float64 => "DOUBLE PRECISION".to_string(),
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            format!("NUMERIC({precision}, {scale})")
        }
        DataType::Date32 | DataType::Date64 => "DATE".to_string(),
        DataType::Timestamp(_, None) => "TIMESTAMP".to_string(),
        DataType::Timestamp(_, Some(_)) => "TIMESTAMPTZ".to_string(),
        DataType::Time32(_) | DataType::Time64(_) => "TIME".to_string(),
        DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => {
            "BYTEA".to_string()
        }
        _ => "TEXT".to_string(),
    }
}

/// Double quote an identifier, embedded quotes are doubled
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table))
}

pub fn create_table(table: &str, schema: &Schema, if_not_exists: bool) -> String {
    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            format!(
                "{} {}",
                quote_identifier(field.name()),
                column_type(field.data_type())
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let if_not_exists = if if_not_exists { "IF NOT EXISTS " } else { "" };

    format!(
        "CREATE TABLE {if_not_exists}{} ({columns})",
        quote_identifier(table)
    )
}

/// Parameterized insert with one `?` placeholder per column
pub fn insert_into(table: &str, schema: &Schema) -> String {
    let columns = schema
        .fields()
        .iter()
        .map(|field| quote_identifier(field.name()))
        .collect::<Vec<_>>()
        .join(", ");

    let placeholders = vec!["?"; schema.fields().len()].join(", ");

    format!(
        "INSERT INTO {} ({columns}) VALUES ({placeholders})",
        quote_identifier(table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::datatypes::{Field, TimeUnit};
    use rstest::rstest;

    fn orders_schema() -> Schema {
        Schema::new(vec![
            Field::new("order_id", DataType::Utf8, true),
            Field::new("total", DataType::Float64, true),
            Field::new("purchased_at", DataType::Timestamp(TimeUnit::Second, None), true),
        ])
    }

    #[rstest]
    #[case(DataType::Int64, "BIGINT")]
    #[case(DataType::Int32, "INTEGER")]
    #[case(DataType::Int16, "SMALLINT")]
    #[case(DataType::Float64, "DOUBLE PRECISION")]
    #[case(DataType::Boolean, "BOOLEAN")]
    #[case(DataType::Utf8, "TEXT")]
    #[case(DataType::Date32, "DATE")]
    #[case(DataType::Timestamp(TimeUnit::Nanosecond, None), "TIMESTAMP")]
    #[case(DataType::Timestamp(TimeUnit::Second, Some("UTC".into())), "TIMESTAMPTZ")]
    #[case(DataType::Decimal128(10, 2), "NUMERIC(10, 2)")]
    #[case(DataType::Binary, "BYTEA")]
    #[case(DataType::Null, "TEXT")]
    fn maps_arrow_types(#[case] data_type: DataType, #[case] expected: &str) {
        assert_eq!(column_type(&data_type), expected);
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("orders"), "\"orders\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn create_table_statement() {
        assert_eq!(
            create_table("orders", &orders_schema(), false),
            "CREATE TABLE \"orders\" (\"order_id\" TEXT, \"total\" DOUBLE PRECISION, \"purchased_at\" TIMESTAMP)"
        );
        assert!(create_table("orders", &orders_schema(), true)
            .starts_with("CREATE TABLE IF NOT EXISTS \"orders\""));
    }

    #[test]
    fn drop_and_insert_statements() {
        assert_eq!(drop_table("orders"), "DROP TABLE IF EXISTS \"orders\"");
        assert_eq!(
            insert_into("orders", &orders_schema()),
            "INSERT INTO \"orders\" (\"order_id\", \"total\", \"purchased_at\") VALUES (?, ?, ?)"
        );
    }
}
