// src/io/loader.rs

use crate::error::LoadError;
use crate::model::batch::VaccineBatch;
use crate::model::point::Point;
use crate::model::warehouse::Warehouse;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// One warehouse entry of the import file.
#[derive(Debug, Deserialize)]
struct WarehouseRecord {
    name: String,
    x_coordinate: i32,
    y_coordinate: i32,
    #[serde(default, deserialize_with = "batch_entries")]
    vaccine_batches: Vec<Value>,
}

/// A missing `vaccine_batches` field defaults to empty. A present one
/// must be an array, `null` included.
fn batch_entries<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(entries) => Ok(entries),
        other => Err(de::Error::custom(format!(
            "vaccine_batches must be an array, found {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct BatchRecord {
    batch_size: u32,
    expiration_date: u32,
}

/// Reads warehouses and their initial stock from a JSON file.
pub fn load_warehouses(path: impl AsRef<Path>) -> Result<Vec<Warehouse>, LoadError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let warehouses = parse_warehouses(&contents)?;
    info!(
        path = %path.display(),
        warehouses = warehouses.len(),
        "warehouses loaded"
    );
    Ok(warehouses)
}

/// Parses the import format.
///
/// A `null` document is an empty list. Inside `vaccine_batches`, `null`
/// and non-object entries are skipped, but an object missing either
/// field is an error.
pub fn parse_warehouses(json: &str) -> Result<Vec<Warehouse>, LoadError> {
    let records: Option<Vec<WarehouseRecord>> = serde_json::from_str(json)?;

    let mut warehouses = Vec::new();
    for (index, record) in records.unwrap_or_default().into_iter().enumerate() {
        let mut warehouse = Warehouse::new(
            record.name,
            Point::new(record.x_coordinate, record.y_coordinate),
        );

        for entry in record.vaccine_batches {
            if !entry.is_object() {
                continue;
            }
            let batch: BatchRecord =
                serde_json::from_value(entry).map_err(|err| LoadError::InvalidRecord {
                    index,
                    message: err.to_string(),
                })?;
            warehouse.register_batch(VaccineBatch::new(batch.batch_size, batch.expiration_date));
        }

        debug!(warehouse = %warehouse, stock = warehouse.available_quantity(), "warehouse parsed");
        warehouses.push(warehouse);
    }

    Ok(warehouses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::traits::Locatable;

    #[test]
    fn parses_warehouses_with_batches() {
        let json = r#"[
            {"name": "North", "x_coordinate": 10, "y_coordinate": -4,
             "vaccine_batches": [
                {"batch_size": 120, "expiration_date": 14},
                {"batch_size": 60, "expiration_date": 9}
             ]},
            {"name": "South", "x_coordinate": 0, "y_coordinate": 0}
        ]"#;

        let warehouses = parse_warehouses(json).expect("valid document");

        assert_eq!(warehouses.len(), 2);
        assert_eq!(warehouses[0].name(), "North");
        assert_eq!(warehouses[0].location(), Point::new(10, -4));
        assert_eq!(warehouses[0].available_quantity(), 180);
        assert_eq!(warehouses[1].available_quantity(), 0);
        assert!(warehouses[0].id() < warehouses[1].id());
    }

    #[test]
    fn null_document_is_empty() {
        assert!(parse_warehouses("null").expect("null is allowed").is_empty());
    }

    #[test]
    fn skips_null_and_scalar_batch_entries() {
        let json = r#"[{"name": "A", "x_coordinate": 1, "y_coordinate": 1,
            "vaccine_batches": [null, 5, {"batch_size": 10, "expiration_date": 3}]}]"#;

        let warehouses = parse_warehouses(json).expect("valid document");
        assert_eq!(warehouses[0].available_quantity(), 10);
    }

    #[test]
    fn missing_coordinate_is_rejected() {
        let json = r#"[{"name": "A", "x_coordinate": 1}]"#;
        assert!(matches!(parse_warehouses(json), Err(LoadError::Parse(_))));
    }

    #[test]
    fn non_array_batches_are_rejected() {
        let json = r#"[{"name": "A", "x_coordinate": 1, "y_coordinate": 2,
            "vaccine_batches": {"batch_size": 1}}]"#;
        assert!(matches!(parse_warehouses(json), Err(LoadError::Parse(_))));
    }

    #[test]
    fn null_batches_field_is_rejected() {
        let json = r#"[{"name": "A", "x_coordinate": 1, "y_coordinate": 2,
            "vaccine_batches": null}]"#;
        assert!(matches!(parse_warehouses(json), Err(LoadError::Parse(_))));
    }

    #[test]
    fn absent_batches_field_is_an_empty_warehouse() {
        let json = r#"[{"name": "A", "x_coordinate": 1, "y_coordinate": 2}]"#;
        let warehouses = parse_warehouses(json).expect("field is optional");
        assert_eq!(warehouses[0].available_quantity(), 0);
    }

    #[test]
    fn batch_missing_expiration_is_rejected() {
        let json = r#"[{"name": "A", "x_coordinate": 1, "y_coordinate": 2},
            {"name": "B", "x_coordinate": 1, "y_coordinate": 2,
             "vaccine_batches": [{"batch_size": 1}]}]"#;

        let err = parse_warehouses(json).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRecord { index: 1, .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_warehouses("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
