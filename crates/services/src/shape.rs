//! Row-to-record shaping helpers.

use serde::de::DeserializeOwned;
use serde_json::Value;

use common::ServiceError;

/// Decode every row, failing on the first malformed one. Backend rows that
/// no longer match the typed record surface as `UNEXPECTED_ERROR` rather
/// than leaking serde internals to the caller.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, ServiceError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|_| ServiceError::Unexpected("backend returned a malformed row".into()))
        })
        .collect()
}

/// First row decoded, or not-found for the named entity.
pub fn decode_one<T: DeserializeOwned>(rows: Vec<Value>, entity: &str) -> Result<T, ServiceError> {
    let mut rows = rows;
    if rows.is_empty() {
        return Err(ServiceError::not_found(entity));
    }
    serde_json::from_value(rows.swap_remove(0))
        .map_err(|_| ServiceError::Unexpected("backend returned a malformed row".into()))
}

/// Sum a numeric column across rows; missing/null fields count as zero.
pub fn sum_field(rows: &[Value], field: &str) -> f64 {
    rows.iter().filter_map(|row| row.get(field).and_then(Value::as_f64)).sum()
}
