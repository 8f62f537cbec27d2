//! String projections for stored values.

use crate::error::{DatasetError, DatasetResult};

fn conversion(path: &str, value: &str, target: &'static str) -> DatasetError {
    DatasetError::Conversion {
        path: path.to_string(),
        value: value.to_string(),
        target,
    }
}

pub(crate) fn integer(path: &str, value: &str) -> DatasetResult<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| conversion(path, value, "an integer"))
}

pub(crate) fn float(path: &str, value: &str) -> DatasetResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| conversion(path, value, "a number"))
}

pub(crate) fn boolean(path: &str, value: &str) -> DatasetResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(conversion(path, value, "a boolean")),
    }
}
