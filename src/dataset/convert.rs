//! Conversion between datasets and TOML/JSON documents
//!
//! Tables and objects become nested datasets. Arrays become repeated values
//! under their key, so an array of tables is a sequence of child datasets.
//! Scalars are stored in their display form and `null` is dropped.

use serde_json::{Map, Value as Json};
use tracing::warn;

use super::{Dataset, Value};
use crate::config::ConfigError;
use crate::error::DatasetResult;

impl Dataset {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        parse_toml(text, "<string>")
    }

    /// Parse a JSON document whose top level is an object.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        parse_json(text, "<string>")
    }

    pub fn from_toml_table(table: toml::Table) -> Self {
        let mut ds = Dataset::new();
        for (key, value) in table {
            if key.is_empty() {
                warn!("skipping empty TOML key");
                continue;
            }
            push_toml(&mut ds, &key, value);
        }
        ds
    }

    pub fn from_json_object(object: Map<String, Json>) -> Self {
        let mut ds = Dataset::new();
        for (key, value) in object {
            if key.is_empty() {
                warn!("skipping empty JSON key");
                continue;
            }
            push_json(&mut ds, &key, value);
        }
        ds
    }

    /// Project the stored tree to JSON, invoking lazy sources.
    ///
    /// A key with one value maps to that value, a key with several maps to
    /// an array. Chains and default sources are not included.
    pub fn to_json_value(&self) -> DatasetResult<Json> {
        let mut object = Map::new();
        for (key, values) in self.entries()? {
            let mut items = values
                .into_iter()
                .map(|value| match value {
                    Value::String(s) => Ok(Json::String(s)),
                    Value::Dataset(child) => child.to_json_value(),
                })
                .collect::<DatasetResult<Vec<_>>>()?;
            let json = if items.len() == 1 {
                items.remove(0)
            } else {
                Json::Array(items)
            };
            object.insert(key, json);
        }
        Ok(Json::Object(object))
    }
}

pub(crate) fn parse_toml(text: &str, origin: &str) -> Result<Dataset, ConfigError> {
    let table: toml::Table = toml::from_str(text).map_err(|e| ConfigError::Parse {
        format: "TOML",
        origin: origin.to_string(),
        message: e.to_string(),
    })?;
    Ok(Dataset::from_toml_table(table))
}

pub(crate) fn parse_json(text: &str, origin: &str) -> Result<Dataset, ConfigError> {
    let parse_error = |message: String| ConfigError::Parse {
        format: "JSON",
        origin: origin.to_string(),
        message,
    };
    match serde_json::from_str::<Json>(text).map_err(|e| parse_error(e.to_string()))? {
        Json::Object(object) => Ok(Dataset::from_json_object(object)),
        other => Err(parse_error(format!(
            "top level must be an object, found {}",
            json_kind(&other)
        ))),
    }
}

fn push_toml(ds: &mut Dataset, key: &str, value: toml::Value) {
    let value = match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::String(i.to_string()),
        toml::Value::Float(f) => Value::String(f.to_string()),
        toml::Value::Boolean(b) => Value::String(b.to_string()),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            for item in items {
                push_toml(ds, key, item);
            }
            return;
        }
        toml::Value::Table(table) => Value::from(Dataset::from_toml_table(table)),
    };
    ds.push_value(key.to_string(), value);
}

fn push_json(ds: &mut Dataset, key: &str, value: Json) {
    let value = match value {
        Json::Null => return,
        Json::Bool(b) => Value::String(b.to_string()),
        Json::Number(n) => Value::String(n.to_string()),
        Json::String(s) => Value::String(s),
        Json::Array(items) => {
            for item in items {
                push_json(ds, key, item);
            }
            return;
        }
        Json::Object(object) => Value::from(Dataset::from_json_object(object)),
    };
    ds.push_value(key.to_string(), value);
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}
