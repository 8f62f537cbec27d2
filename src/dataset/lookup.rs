//! Path resolution
//!
//! A path is a dot-separated list of keys; each segment descends one level.
//! Every read goes through [`Lookup::resolve`], which appends matches for a
//! [`Query`] to an output vector. `get`/`check` and their typed variants are
//! thin wrappers over that single primitive.
//!
//! Resolution is composable: a dataset consults its chain on a miss, and a
//! compound view consults its components in order. Both call `resolve` on
//! the next layer at the same depth, so a miss at one level continues with
//! that level's composition rule instead of a plain tree walk.

use std::fmt;
use std::sync::Arc;

use super::{coerce, Dataset, Value, ValueKind};
use crate::error::{DatasetError, DatasetResult};

/// Shape a caller expects at the end of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredType {
    /// A scalar string
    String,
    /// A nested dataset
    Dataset,
    /// Either shape
    Any,
}

impl DesiredType {
    /// Whether `value` has an acceptable shape.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Any, _) | (Self::String, Value::String(_)) | (Self::Dataset, Value::Dataset(_))
        )
    }
}

impl fmt::Display for DesiredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Dataset => write!(f, "dataset"),
            Self::Any => write!(f, "any value"),
        }
    }
}

/// How many matches a read collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Stop at the first match, in sequence order
    First,
    /// Collect every match, fanning out across repeated keys
    All,
}

/// A parsed path plus the shape and quantity wanted.
#[derive(Debug, Clone)]
pub struct Query<'p> {
    path: &'p str,
    segments: Vec<&'p str>,
    want: DesiredType,
    quantity: Quantity,
}

impl<'p> Query<'p> {
    /// Parse `path` into segments.
    ///
    /// Fails with `InvalidPath` if the path or any segment is empty.
    pub fn new(path: &'p str, want: DesiredType, quantity: Quantity) -> DatasetResult<Self> {
        if path.is_empty() {
            return Err(DatasetError::InvalidPath {
                path: path.to_string(),
                reason: "path is empty",
            });
        }
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(DatasetError::InvalidPath {
                path: path.to_string(),
                reason: "path contains an empty segment",
            });
        }
        Ok(Self {
            path,
            segments,
            want,
            quantity,
        })
    }

    /// A one-segment query for `key`, taken literally (dots are not split).
    pub(crate) fn key(key: &'p str, want: DesiredType, quantity: Quantity) -> Self {
        Self {
            path: key,
            segments: vec![key],
            want,
            quantity,
        }
    }

    /// The path as written by the caller
    pub fn path(&self) -> &'p str {
        self.path
    }

    /// Parsed path segments
    pub fn segments(&self) -> &[&'p str] {
        &self.segments
    }

    /// Requested shape
    pub fn want(&self) -> DesiredType {
        self.want
    }

    /// Requested quantity
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Segment to resolve at `depth`.
    ///
    /// Reaching past the last segment means a layer recursed incorrectly.
    pub(crate) fn segment(&self, depth: usize) -> DatasetResult<&'p str> {
        self.segments.get(depth).copied().ok_or_else(|| {
            DatasetError::Internal(format!(
                "lookup of \"{}\" reached depth {} past its last segment",
                self.path, depth
            ))
        })
    }

    pub(crate) fn is_last(&self, depth: usize) -> bool {
        depth + 1 == self.segments.len()
    }

    pub(crate) fn wrong_type(&self, found: ValueKind) -> DatasetError {
        DatasetError::WrongType {
            path: self.path.to_string(),
            expected: self.want,
            found,
        }
    }

    /// Deliver `value`, found for the segment at `depth`.
    ///
    /// At the final segment the value is type-checked and collected.
    /// Otherwise a dataset is descended into and a string is a dead end.
    pub(crate) fn visit(&self, value: Value, depth: usize, out: &mut Vec<Value>) -> DatasetResult<()> {
        if self.is_last(depth) {
            if !self.want.accepts(&value) {
                return Err(self.wrong_type(value.kind()));
            }
            out.push(value);
            return Ok(());
        }
        match value {
            Value::Dataset(child) => child.resolve(self, depth + 1, out),
            Value::String(_) => Ok(()),
        }
    }

    /// True once a FIRST query has collected something since `mark`.
    pub(crate) fn satisfied(&self, out: &[Value], mark: usize) -> bool {
        self.quantity == Quantity::First && out.len() > mark
    }
}

/// Read contract shared by datasets, compound views and anything layered on
/// top of them.
pub trait Lookup: fmt::Debug + Send + Sync {
    /// Append every match for `query`, starting at segment `depth`, to `out`.
    ///
    /// A FIRST query appends at most one value. Absence is not an error.
    fn resolve(&self, query: &Query<'_>, depth: usize, out: &mut Vec<Value>) -> DatasetResult<()>;

    /// Run a query from the top and return what it collected.
    fn lookup(&self, path: &str, want: DesiredType, quantity: Quantity) -> DatasetResult<Vec<Value>> {
        let query = Query::new(path, want, quantity)?;
        let mut out = Vec::new();
        self.resolve(&query, 0, &mut out)?;
        Ok(out)
    }

    /// First value at `path`, or `None` if absent.
    fn check(&self, path: &str) -> DatasetResult<Option<Value>> {
        Ok(self.lookup(path, DesiredType::Any, Quantity::First)?.into_iter().next())
    }

    /// First value at `path`; absence is an error.
    fn get(&self, path: &str) -> DatasetResult<Value> {
        self.check(path)?.ok_or_else(|| DatasetError::missing(path))
    }

    /// First string at `path`, or `None` if absent.
    fn check_string(&self, path: &str) -> DatasetResult<Option<String>> {
        Ok(self
            .lookup(path, DesiredType::String, Quantity::First)?
            .into_iter()
            .next()
            .and_then(Value::into_string))
    }

    /// First string at `path`; absence is an error.
    fn get_string(&self, path: &str) -> DatasetResult<String> {
        self.check_string(path)?.ok_or_else(|| DatasetError::missing(path))
    }

    /// First nested dataset at `path`, or `None` if absent.
    fn check_dataset(&self, path: &str) -> DatasetResult<Option<Arc<Dataset>>> {
        Ok(self
            .lookup(path, DesiredType::Dataset, Quantity::First)?
            .into_iter()
            .next()
            .and_then(Value::into_dataset))
    }

    /// First nested dataset at `path`; absence is an error.
    fn get_dataset(&self, path: &str) -> DatasetResult<Arc<Dataset>> {
        self.check_dataset(path)?.ok_or_else(|| DatasetError::missing(path))
    }

    /// Every value at `path`, in order. Empty if absent.
    fn get_all(&self, path: &str) -> DatasetResult<Vec<Value>> {
        self.lookup(path, DesiredType::Any, Quantity::All)
    }

    /// Every string at `path`, in order.
    fn get_strings(&self, path: &str) -> DatasetResult<Vec<String>> {
        Ok(self
            .lookup(path, DesiredType::String, Quantity::All)?
            .into_iter()
            .filter_map(Value::into_string)
            .collect())
    }

    /// Every nested dataset at `path`, in order.
    fn get_datasets(&self, path: &str) -> DatasetResult<Vec<Arc<Dataset>>> {
        Ok(self
            .lookup(path, DesiredType::Dataset, Quantity::All)?
            .into_iter()
            .filter_map(Value::into_dataset)
            .collect())
    }

    /// Whether anything exists at `path`.
    fn contains(&self, path: &str) -> DatasetResult<bool> {
        Ok(self.check(path)?.is_some())
    }

    /// String at `path` parsed as a signed integer, or `None` if absent.
    fn check_integer(&self, path: &str) -> DatasetResult<Option<i64>> {
        self.check_string(path)?
            .map(|s| coerce::integer(path, &s))
            .transpose()
    }

    /// String at `path` parsed as a signed integer.
    fn get_integer(&self, path: &str) -> DatasetResult<i64> {
        coerce::integer(path, &self.get_string(path)?)
    }

    /// String at `path` parsed as a float.
    fn get_float(&self, path: &str) -> DatasetResult<f64> {
        coerce::float(path, &self.get_string(path)?)
    }

    /// String at `path` parsed as a boolean, or `None` if absent.
    fn check_bool(&self, path: &str) -> DatasetResult<Option<bool>> {
        self.check_string(path)?
            .map(|s| coerce::boolean(path, &s))
            .transpose()
    }

    /// String at `path` parsed as a boolean.
    fn get_bool(&self, path: &str) -> DatasetResult<bool> {
        coerce::boolean(path, &self.get_string(path)?)
    }
}

impl<T: Lookup + ?Sized> Lookup for Arc<T> {
    fn resolve(&self, query: &Query<'_>, depth: usize, out: &mut Vec<Value>) -> DatasetResult<()> {
        (**self).resolve(query, depth, out)
    }
}
