//! Multi-valued key/value trees
//!
//! A [`Dataset`] is an ordered map from non-empty string keys to a non-empty
//! sequence of values. Each value is a string, a nested dataset, or a lazy
//! [`Source`] that computes the real value when read. Repeated values under
//! one key keep their insertion order, which drives iteration, encoding and
//! first-match reads.
//!
//! Nested datasets are held behind `Arc` and copied on write, so values handed
//! out by reads are cheap snapshots. A dataset may also carry a chain (a
//! fallback consulted on a miss) and a default source (consulted for keys
//! with no stored value). Neither is owned data: both are views.
//!
//! Mutation goes through `&mut self`. The one exception is a lazy source,
//! which receives a [`SourceScope`] that can write to its owning dataset for
//! the duration of the read. Source invocations on one dataset are serialized
//! by a re-entrant lock.

mod coerce;
mod compound;
pub(crate) mod convert;
mod lookup;
mod source;

pub use compound::CompoundDataset;
pub use lookup::{DesiredType, Lookup, Quantity, Query};
pub use source::{source_fn, FnSource, Source, SourceScope};

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, RwLock};
use tracing::{trace, warn};

use crate::error::{DatasetError, DatasetResult};

/// A value produced by a read.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Scalar string
    String(String),
    /// Nested dataset (shared snapshot)
    Dataset(Arc<Dataset>),
}

impl Value {
    /// Shape of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Dataset(_) => ValueKind::Dataset,
        }
    }

    /// Borrow the string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Dataset(_) => None,
        }
    }

    /// Borrow the dataset, if this is one
    pub fn as_dataset(&self) -> Option<&Arc<Dataset>> {
        match self {
            Self::Dataset(d) => Some(d),
            Self::String(_) => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Self::String(s) => Some(s),
            Self::Dataset(_) => None,
        }
    }

    pub fn into_dataset(self) -> Option<Arc<Dataset>> {
        match self {
            Self::Dataset(d) => Some(d),
            Self::String(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Dataset> for Value {
    fn from(value: Dataset) -> Self {
        Self::Dataset(Arc::new(value))
    }
}

impl From<Arc<Dataset>> for Value {
    fn from(value: Arc<Dataset>) -> Self {
        Self::Dataset(value)
    }
}

/// Shape of a stored value, used in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Dataset,
    Source,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Dataset => write!(f, "dataset"),
            Self::Source => write!(f, "lazy source"),
        }
    }
}

/// One stored position under a key.
#[derive(Clone)]
enum Slot {
    String(String),
    Dataset(Arc<Dataset>),
    Source(Arc<dyn Source>),
}

impl Slot {
    fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Dataset(_) => ValueKind::Dataset,
            Self::Source(_) => ValueKind::Source,
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            Value::Dataset(d) => Self::Dataset(d),
        }
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Dataset(a), Self::Dataset(b)) => a == b,
            (Self::Source(a), Self::Source(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => fmt::Debug::fmt(s, f),
            Self::Dataset(d) => fmt::Debug::fmt(d, f),
            Self::Source(_) => write!(f, "<source>"),
        }
    }
}

type Entries = IndexMap<String, Vec<Slot>>;

#[derive(Clone, Copy)]
enum WriteMode {
    Replace,
    Append,
}

/// Recursive, ordered, multi-valued key/value tree.
pub struct Dataset {
    entries: RwLock<Entries>,
    chain: Option<Arc<dyn Lookup>>,
    default_source: Option<Arc<dyn Source>>,
    /// Keys whose sources are running; the lock serializes invocations.
    active_sources: ReentrantMutex<RefCell<Vec<String>>>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            chain: None,
            default_source: None,
            active_sources: ReentrantMutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Builder form of appending `value` under the literal `key`.
    ///
    /// The key is not split on dots. An empty key cannot be addressed by
    /// any path, so the value is dropped with a warning; use [`Dataset::add`]
    /// to get an `InvalidPath` error instead.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key.is_empty() {
            warn!("dropping value built under an empty key");
        } else {
            self.push_value(key, value.into());
        }
        self
    }

    pub(crate) fn push_value(&mut self, key: String, value: Value) {
        self.entries
            .get_mut()
            .entry(key)
            .or_default()
            .push(Slot::from(value));
    }

    /// Replace every value at `path` with `value`, creating intermediate
    /// datasets as needed.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> DatasetResult<()> {
        write_slot(
            self.entries.get_mut(),
            path,
            Slot::from(value.into()),
            WriteMode::Replace,
        )
    }

    /// Append `value` after any existing values at `path`.
    pub fn add(&mut self, path: &str, value: impl Into<Value>) -> DatasetResult<()> {
        write_slot(
            self.entries.get_mut(),
            path,
            Slot::from(value.into()),
            WriteMode::Append,
        )
    }

    /// Replace every value at `path` with a lazy source.
    pub fn set_source(&mut self, path: &str, source: Arc<dyn Source>) -> DatasetResult<()> {
        write_slot(
            self.entries.get_mut(),
            path,
            Slot::Source(source),
            WriteMode::Replace,
        )
    }

    /// Append a lazy source after any existing values at `path`.
    pub fn add_source(&mut self, path: &str, source: Arc<dyn Source>) -> DatasetResult<()> {
        write_slot(
            self.entries.get_mut(),
            path,
            Slot::Source(source),
            WriteMode::Append,
        )
    }

    /// Closure form of [`Dataset::set_source`].
    pub fn set_source_fn<F>(&mut self, path: &str, f: F) -> DatasetResult<()>
    where
        F: Fn(&str, &SourceScope<'_>) -> DatasetResult<Option<Value>> + Send + Sync + 'static,
    {
        self.set_source(path, source_fn(f))
    }

    /// Remove `path` and all its values. Returns whether anything was removed.
    pub fn delete(&mut self, path: &str) -> DatasetResult<bool> {
        delete_path(self.entries.get_mut(), path)
    }

    /// Source consulted for any key with no stored value.
    pub fn set_default_source(&mut self, source: Arc<dyn Source>) {
        self.default_source = Some(source);
    }

    pub fn clear_default_source(&mut self) -> Option<Arc<dyn Source>> {
        self.default_source.take()
    }

    pub fn default_source(&self) -> Option<&Arc<dyn Source>> {
        self.default_source.as_ref()
    }

    /// Fallback consulted when a read finds nothing here.
    pub fn set_chain(&mut self, fallback: Arc<dyn Lookup>) {
        self.chain = Some(fallback);
    }

    pub fn clear_chain(&mut self) -> Option<Arc<dyn Lookup>> {
        self.chain.take()
    }

    pub fn chain(&self) -> Option<&Arc<dyn Lookup>> {
        self.chain.as_ref()
    }

    /// Top-level keys in insertion order (chain not included).
    pub fn keys(&self) -> Vec<String> {
        self.entries.read_recursive().keys().cloned().collect()
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.entries.read_recursive().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read_recursive().is_empty()
    }

    /// Whether `key` holds a stored value here (chain and default source not
    /// consulted, sources not invoked).
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read_recursive().contains_key(key)
    }

    /// Every value under the literal top-level `key`, with sources invoked.
    ///
    /// Unlike [`Lookup::get_all`], the chain is not consulted.
    pub fn values(&self, key: &str) -> DatasetResult<Vec<Value>> {
        let query = Query::key(key, DesiredType::Any, Quantity::All);
        let mut out = Vec::new();
        self.resolve_local(&query, 0, &mut out)?;
        Ok(out)
    }

    /// Materialized top-level entries in insertion order.
    ///
    /// Keys whose sources all produce nothing are omitted.
    pub fn entries(&self) -> DatasetResult<Vec<(String, Vec<Value>)>> {
        let mut entries = Vec::new();
        for key in self.keys() {
            let values = self.values(&key)?;
            if !values.is_empty() {
                entries.push((key, values));
            }
        }
        Ok(entries)
    }

    /// Remove every stored value. Chain and default source are kept.
    pub fn clear(&mut self) {
        self.entries.get_mut().clear();
    }

    /// Publish this dataset for shared read-only use.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn resolve_local(
        &self,
        query: &Query<'_>,
        depth: usize,
        out: &mut Vec<Value>,
    ) -> DatasetResult<()> {
        let key = query.segment(depth)?;
        let slots = self.entries.read_recursive().get(key).cloned();
        let mark = out.len();

        match slots {
            Some(slots) => {
                for slot in slots {
                    let value = match slot {
                        Slot::String(s) => Value::String(s),
                        Slot::Dataset(d) => Value::Dataset(d),
                        Slot::Source(source) => match self.invoke(source.as_ref(), key)? {
                            Some(value) => value,
                            None => continue,
                        },
                    };
                    query.visit(value, depth, out)?;
                    if query.satisfied(out, mark) {
                        break;
                    }
                }
            }
            None => {
                if let Some(source) = &self.default_source {
                    if let Some(value) = self.invoke(source.as_ref(), key)? {
                        query.visit(value, depth, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn invoke(&self, source: &dyn Source, key: &str) -> DatasetResult<Option<Value>> {
        let active = self.active_sources.lock();
        if active.borrow().iter().any(|k| k == key) {
            return Err(DatasetError::Internal(format!(
                "lazy source for \"{}\" requested its own value",
                key
            )));
        }
        active.borrow_mut().push(key.to_string());
        trace!(key, "invoking lazy source");
        let result = source.fetch(key, &SourceScope::new(self));
        active.borrow_mut().pop();
        result
    }
}

impl Lookup for Dataset {
    fn resolve(&self, query: &Query<'_>, depth: usize, out: &mut Vec<Value>) -> DatasetResult<()> {
        let mark = out.len();
        self.resolve_local(query, depth, out)?;
        if out.len() == mark {
            if let Some(chain) = &self.chain {
                chain.resolve(query, depth, out)?;
            }
        }
        Ok(())
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Dataset {
    fn clone(&self) -> Self {
        Self {
            entries: RwLock::new(self.entries.read_recursive().clone()),
            chain: self.chain.clone(),
            default_source: self.default_source.clone(),
            active_sources: ReentrantMutex::new(RefCell::new(Vec::new())),
        }
    }
}

/// Structural equality over stored entries: same keys, same per-key
/// sequences, same nesting. Chains and default sources are views and are not
/// compared; lazy sources compare by identity.
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        *self.entries.read_recursive() == *other.entries.read_recursive()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read_recursive();
        let mut map = f.debug_map();
        for (key, slots) in entries.iter() {
            match slots.as_slice() {
                [single] => map.entry(key, single),
                many => map.entry(key, &many),
            };
        }
        map.finish()
    }
}

fn write_slot(entries: &mut Entries, path: &str, slot: Slot, mode: WriteMode) -> DatasetResult<()> {
    let query = Query::new(path, DesiredType::Any, Quantity::First)?;
    with_parent(entries, path, query.segments(), true, |entries, key| match mode {
        WriteMode::Replace => {
            entries.insert(key.to_string(), vec![slot]);
        }
        WriteMode::Append => entries.entry(key.to_string()).or_default().push(slot),
    })?;
    Ok(())
}

fn delete_path(entries: &mut Entries, path: &str) -> DatasetResult<bool> {
    let query = Query::new(path, DesiredType::Any, Quantity::First)?;
    let removed = with_parent(entries, path, query.segments(), false, |entries, key| {
        entries.shift_remove(key).is_some()
    })?;
    Ok(removed.unwrap_or(false))
}

/// Walk to the entries that hold the last segment and run `op` there.
///
/// Intermediate segments descend into the first nested dataset stored under
/// that key. With `create`, missing intermediates become empty datasets;
/// without it, a missing intermediate yields `Ok(None)`.
fn with_parent<R>(
    entries: &mut Entries,
    path: &str,
    segments: &[&str],
    create: bool,
    op: impl FnOnce(&mut Entries, &str) -> R,
) -> DatasetResult<Option<R>> {
    let Some((first, rest)) = segments.split_first() else {
        return Err(DatasetError::Internal(format!(
            "write to \"{}\" has no segments",
            path
        )));
    };
    if rest.is_empty() {
        return Ok(Some(op(entries, first)));
    }

    if !entries.contains_key(*first) {
        if !create {
            return Ok(None);
        }
        entries.insert(
            first.to_string(),
            vec![Slot::Dataset(Arc::new(Dataset::new()))],
        );
    }
    let slots = entries.get_mut(*first).ok_or_else(|| {
        DatasetError::Internal(format!("entry \"{}\" vanished during write", first))
    })?;
    let found = slots.first().map_or(ValueKind::Dataset, Slot::kind);
    let child = slots.iter_mut().find_map(|slot| match slot {
        Slot::Dataset(child) => Some(child),
        _ => None,
    });
    let Some(child) = child else {
        return Err(DatasetError::WrongType {
            path: path.to_string(),
            expected: DesiredType::Dataset,
            found,
        });
    };

    let child = Arc::make_mut(child);
    with_parent(child.entries.get_mut(), path, rest, create, op)
}
