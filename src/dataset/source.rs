//! Lazy sources
//!
//! A source stands in for a value that is expensive or derived. It runs when
//! a read reaches its slot, and may write to the dataset that owns it through
//! a [`SourceScope`], e.g. to replace itself with the computed value or to
//! fill in several related keys at once.

use std::sync::Arc;

use super::{delete_path, write_slot, Dataset, Lookup, Slot, Value, WriteMode};
use crate::error::DatasetResult;

/// Deferred computation of a value.
pub trait Source: Send + Sync {
    /// Produce the value for `key`. `None` means the source has nothing to
    /// offer, and the read continues as if the slot were empty.
    fn fetch(&self, key: &str, scope: &SourceScope<'_>) -> DatasetResult<Option<Value>>;
}

/// Adapter that turns a closure into a [`Source`].
pub struct FnSource<F> {
    f: F,
}

impl<F> FnSource<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Source for FnSource<F>
where
    F: Fn(&str, &SourceScope<'_>) -> DatasetResult<Option<Value>> + Send + Sync,
{
    fn fetch(&self, key: &str, scope: &SourceScope<'_>) -> DatasetResult<Option<Value>> {
        (self.f)(key, scope)
    }
}

/// Wrap a closure as a shareable source.
pub fn source_fn<F>(f: F) -> Arc<dyn Source>
where
    F: Fn(&str, &SourceScope<'_>) -> DatasetResult<Option<Value>> + Send + Sync + 'static,
{
    Arc::new(FnSource::new(f))
}

/// Handle on the dataset that owns a running source.
///
/// Writes take effect immediately, so later reads in the same lookup see
/// them. The handle only exists for the duration of one invocation.
pub struct SourceScope<'a> {
    owner: &'a Dataset,
}

impl<'a> SourceScope<'a> {
    pub(super) fn new(owner: &'a Dataset) -> Self {
        Self { owner }
    }

    /// Read access to the owning dataset.
    pub fn dataset(&self) -> &'a Dataset {
        self.owner
    }

    /// First value at `path` in the owning dataset, or `None` if absent.
    ///
    /// Reading the key this source is computing is an error.
    pub fn check(&self, path: &str) -> DatasetResult<Option<Value>> {
        self.owner.check(path)
    }

    pub fn get(&self, path: &str) -> DatasetResult<Value> {
        self.owner.get(path)
    }

    /// First stored string or dataset under the literal `key`, skipping
    /// sources. Lets a caching source notice that another reader already
    /// filled the slot.
    pub fn stored(&self, key: &str) -> Option<Value> {
        let entries = self.owner.entries.read_recursive();
        entries.get(key)?.iter().find_map(|slot| match slot {
            Slot::String(s) => Some(Value::String(s.clone())),
            Slot::Dataset(d) => Some(Value::Dataset(Arc::clone(d))),
            Slot::Source(_) => None,
        })
    }

    pub fn set(&self, path: &str, value: impl Into<Value>) -> DatasetResult<()> {
        let mut entries = self.owner.entries.write();
        write_slot(&mut entries, path, Slot::from(value.into()), WriteMode::Replace)
    }

    pub fn add(&self, path: &str, value: impl Into<Value>) -> DatasetResult<()> {
        let mut entries = self.owner.entries.write();
        write_slot(&mut entries, path, Slot::from(value.into()), WriteMode::Append)
    }

    pub fn set_source(&self, path: &str, source: Arc<dyn Source>) -> DatasetResult<()> {
        let mut entries = self.owner.entries.write();
        write_slot(&mut entries, path, Slot::Source(source), WriteMode::Replace)
    }

    pub fn delete(&self, path: &str) -> DatasetResult<bool> {
        let mut entries = self.owner.entries.write();
        delete_path(&mut entries, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Source for Upper {
        fn fetch(&self, key: &str, _scope: &SourceScope<'_>) -> DatasetResult<Option<Value>> {
            Ok(Some(Value::from(key.to_uppercase())))
        }
    }

    #[test]
    fn test_trait_object_source() {
        let mut ds = Dataset::new();
        ds.set_source("shout", Arc::new(Upper)).unwrap();
        assert_eq!(ds.get_string("shout").unwrap(), "SHOUT");
    }

    #[test]
    fn test_scope_writes_nested_paths() {
        let mut ds = Dataset::new();
        ds.set_source(
            "profile",
            source_fn(|key, scope| {
                let profile = Dataset::new()
                    .with("name", "Grace")
                    .with("langs", "COBOL");
                scope.set(key, profile)?;
                scope.add("profile.langs", "FLOW-MATIC")?;
                Ok(scope.stored(key))
            }),
        )
        .unwrap();

        // The source replaced itself with a dataset before returning it
        let profile = ds.get_dataset("profile").unwrap();
        assert_eq!(profile.get_string("name").unwrap(), "Grace");
        assert_eq!(
            ds.get_strings("profile.langs").unwrap(),
            vec!["COBOL", "FLOW-MATIC"]
        );
    }

    #[test]
    fn test_scope_delete_and_stored() {
        let mut ds = Dataset::new().with("stale", "x");
        ds.set_source(
            "refresh",
            source_fn(|_, scope| {
                assert!(scope.stored("stale").is_some());
                scope.delete("stale")?;
                assert!(scope.stored("stale").is_none());
                Ok(Some(Value::from("done")))
            }),
        )
        .unwrap();

        assert_eq!(ds.get_string("refresh").unwrap(), "done");
        assert!(!ds.contains_key("stale"));
    }

    #[test]
    fn test_scope_can_install_another_source() {
        let mut ds = Dataset::new();
        ds.set_source_fn("a", |_, scope| {
            scope.set_source("b", source_fn(|_, _| Ok(Some(Value::from("from b")))))?;
            Ok(Some(Value::from("from a")))
        })
        .unwrap();

        assert!(ds.check("b").unwrap().is_none());
        assert_eq!(ds.get_string("a").unwrap(), "from a");
        assert_eq!(ds.get_string("b").unwrap(), "from b");
    }
}
