//! Compound views
//!
//! A [`CompoundDataset`] overlays several independent datasets without
//! copying them. Reads consult the components left to right: a FIRST read
//! returns the first component's match, an ALL read collects matches from
//! every component in order.
//!
//! The view is read-only. It has no mutators at all; writes go to the
//! component datasets themselves before they are shared into the view.
//! Component slots may be empty and rebound later, e.g. a "current row" slot
//! that is filled in for each record while iterating a result list.

use std::sync::Arc;

use super::{Lookup, Query, Value};
use crate::error::{DatasetError, DatasetResult};

/// Ordered, read-only overlay of component datasets.
#[derive(Debug, Clone)]
pub struct CompoundDataset {
    components: Vec<Option<Arc<dyn Lookup>>>,
}

impl CompoundDataset {
    /// Create a view over `components`, any of which may be empty.
    ///
    /// At least one slot is required.
    pub fn new(components: Vec<Option<Arc<dyn Lookup>>>) -> DatasetResult<Self> {
        if components.is_empty() {
            return Err(DatasetError::Internal(
                "a compound dataset needs at least one component slot".to_string(),
            ));
        }
        Ok(Self { components })
    }

    /// Create a view over filled components.
    pub fn of(components: impl IntoIterator<Item = Arc<dyn Lookup>>) -> DatasetResult<Self> {
        Self::new(components.into_iter().map(Some).collect())
    }

    /// Number of component slots, filled or not
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, index: usize) -> Option<&Arc<dyn Lookup>> {
        self.components.get(index).and_then(Option::as_ref)
    }

    /// Bind (or clear) the slot at `index`, returning what it held.
    pub fn set_component(
        &mut self,
        index: usize,
        component: Option<Arc<dyn Lookup>>,
    ) -> DatasetResult<Option<Arc<dyn Lookup>>> {
        let len = self.components.len();
        let slot = self.components.get_mut(index).ok_or_else(|| {
            DatasetError::Internal(format!(
                "component index {} out of range for compound of {}",
                index, len
            ))
        })?;
        Ok(std::mem::replace(slot, component))
    }

    /// Append a component with the lowest precedence.
    pub fn push(&mut self, component: Arc<dyn Lookup>) {
        self.components.push(Some(component));
    }
}

impl Lookup for CompoundDataset {
    fn resolve(&self, query: &Query<'_>, depth: usize, out: &mut Vec<Value>) -> DatasetResult<()> {
        let mark = out.len();
        for component in self.components.iter().flatten() {
            component.resolve(query, depth, out)?;
            if query.satisfied(out, mark) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    fn layer(pairs: &[(&str, &str)]) -> Arc<dyn Lookup> {
        let mut ds = Dataset::new();
        for (k, v) in pairs {
            ds.add(k, *v).unwrap();
        }
        Arc::new(ds)
    }

    #[test]
    fn test_first_component_wins() {
        let a = layer(&[("k", "a"), ("only_a", "1")]);
        let b = layer(&[("k", "b"), ("only_b", "2")]);
        let view = CompoundDataset::of([a.clone(), b.clone()]).unwrap();

        assert_eq!(view.get_string("k").unwrap(), a.get_string("k").unwrap());
        assert_eq!(view.get_string("only_b").unwrap(), b.get_string("only_b").unwrap());
        assert_eq!(view.get_string("only_a").unwrap(), "1");
        assert!(view.get("neither").unwrap_err().is_missing());
    }

    #[test]
    fn test_all_collects_across_components() {
        let a = layer(&[("k", "a1"), ("k", "a2")]);
        let b = layer(&[("k", "b1")]);
        let view = CompoundDataset::of([a, b]).unwrap();
        assert_eq!(view.get_strings("k").unwrap(), vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn test_full_path_is_tried_per_component() {
        let mut a = Dataset::new();
        a.set("db.host", "primary").unwrap();
        let mut b = Dataset::new();
        b.set("db.port", "5432").unwrap();
        let view = CompoundDataset::of([
            Arc::new(a) as Arc<dyn Lookup>,
            Arc::new(b) as Arc<dyn Lookup>,
        ])
        .unwrap();

        assert_eq!(view.get_string("db.host").unwrap(), "primary");
        assert_eq!(view.get_string("db.port").unwrap(), "5432");
    }

    #[test]
    fn test_late_bound_row_slot() {
        let page = layer(&[("title", "Users"), ("id", "page")]);
        let mut view = CompoundDataset::new(vec![None, Some(page)]).unwrap();

        // Before binding, the page answers
        assert_eq!(view.get_string("id").unwrap(), "page");

        let rows = [layer(&[("id", "1")]), layer(&[("id", "2")])];
        let mut seen = Vec::new();
        for row in &rows {
            view.set_component(0, Some(Arc::clone(row))).unwrap();
            seen.push((view.get_string("id").unwrap(), view.get_string("title").unwrap()));
        }
        assert_eq!(
            seen,
            vec![
                ("1".to_string(), "Users".to_string()),
                ("2".to_string(), "Users".to_string())
            ]
        );

        let previous = view.set_component(0, None).unwrap();
        assert!(previous.is_some());
        assert!(view.component(0).is_none());
    }

    #[test]
    fn test_set_component_out_of_range() {
        let mut view = CompoundDataset::of([layer(&[])]).unwrap();
        assert!(matches!(
            view.set_component(3, None),
            Err(DatasetError::Internal(_))
        ));
    }

    #[test]
    fn test_requires_a_slot() {
        assert!(CompoundDataset::new(Vec::new()).is_err());
    }

    #[test]
    fn test_compound_as_chain_target() {
        let defaults = layer(&[("color", "blue"), ("size", "m")]);
        let site = layer(&[("size", "l")]);
        let overlay = CompoundDataset::of([site, defaults]).unwrap();

        let mut user = Dataset::new().with("color", "red");
        user.set_chain(Arc::new(overlay));

        assert_eq!(user.get_string("color").unwrap(), "red");
        assert_eq!(user.get_string("size").unwrap(), "l");
    }

    #[test]
    fn test_nested_compound() {
        let inner = CompoundDataset::of([layer(&[("x", "inner")])]).unwrap();
        let mut outer = CompoundDataset::new(vec![None]).unwrap();
        outer.push(Arc::new(inner));
        assert_eq!(outer.len(), 2);
        assert_eq!(outer.get_string("x").unwrap(), "inner");
    }
}
