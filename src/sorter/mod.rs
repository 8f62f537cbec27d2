//! Typed multi-key ordering of datasets
//!
//! A [`DatasetSorter`] compares two datasets by a list of [`SortKey`]s in
//! priority order. Each key reads one string path from both sides. A key
//! that cannot decide (value missing on either side, unparseable number) is
//! skipped rather than treated as equal, and if no key decides the datasets
//! compare equal.

mod integer;

pub use integer::compare_integers;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::dataset::{DesiredType, Lookup, Quantity, Query};
use crate::error::{DatasetError, DatasetResult};

/// How values under a sort key are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKind {
    /// Byte-wise lexicographic
    #[default]
    String,
    /// Parsed as `f64`
    Float,
    /// Trailing digit run, compared digit by digit
    Integer,
}

impl FromStr for SortKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(Self::String),
            "float" | "number" => Ok(Self::Float),
            "integer" | "int" => Ok(Self::Integer),
            other => Err(format!("unknown sort type \"{}\"", other)),
        }
    }
}

impl fmt::Display for SortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Float => write!(f, "float"),
            Self::Integer => write!(f, "integer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Increasing,
    Decreasing,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "increasing" | "inc" | "asc" => Ok(Self::Increasing),
            "decreasing" | "dec" | "desc" => Ok(Self::Decreasing),
            other => Err(format!("unknown sort order \"{}\"", other)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increasing => write!(f, "increasing"),
            Self::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// One sort criterion: a path, how to compare it, and which direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub kind: SortKind,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(path: impl Into<String>, kind: SortKind, order: SortOrder) -> DatasetResult<Self> {
        let path = path.into();
        let problem = Query::new(&path, DesiredType::String, Quantity::First).err();
        if let Some(err) = problem {
            return Err(DatasetError::InvalidSortKey {
                spec: path,
                reason: err.to_string(),
            });
        }
        Ok(Self { path, kind, order })
    }

    /// Parse `path[:type[:order]]`, e.g. `price:float:desc`.
    ///
    /// Type defaults to string and order to increasing.
    pub fn parse(spec: &str) -> DatasetResult<Self> {
        let invalid = |reason: String| DatasetError::InvalidSortKey {
            spec: spec.to_string(),
            reason,
        };

        let mut parts = spec.split(':');
        let path = parts.next().unwrap_or_default().trim();
        let kind: SortKind = match parts.next() {
            Some(kind) => kind.trim().parse().map_err(invalid)?,
            None => SortKind::default(),
        };
        let order: SortOrder = match parts.next() {
            Some(order) => order.trim().parse().map_err(invalid)?,
            None => SortOrder::default(),
        };
        if parts.next().is_some() {
            return Err(invalid("expected path[:type[:order]]".to_string()));
        }
        Self::new(path, kind, order).map_err(|err| match err {
            DatasetError::InvalidSortKey { reason, .. } => invalid(reason),
            other => other,
        })
    }

    /// Compare this key's values in `a` and `b`; `None` if inconclusive.
    fn compare<L: Lookup + ?Sized>(&self, a: &L, b: &L) -> DatasetResult<Option<Ordering>> {
        let (Some(left), Some(right)) = (a.check_string(&self.path)?, b.check_string(&self.path)?)
        else {
            return Ok(None);
        };
        let ordering = match self.kind {
            SortKind::String => Some(left.cmp(&right)),
            SortKind::Float => match (left.trim().parse::<f64>(), right.trim().parse::<f64>()) {
                (Ok(l), Ok(r)) => l.partial_cmp(&r),
                _ => None,
            },
            SortKind::Integer => compare_integers(&left, &right),
        };
        Ok(ordering.map(|o| match self.order {
            SortOrder::Increasing => o,
            SortOrder::Decreasing => o.reverse(),
        }))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.kind, self.order)
    }
}

/// Orders datasets by a list of sort keys.
#[derive(Debug, Clone, Default)]
pub struct DatasetSorter {
    keys: Vec<SortKey>,
}

impl DatasetSorter {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    /// Build from `path[:type[:order]]` specs, highest priority first.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> DatasetResult<Self> {
        let keys = specs
            .iter()
            .map(|spec| SortKey::parse(spec.as_ref()))
            .collect::<DatasetResult<Vec<_>>>()?;
        Ok(Self::new(keys))
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compare, propagating lookup errors such as a nested dataset stored
    /// where a string was expected.
    pub fn try_compare<L: Lookup + ?Sized>(&self, a: &L, b: &L) -> DatasetResult<Ordering> {
        for key in &self.keys {
            if let Some(ordering) = key.compare(a, b)? {
                if ordering != Ordering::Equal {
                    return Ok(ordering);
                }
            }
        }
        Ok(Ordering::Equal)
    }

    /// Compare for use with generic sort routines. A key whose lookup
    /// fails is treated as inconclusive.
    pub fn compare<L: Lookup + ?Sized>(&self, a: &L, b: &L) -> Ordering {
        for key in &self.keys {
            match key.compare(a, b) {
                Ok(Some(Ordering::Equal)) | Ok(None) => {}
                Ok(Some(ordering)) => return ordering,
                Err(err) => trace!(key = %key, error = %err, "sort key skipped"),
            }
        }
        Ordering::Equal
    }

    /// Stable sort of `items`.
    pub fn sort<L: Lookup>(&self, items: &mut [L]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    fn row(id: &str, name: &str, price: &str) -> Dataset {
        Dataset::new()
            .with("id", id)
            .with("name", name)
            .with("price", price)
    }

    fn ids(rows: &[Dataset]) -> Vec<String> {
        rows.iter().map(|r| r.get_string("id").unwrap()).collect()
    }

    #[test]
    fn test_parse_sort_key() {
        assert_eq!(
            SortKey::parse("price").unwrap(),
            SortKey::new("price", SortKind::String, SortOrder::Increasing).unwrap()
        );
        let key = SortKey::parse("item.price:Float:desc").unwrap();
        assert_eq!(key.path, "item.price");
        assert_eq!(key.kind, SortKind::Float);
        assert_eq!(key.order, SortOrder::Decreasing);
        assert_eq!(key.to_string(), "item.price:float:decreasing");
        assert_eq!(SortKey::parse("n:int").unwrap().kind, SortKind::Integer);
    }

    #[test]
    fn test_parse_sort_key_errors() {
        for spec in ["", "a..b", "a:bogus", "a:string:sideways", "a:int:asc:extra"] {
            assert!(
                matches!(SortKey::parse(spec), Err(DatasetError::InvalidSortKey { .. })),
                "{spec}"
            );
        }
    }

    #[test]
    fn test_integer_key_sorts_numerically() {
        let mut rows = vec![
            row("item12", "b", "1"),
            row("item7", "a", "1"),
            row("item100", "c", "1"),
        ];
        DatasetSorter::parse(&["id:integer"]).unwrap().sort(&mut rows);
        assert_eq!(ids(&rows), vec!["item7", "item12", "item100"]);

        DatasetSorter::parse(&["id"]).unwrap().sort(&mut rows);
        assert_eq!(ids(&rows), vec!["item100", "item12", "item7"]);
    }

    #[test]
    fn test_multiple_keys_and_orders() {
        let mut rows = vec![
            row("1", "pear", "2.5"),
            row("2", "apple", "10"),
            row("3", "fig", "2.5"),
        ];
        DatasetSorter::parse(&["price:float:desc", "name"])
            .unwrap()
            .sort(&mut rows);
        assert_eq!(ids(&rows), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_inconclusive_key_falls_through() {
        let sorter = DatasetSorter::parse(&["rank:integer", "name"]).unwrap();
        let a = Dataset::new().with("rank", "none").with("name", "b");
        let b = Dataset::new().with("rank", "3").with("name", "a");
        assert_eq!(sorter.compare(&a, &b), Ordering::Greater);

        let missing = Dataset::new().with("name", "a");
        assert_eq!(sorter.compare(&a, &missing), Ordering::Greater);

        let bad_float = DatasetSorter::parse(&["x:float"]).unwrap();
        let c = Dataset::new().with("x", "abc");
        let d = Dataset::new().with("x", "1.5");
        assert_eq!(bad_float.compare(&c, &d), Ordering::Equal);
    }

    #[test]
    fn test_all_inconclusive_is_equal_and_sort_is_stable() {
        let sorter = DatasetSorter::parse(&["missing:integer"]).unwrap();
        let mut rows = vec![row("b", "", ""), row("a", "", ""), row("c", "", "")];
        sorter.sort(&mut rows);
        assert_eq!(ids(&rows), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_try_compare_reports_wrong_type() {
        let sorter = DatasetSorter::parse(&["child", "name"]).unwrap();
        let a = Dataset::new()
            .with("child", Dataset::new())
            .with("name", "a");
        let b = Dataset::new().with("child", "x").with("name", "b");
        assert!(matches!(
            sorter.try_compare(&a, &b),
            Err(DatasetError::WrongType { .. })
        ));
        assert_eq!(sorter.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_sorts_any_lookup() {
        use std::sync::Arc;
        let sorter = DatasetSorter::parse(&["n:int:desc"]).unwrap();
        let mut rows: Vec<Arc<Dataset>> = (1..=3)
            .map(|n| Arc::new(Dataset::new().with("n", n.to_string())))
            .collect();
        sorter.sort(&mut rows);
        let ns: Vec<i64> = rows.iter().map(|r| r.get_integer("n").unwrap()).collect();
        assert_eq!(ns, vec![3, 2, 1]);
    }
}
