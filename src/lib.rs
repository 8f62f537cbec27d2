//! fiz-dataset - multi-valued key/value trees
//!
//! A [`Dataset`] is an ordered tree whose keys may repeat, read by dotted
//! paths with first-match or all-matches semantics. On top of the tree this
//! crate provides:
//!
//! - layered reads: chains ([`Dataset::set_chain`]) and read-only
//!   [`CompoundDataset`] overlays
//! - lazy values computed on read ([`Source`])
//! - a canonical, escape-free encoding ([`serialize`] / [`deserialize`])
//! - signed reminder tokens that carry a dataset through an untrusted client
//!   ([`Reminder`])
//! - typed multi-key sorting ([`DatasetSorter`])
//! - configuration loading along a search path ([`ConfigCache`])

pub mod codec;
pub mod config;
pub mod dataset;
pub mod error;
pub mod reminder;
pub mod sorter;

pub use codec::{deserialize, serialize, serialize_to_string};
pub use config::{ConfigCache, ConfigError, ConfigFormat, ConfigSource};
pub use dataset::{
    source_fn, CompoundDataset, Dataset, DesiredType, FnSource, Lookup, Quantity, Query, Source,
    SourceScope, Value, ValueKind,
};
pub use error::{DatasetError, DatasetResult};
pub use reminder::{
    build_token, validate_token, KeyProvider, Reminder, ReminderKey, ReminderSet, SessionKeys,
};
pub use sorter::{compare_integers, DatasetSorter, SortKey, SortKind, SortOrder};
