//! Configuration datasets
//!
//! Files are plain TOML, JSON or the canonical encoding, chosen by
//! extension. A [`ConfigCache`] resolves a name along a search path of
//! directories: every directory that has the file contributes one layer, and
//! the layers are chained so earlier directories override later ones.

mod cache;
mod load;

pub use cache::ConfigCache;
pub use load::{load_file, ConfigError, ConfigFormat, ConfigSource};
