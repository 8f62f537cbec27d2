//! Configuration cache over a search path of directories

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use fiz_dataset::{ConfigCache, ConfigError, ConfigFormat, Dataset, Lookup};
use tempfile::TempDir;

fn write(dir: &Path, file: &str, contents: &str) {
    fs::write(dir.join(file), contents).unwrap();
}

/// Three layers: user overrides, site settings, shipped defaults
fn search_path() -> (TempDir, TempDir, TempDir) {
    let user = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();
    let defaults = TempDir::new().unwrap();

    write(user.path(), "app.json", r#"{"theme": "dark"}"#);
    write(
        site.path(),
        "app.toml",
        "theme = \"light\"\n[db]\nhost = \"db.internal\"\n",
    );
    write(
        defaults.path(),
        "app.fiz",
        "(5.theme7.default2.db(4.host9.localhost4.port4.5432))",
    );
    write(defaults.path(), "other.toml", "only = \"defaults\"\n");
    (user, site, defaults)
}

#[test]
fn test_earlier_directories_take_precedence() {
    let (user, site, defaults) = search_path();
    let cache = ConfigCache::new([user.path(), site.path(), defaults.path()]);

    let app = cache.get("app").unwrap();
    assert_eq!(app.get_string("theme").unwrap(), "dark");
    assert_eq!(app.get_string("db.host").unwrap(), "db.internal");
    assert_eq!(app.get_integer("db.port").unwrap(), 5432);

    let formats: Vec<ConfigFormat> = cache
        .sources("app")
        .unwrap()
        .into_iter()
        .map(|s| s.format)
        .collect();
    assert_eq!(
        formats,
        vec![ConfigFormat::Json, ConfigFormat::Toml, ConfigFormat::Fiz]
    );

    let other = cache.get("other").unwrap();
    assert_eq!(other.get_string("only").unwrap(), "defaults");
    assert!(other.chain().is_none());
}

#[test]
fn test_published_tree_is_shared_until_cleared() {
    let (user, site, defaults) = search_path();
    let cache = ConfigCache::new([user.path(), site.path(), defaults.path()]);

    let first = cache.get("app").unwrap();
    write(user.path(), "app.json", r#"{"theme": "solarized"}"#);
    let second = cache.get("app").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.get_string("theme").unwrap(), "dark");
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
    let reloaded = cache.get("app").unwrap();
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert_eq!(reloaded.get_string("theme").unwrap(), "solarized");
    // Handed-out trees are unaffected by the reload
    assert_eq!(first.get_string("theme").unwrap(), "dark");
}

#[test]
fn test_set_search_path_clears() {
    let (user, site, defaults) = search_path();
    let cache = ConfigCache::new([user.path()]);
    assert_eq!(cache.get("app").unwrap().get_string("theme").unwrap(), "dark");
    assert!(cache.get("app").unwrap().check("db.host").unwrap().is_none());

    cache.set_search_path([site.path(), defaults.path()]);
    assert!(cache.is_empty());
    assert_eq!(cache.search_path(), vec![site.path(), defaults.path()]);
    assert_eq!(cache.get("app").unwrap().get_string("theme").unwrap(), "light");
}

#[test]
fn test_missing_and_broken_configurations() {
    let (user, site, defaults) = search_path();
    let cache = ConfigCache::new([user.path(), site.path(), defaults.path()]);
    assert!(matches!(cache.get("absent"), Err(ConfigError::NotFound(_))));
    assert!(cache.is_empty());

    write(site.path(), "broken.toml", "key = [unterminated\n");
    assert!(matches!(cache.get("broken"), Err(ConfigError::Parse { .. })));

    write(defaults.path(), "corrupt.fiz", "(5.theme");
    match cache.get("corrupt") {
        Err(ConfigError::Dataset { source, .. }) => assert!(source.is_syntax()),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_concurrent_gets_publish_one_tree() {
    let (user, site, defaults) = search_path();
    let cache = Arc::new(ConfigCache::new([
        user.path().to_path_buf(),
        site.path().to_path_buf(),
        defaults.path().to_path_buf(),
    ]));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get("app").unwrap())
        })
        .collect();
    let trees: Vec<Arc<Dataset>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(trees.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(cache.len(), 1);
}
