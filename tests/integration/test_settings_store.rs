//! Opening a store from a settings file.

use std::sync::Arc;

use crate::common::{KeywordEmbedder, axis};
use debate_search::{ProvidedDescriber, Settings, StoreError, StorePaths, VectorStore};
use tempfile::TempDir;

fn write_settings(root: &std::path::Path, dimension: usize) -> std::path::PathBuf {
    let config_dir = root.join(".debate-search");
    std::fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("settings.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
data_dir = "store"
media_root = "uploads"

[store]
dimension = {dimension}
"#
        ),
    )
    .unwrap();
    config_path
}

#[test]
fn test_store_files_follow_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_settings(temp_dir.path(), 8);
    let settings = Settings::load_from(&config_path).unwrap();

    let store = VectorStore::open(
        &settings,
        Arc::new(KeywordEmbedder),
        Arc::new(ProvidedDescriber::new()),
    )
    .unwrap();
    let debate = store.add_debate("cats", "").unwrap();
    store.add_image_record(Some(debate), "cat.png", &axis(0), "").unwrap();

    let paths = StorePaths::from_settings(&settings);
    assert_eq!(paths.database, temp_dir.path().join("store/vectors.db"));
    assert_eq!(paths.index, temp_dir.path().join("store/vectors.vec"));
    assert_eq!(
        paths.media_file("cat.png"),
        temp_dir.path().join("uploads/cat.png")
    );
    assert!(paths.index.exists());
    store.close().unwrap();
    assert!(paths.database.exists());
}

#[test]
fn test_embedder_dimension_must_match_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_settings(temp_dir.path(), 16);
    let settings = Settings::load_from(&config_path).unwrap();

    let result = VectorStore::open(
        &settings,
        Arc::new(KeywordEmbedder),
        Arc::new(ProvidedDescriber::new()),
    );
    assert!(matches!(result, Err(StoreError::Config { .. })));
}
