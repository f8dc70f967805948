//! Record types configured from `objects.toml`

use crate::common::*;
use std::sync::Arc;
use strata_objects::{Condition, ExecMode, InMemoryStore, ObjectStoreConfig, CONFIG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn config_file_drives_tokenizer_and_id_batches() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "id_batch_size = 1\ntransactional_saves = false\nfulltext_delimiter = \",\"\n",
    )
    .unwrap();

    let config = ObjectStoreConfig::from_file(&path).unwrap();
    assert_eq!(config.write_mode(), ExecMode::Pipeline);

    let store = Arc::new(InMemoryStore::new());
    let tracks = tracks_with(store.clone(), config);
    tracks
        .create(fields(&[("title", "Gouge Away,Live"), ("artist", "Pixies")]))
        .unwrap();

    // Comma-delimited: "gouge away" is a single token
    let hits = tracks
        .find(&Condition::new().is("search", "gouge away,live"))
        .unwrap();
    assert_eq!(raw_ids(&hits), vec![1]);
    assert!(tracks
        .find(&Condition::new().is("search", "gouge"))
        .unwrap()
        .is_empty());
}

#[test]
fn default_config_written_on_first_use() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    ObjectStoreConfig::write_default_if_missing(&path).unwrap();

    let config = ObjectStoreConfig::from_file(&path).unwrap();
    assert_eq!(config, ObjectStoreConfig::default());
    let users = users();
    assert_eq!(users.config(), &config);
}
