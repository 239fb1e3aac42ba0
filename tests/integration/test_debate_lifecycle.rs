//! Debates and their images from creation to deletion.

use std::sync::Arc;

use crate::common::{
    FailingDescriber, FailingEmbedder, KeywordEmbedder, axis, open_describing_store, open_store,
    open_store_with, test_paths, write_media,
};
use debate_search::{DebateId, ProvidedDescriber, Slot, StoreError};
use tempfile::TempDir;

#[test]
fn test_delete_removes_images_from_both_stores() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let doomed = store.add_debate("dogs", "").unwrap();
    let kept = store.add_debate("cats", "").unwrap();
    let dog_a = store.add_image_record(Some(doomed), "dogs/a.png", &axis(1), "").unwrap();
    let dog_b = store.add_image_record(Some(doomed), "dogs/b.png", &axis(2), "").unwrap();
    store.add_image_record(Some(kept), "cat.png", &axis(0), "").unwrap();

    let deletion = store.delete_debate(doomed).unwrap();
    assert_eq!(deletion.images, 2);
    assert_eq!(deletion.vectors, 2);

    assert!(matches!(
        store.get_debate(doomed),
        Err(StoreError::NotFound { entity: "Debate", .. })
    ));
    assert!(matches!(
        store.get_image(dog_a),
        Err(StoreError::NotFound { entity: "Image", .. })
    ));
    assert_eq!(store.slot_for(dog_a), None);
    assert_eq!(store.slot_for(dog_b), None);

    for query in [axis(1), axis(2), axis(0)] {
        let hits = store.search(&query, 10).unwrap();
        assert!(hits.iter().all(|hit| !hit.image_path.starts_with("dogs/")));
    }

    let stats = store.stats().unwrap();
    assert_eq!(stats.debates, 1);
    assert_eq!(stats.images, 1);
    assert_eq!(stats.vectors, 1);
}

#[test]
fn test_delete_unknown_debate_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "").unwrap();
    store.add_image_record(Some(debate), "cat.png", &axis(0), "").unwrap();

    let missing = DebateId::new(99).unwrap();
    assert!(matches!(
        store.delete_debate(missing),
        Err(StoreError::NotFound { .. })
    ));
    assert_eq!(store.stats().unwrap().vectors, 1);
}

#[test]
fn test_delete_removes_media_files() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "").unwrap();

    let stored = write_media(&store, "uploads/cat.png");
    store
        .add_image_record(Some(debate), "/src/uploads/cat.png", &axis(0), "")
        .unwrap();
    // A row whose file was never written
    store
        .add_image_record(Some(debate), "uploads/gone.png", &axis(1), "")
        .unwrap();

    let deletion = store.delete_debate(debate).unwrap();
    assert_eq!(deletion.images, 2);
    assert_eq!(deletion.files, 1);
    assert!(!stored.exists());
}

#[test]
fn test_missing_debate_id_attaches_to_latest() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.add_debate("first", "").unwrap();
    let latest = store.add_debate("second", "").unwrap();

    let unset = store.add_image_record(None, "a.png", &axis(0), "").unwrap();
    assert_eq!(store.get_image(unset).unwrap().debate_id, Some(latest));

    let unknown = store
        .add_image_record(DebateId::new(42), "b.png", &axis(1), "")
        .unwrap();
    assert_eq!(store.get_image(unknown).unwrap().debate_id, Some(latest));
}

#[test]
fn test_image_without_any_debate_is_kept() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let image = store.add_image_record(None, "a.png", &axis(0), "").unwrap();
    let stored = store.get_image(image).unwrap();
    assert_eq!(stored.debate_id, None);
    assert!(stored.has_vector);

    let hits = store.search(&axis(0), 1).unwrap();
    assert_eq!(hits[0].image_id, image);
    assert_eq!(hits[0].tldr, None);
}

#[test]
fn test_invalid_image_paths_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "").unwrap();

    for path in ["", "   ", "../etc/passwd", "uploads/../../x.png"] {
        assert!(
            matches!(
                store.add_image_record(Some(debate), path, &axis(0), ""),
                Err(StoreError::InvalidPath { .. })
            ),
            "{path:?} should be rejected"
        );
    }
    assert_eq!(store.stats().unwrap().images, 0);
}

#[test]
fn test_process_and_add_image_embeds_description() {
    let dir = TempDir::new().unwrap();
    let store = open_describing_store(&dir, "a cat on a sofa");
    let debate = store.add_debate("cats", "").unwrap();

    let image = store.process_and_add_image(Some(debate), "cat.png").unwrap();
    let stored = store.get_image(image).unwrap();
    assert!(stored.has_vector);
    assert_eq!(stored.ocr, "Tom");

    let hits = store.search(&axis(0), 1).unwrap();
    assert_eq!(hits[0].image_id, image);
    assert!((hits[0].score - 1.0).abs() < 1e-5);
}

#[test]
fn test_embedding_failure_keeps_image_without_vector() {
    let dir = TempDir::new().unwrap();
    let store = open_store_with(
        &dir,
        Arc::new(FailingEmbedder),
        Arc::new(ProvidedDescriber::with_image("a cat", vec!["Tom".into()])),
    );
    let debate = store.add_debate("cats", "").unwrap();

    let image = store.process_and_add_image(Some(debate), "cat.png").unwrap();
    let stored = store.get_image(image).unwrap();
    assert!(!stored.has_vector);
    assert_eq!(stored.ocr, "");
    assert_eq!(stored.debate_id, Some(debate));
    assert_eq!(store.slot_for(image), None);
    assert_eq!(store.stats().unwrap().vectors, 0);
}

#[test]
fn test_description_failure_keeps_image_without_vector() {
    let dir = TempDir::new().unwrap();
    let store = open_store_with(&dir, Arc::new(KeywordEmbedder), Arc::new(FailingDescriber));

    let image = store.process_and_add_image(None, "cat.png").unwrap();
    let stored = store.get_image(image).unwrap();
    assert!(!stored.has_vector);
    assert_eq!(stored.debate_id, None);
}

#[test]
fn test_vector_less_images_survive_reload() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "").unwrap();

    let vector_less = store.process_and_add_image(Some(debate), "plain.png").unwrap();
    let indexed = store.add_image_record(Some(debate), "cat.png", &axis(0), "").unwrap();
    let slot = store.slot_for(indexed);
    store.close().unwrap();

    let reopened = open_store(&dir);
    assert_eq!(reopened.slot_for(indexed), slot);
    assert_eq!(reopened.slot_for(vector_less), None);
    assert!(!reopened.get_image(vector_less).unwrap().has_vector);
}

#[test]
fn test_debate_detail_and_listing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let cats = store.add_debate("cats", "feline").unwrap();
    let first = store.add_image_record(Some(cats), "cat1.png", &axis(0), "").unwrap();
    let second = store.add_image_record(Some(cats), "cat2.png", &axis(3), "").unwrap();
    let dogs = store.add_debate("dogs", "canine").unwrap();

    let detail = store.debate_detail(cats).unwrap();
    assert_eq!(detail.debate.tldr, "cats");
    let ids: Vec<_> = detail.images.iter().map(|image| image.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(detail.latest_image.map(|image| image.id), Some(second));

    let listing = store.list_debates().unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].debate.id, dogs);
    assert_eq!(listing[0].image_path, None);
    assert_eq!(listing[1].debate.id, cats);
    assert_eq!(listing[1].image_path.as_deref(), Some("cat2.png"));

    store.update_debate(cats, "cats again", "").unwrap();
    let listing = store.list_debates().unwrap();
    assert_eq!(listing[0].debate.id, cats);
    assert_eq!(listing[0].debate.tldr, "cats again");
}

#[test]
fn test_update_unknown_debate_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    assert!(matches!(
        store.update_debate(DebateId::new(7).unwrap(), "x", ""),
        Err(StoreError::NotFound { entity: "Debate", id: 7 })
    ));
}

#[test]
fn test_failed_snapshot_write_keeps_debate() {
    let dir = TempDir::new().unwrap();
    let index_path = test_paths(&dir).index;
    let store = open_store(&dir);

    let first = store.add_debate("cats", "").unwrap();
    let doomed = store.add_debate("dogs", "").unwrap();
    let last = store.add_debate("fish", "").unwrap();
    store.add_image_record(Some(first), "cat.png", &axis(0), "").unwrap();
    let dog = store.add_image_record(Some(doomed), "dog.png", &axis(1), "").unwrap();
    let fish = store.add_image_record(Some(last), "fish.png", &axis(2), "").unwrap();
    let dog_slot = store.slot_for(dog).unwrap();

    // A non-empty directory at the index path makes the snapshot rename fail
    std::fs::remove_file(&index_path).unwrap();
    std::fs::create_dir_all(index_path.join("blocker")).unwrap();

    assert!(store.delete_debate(doomed).is_err());
    assert!(store.get_debate(doomed).is_ok());
    assert!(store.get_image(dog).is_ok());
    assert_eq!(store.slot_for(dog), Some(dog_slot));
    assert_eq!(store.search(&axis(1), 1).unwrap()[0].image_id, dog);

    std::fs::remove_dir_all(&index_path).unwrap();
    store.close().unwrap();

    // Rows and slots still pair up after a restart
    let store = open_store(&dir);
    assert_eq!(store.slot_for(dog), Some(dog_slot));
    assert_eq!(store.slot_for(fish), Some(Slot::new(2)));
    assert_eq!(store.search(&axis(1), 1).unwrap()[0].image_id, dog);
    assert_eq!(store.search(&axis(2), 1).unwrap()[0].image_id, fish);

    let deletion = store.delete_debate(doomed).unwrap();
    assert_eq!(deletion.images, 1);
    assert_eq!(deletion.vectors, 1);
    assert!(store.get_image(dog).is_err());
    assert_eq!(store.search(&axis(2), 1).unwrap()[0].image_id, fish);
}
