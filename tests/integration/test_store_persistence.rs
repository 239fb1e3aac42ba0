//! Reload behavior: slot bindings survive a restart, tombstones are never
//! reused, and disagreements between index and metadata are repaired.

use crate::common::{axis, dimension, open_store, test_paths};
use debate_search::VectorIndex;
use tempfile::TempDir;

#[test]
fn test_slots_survive_reload() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let debate = store.add_debate("cats", "feline things").unwrap();
    let images: Vec<_> = (0..4)
        .map(|i| {
            store
                .add_image_record(Some(debate), &format!("uploads/{i}.png"), &axis(i), "")
                .unwrap()
        })
        .collect();
    let slots: Vec<_> = images.iter().map(|id| store.slot_for(*id)).collect();
    assert!(slots.iter().all(Option::is_some));
    store.close().unwrap();

    let reopened = open_store(&dir);
    for (image, slot) in images.iter().zip(&slots) {
        assert_eq!(reopened.slot_for(*image), *slot, "slot changed for {image}");
    }

    let hits = reopened.search(&axis(2), 1).unwrap();
    assert_eq!(hits[0].image_id, images[2]);
    assert_eq!(hits[0].image_path, "uploads/2.png");
}

#[test]
fn test_tombstones_survive_reload_and_are_not_reused() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let doomed = store.add_debate("dogs", "").unwrap();
    store.add_image_record(Some(doomed), "dog.png", &axis(1), "").unwrap();
    let kept = store.add_debate("cats", "").unwrap();
    let cat = store.add_image_record(Some(kept), "cat.png", &axis(0), "").unwrap();
    let cat_slot = store.slot_for(cat);

    store.delete_debate(doomed).unwrap();
    store.close().unwrap();

    let reopened = open_store(&dir);
    let stats = reopened.stats().unwrap();
    assert_eq!(stats.vectors, 1);
    assert_eq!(stats.tombstones, 1);
    assert_eq!(reopened.slot_for(cat), cat_slot);

    let bird = reopened
        .add_image_record(Some(kept), "bird.png", &axis(3), "")
        .unwrap();
    let bird_slot = reopened.slot_for(bird).unwrap();
    assert_eq!(bird_slot.get(), 2, "tombstoned slot must not be reused");
}

#[test]
fn test_missing_snapshot_marks_images_vector_less() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "").unwrap();
    let image = store.add_image_record(Some(debate), "cat.png", &axis(0), "").unwrap();
    let paths = store.paths().clone();
    store.close().unwrap();

    std::fs::remove_file(&paths.index).unwrap();

    let reopened = open_store(&dir);
    assert!(!reopened.get_image(image).unwrap().has_vector);
    assert_eq!(reopened.slot_for(image), None);
    assert!(reopened.search(&axis(0), 5).unwrap().is_empty());
    assert_eq!(reopened.stats().unwrap().images, 1);
}

#[test]
fn test_surplus_slots_are_removed_on_open() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "").unwrap();
    let image = store.add_image_record(Some(debate), "cat.png", &axis(0), "").unwrap();
    store.close().unwrap();

    // A vector written without its row, as after a crash between the two
    let index_path = test_paths(&dir).index;
    let mut index = VectorIndex::open_or_create(&index_path, dimension()).unwrap();
    index.insert(&axis(1)).unwrap();
    index.save_to_disk(&index_path).unwrap();

    let reopened = open_store(&dir);
    let stats = reopened.stats().unwrap();
    assert_eq!(stats.vectors, 1);
    assert_eq!(stats.tombstones, 1);

    let hits = reopened.search(&axis(1), 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].image_id, image);

    // The repair was persisted
    let on_disk = VectorIndex::load_from_disk(&index_path).unwrap();
    assert_eq!(on_disk.live_count(), 1);
}

#[test]
fn test_dimension_change_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "").unwrap();
    store.add_image_record(Some(debate), "cat.png", &axis(0), "").unwrap();
    store.close().unwrap();

    let index_path = test_paths(&dir).index;
    let other = debate_search::VectorDimension::new(16).unwrap();
    assert!(VectorIndex::open_or_create(&index_path, other).is_err());
}
