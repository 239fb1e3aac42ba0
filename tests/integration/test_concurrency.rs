//! Many threads writing and searching one shared store.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crate::common::{DIM, axis, open_store};
use debate_search::{ImageId, Slot};
use tempfile::TempDir;

const THREADS: usize = 8;
const IMAGES_PER_THREAD: usize = 12;

#[test]
fn test_concurrent_adds_and_searches_stay_consistent() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir));
    let debate = store.add_debate("shared", "").unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut added = Vec::with_capacity(IMAGES_PER_THREAD);
                for n in 0..IMAGES_PER_THREAD {
                    let hot = (worker + n) % DIM;
                    let path = format!("w{worker}/{n}.png");
                    let id = store
                        .add_image_record(Some(debate), &path, &axis(hot), "")
                        .unwrap();
                    added.push((id, path));

                    // Every hit must resolve to a row that still exists
                    for hit in store.search(&axis(hot), 5).unwrap() {
                        let image = store.get_image(hit.image_id).unwrap();
                        assert_eq!(image.image_path, hit.image_path);
                    }
                }
                added
            })
        })
        .collect();

    let added: Vec<(ImageId, String)> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(added.len(), THREADS * IMAGES_PER_THREAD);

    let stats = store.stats().unwrap();
    assert_eq!(stats.images, added.len());
    assert_eq!(stats.vectors, added.len());

    let slots: Vec<(ImageId, Slot)> = added
        .iter()
        .map(|(id, _)| (*id, store.slot_for(*id).unwrap()))
        .collect();
    let distinct: HashSet<Slot> = slots.iter().map(|(_, slot)| *slot).collect();
    assert_eq!(distinct.len(), slots.len(), "Slots must not be shared");

    let store = Arc::try_unwrap(store).ok().unwrap();
    store.close().unwrap();

    // Bindings rebuilt from disk match the ones made under contention
    let store = open_store(&dir);
    for (id, slot) in &slots {
        assert_eq!(store.slot_for(*id), Some(*slot));
    }
    for (id, path) in &added {
        assert_eq!(&store.get_image(*id).unwrap().image_path, path);
    }
}
