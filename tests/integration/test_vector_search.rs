//! Image-level search by vector and by text.

use std::sync::Arc;

use crate::common::{
    FailingDescriber, FailingEmbedder, KeywordEmbedder, axis, keyword_vector, open_store,
    open_store_with,
};
use debate_search::{ProvidedDescriber, QueryStrategy, StoreError};
use tempfile::TempDir;

#[test]
fn test_search_is_bounded_and_sorted() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("mixed", "").unwrap();

    for i in 0..6 {
        let mut vector = axis(0);
        vector[1] = i as f32 * 0.5;
        store
            .add_image_record(Some(debate), &format!("{i}.png"), &vector, "")
            .unwrap();
    }

    for k in [0, 1, 3, 6, 10] {
        let hits = store.search(&axis(0), k).unwrap();
        assert_eq!(hits.len(), k.min(6));
        assert!(
            hits.windows(2).all(|pair| pair[0].score >= pair[1].score),
            "hits not sorted for k={k}"
        );
    }
}

#[test]
fn test_self_similarity() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("mixed", "").unwrap();

    let vectors = [vec![1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5], axis(4), axis(6)];
    let ids: Vec<_> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| {
            store
                .add_image_record(Some(debate), &format!("{i}.png"), v, "")
                .unwrap()
        })
        .collect();

    for (vector, id) in vectors.iter().zip(&ids) {
        let hits = store.search(vector, 3).unwrap();
        assert_eq!(hits[0].image_id, *id);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert!(hits[0].distance.abs() < 1e-5);
    }
}

#[test]
fn test_search_joins_debate_text() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "all about cats").unwrap();
    store
        .add_image_record(Some(debate), "cat.png", &axis(0), "Tom, Sofa")
        .unwrap();

    let hits = store.search(&axis(0), 1).unwrap();
    assert_eq!(hits[0].ocr, "Tom, Sofa");
    assert_eq!(hits[0].debate_id, Some(debate));
    assert_eq!(hits[0].tldr.as_deref(), Some("cats"));
    assert_eq!(hits[0].summary.as_deref(), Some("all about cats"));
}

#[test]
fn test_search_rejects_bad_query_vector() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    assert!(matches!(
        store.search(&[0.0; 8], 3),
        Err(StoreError::InvalidVector(_))
    ));
    assert!(matches!(
        store.search(&[1.0; 3], 3),
        Err(StoreError::InvalidVector(_))
    ));
}

#[test]
fn test_empty_store_returns_empty_results() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    assert!(store.search(&axis(0), 5).unwrap().is_empty());
    assert!(store.search_by_text("cats", 5).unwrap().hits.is_empty());
}

#[test]
fn test_text_search_embeds_raw_query() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let cats = store.add_debate("cats", "").unwrap();
    let dogs = store.add_debate("dogs", "").unwrap();
    let cat = store
        .add_image_record(Some(cats), "cat.png", &keyword_vector("cat"), "")
        .unwrap();
    store
        .add_image_record(Some(dogs), "dog.png", &keyword_vector("dog"), "")
        .unwrap();

    let results = store.search_by_text("cats", 1).unwrap();
    // The instruction normalizes to the same text, so the raw query is used
    assert_eq!(results.strategy, QueryStrategy::RawText);
    assert_eq!(results.hits.len(), 1);
    assert_eq!(results.hits[0].image_id, cat);
}

#[test]
fn test_text_search_uses_normalized_instruction() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "").unwrap();
    store
        .add_image_record(Some(debate), "cat.png", &keyword_vector("cat"), "")
        .unwrap();

    let results = store.search_by_text("  a   cat  ", 1).unwrap();
    assert_eq!(results.strategy, QueryStrategy::Instruction);
    assert_eq!(results.hits.len(), 1);
}

#[test]
fn test_raw_text_used_when_describer_fails() {
    let dir = TempDir::new().unwrap();
    let store = open_store_with(&dir, Arc::new(KeywordEmbedder), Arc::new(FailingDescriber));
    let debate = store.add_debate("cats", "").unwrap();
    store
        .add_image_record(Some(debate), "cat.png", &keyword_vector("cat"), "")
        .unwrap();

    let results = store.search_by_text("  a   cat  ", 1).unwrap();
    assert_eq!(results.strategy, QueryStrategy::RawText);
    assert_eq!(results.hits.len(), 1);
}

#[test]
fn test_lexical_fallback_when_embedding_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = open_store_with(
        &dir,
        Arc::new(FailingEmbedder),
        Arc::new(ProvidedDescriber::new()),
    );

    let cats = store.add_debate("cats on sofas", "").unwrap();
    let dogs = store.add_debate("dogs in parks", "").unwrap();
    let cat = store
        .add_image_record(Some(cats), "cat.png", &keyword_vector("cat"), "Tom")
        .unwrap();
    let dog = store
        .add_image_record(Some(dogs), "dog.png", &keyword_vector("dog"), "Rex")
        .unwrap();

    let results = store.search_by_text("cats sofas", 5).unwrap();
    assert_eq!(results.strategy, QueryStrategy::Lexical);
    assert_eq!(results.hits.len(), 1);
    assert_eq!(results.hits[0].image_id, cat);
    // {cats, sofas} against {cats, on, sofas, tom}: 2 / (2 + 4 - 2)
    assert!((results.hits[0].score - 0.5).abs() < 1e-6);
    assert!((results.hits[0].distance - 0.5).abs() < 1e-6);

    let results = store.search_by_text("rex", 5).unwrap();
    assert_eq!(results.hits.len(), 1);
    assert_eq!(results.hits[0].image_id, dog);

    assert!(store.search_by_text("zebra", 5).unwrap().hits.is_empty());
    assert_eq!(store.search_by_text("cats dogs", 1).unwrap().hits.len(), 1);
}

#[test]
fn test_lexical_fallback_skips_unlinked_images() {
    let dir = TempDir::new().unwrap();
    let store = open_store_with(
        &dir,
        Arc::new(FailingEmbedder),
        Arc::new(ProvidedDescriber::new()),
    );

    store
        .add_image_record(None, "orphan.png", &keyword_vector("cat"), "cats")
        .unwrap();
    assert!(store.search_by_text("cats", 5).unwrap().hits.is_empty());
}
