//! Debate ranking that fuses vector similarity with lexical matches.

use std::sync::Arc;

use crate::common::{
    FailingEmbedder, axis, keyword_vector, open_store, open_store_with, test_paths,
};
use debate_search::{HybridSearchEngine, ProvidedDescriber, QueryStrategy};
use tempfile::TempDir;

#[test]
fn test_cats_and_dogs() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let cats = store.add_debate("cats", "").unwrap();
    let e1 = keyword_vector("cat");
    let i1 = store.add_image_record(Some(cats), "cat.png", &e1, "").unwrap();
    let dogs = store.add_debate("dogs", "").unwrap();
    store
        .add_image_record(Some(dogs), "dog.png", &keyword_vector("dog"), "")
        .unwrap();

    let hits = store.search(&e1, 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].image_id, i1);

    let results = HybridSearchEngine::new(&store).search("cats", 0.0, false).unwrap();
    assert_eq!(results[0].id, cats);
    assert!(results[0].score >= 0.9);
    let dog_score = results
        .iter()
        .find(|result| result.id == dogs)
        .map_or(0.0, |result| result.score);
    assert!(results[0].score > dog_score);
}

#[test]
fn test_exact_title_scores_high_without_vectors() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let budget = store.add_debate("Budget Cuts", "").unwrap();
    store.add_debate("weather", "").unwrap();

    let results = HybridSearchEngine::new(&store)
        .search("budget cuts", 0.0, false)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, budget);
    assert!((results[0].score - 0.9).abs() < 1e-6);
}

#[test]
fn test_minimum_score_and_include_all() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let cats = store.add_debate("cats", "").unwrap();
    store.add_image_record(Some(cats), "cat.png", &axis(0), "").unwrap();
    let dogs = store.add_debate("dogs", "").unwrap();
    store.add_image_record(Some(dogs), "dog.png", &axis(1), "").unwrap();
    let weather = store.add_debate("weather", "").unwrap();

    let engine = HybridSearchEngine::new(&store);

    let relevant = engine.search("cats", 0.0, false).unwrap();
    let ids: Vec<_> = relevant.iter().map(|result| result.id).collect();
    assert_eq!(ids, vec![cats, dogs]);
    assert!(relevant.iter().all(|result| result.score > 0.0));
    // Orthogonal image: distance 1, similarity 1 / 2
    assert!((relevant[1].score - 0.5).abs() < 1e-6);

    let all = engine.search("cats", 0.0, true).unwrap();
    assert_eq!(all.len(), 3);
    let last = all.last().unwrap();
    assert_eq!(last.id, weather);
    assert_eq!(last.score, 0.0);

    // Strictly above the threshold
    let strict = engine.search("cats", 0.5, false).unwrap();
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0].id, cats);
}

#[test]
fn test_best_image_wins_per_debate() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mixed = store.add_debate("mixed bag", "").unwrap();
    store.add_image_record(Some(mixed), "far.png", &axis(5), "").unwrap();
    store.add_image_record(Some(mixed), "near.png", &axis(2), "").unwrap();

    let results = HybridSearchEngine::new(&store).search("fish", 0.0, false).unwrap();
    assert_eq!(results.len(), 1);
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert_eq!(results[0].image_path.as_deref(), Some("near.png"));
}

#[test]
fn test_partial_and_summary_matches() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let partial = store.add_debate("funding for schools", "").unwrap();
    let summary = store.add_debate("education", "school funding debate").unwrap();

    let results = HybridSearchEngine::new(&store)
        .search("school funding", 0.0, true)
        .unwrap();

    let score_of = |id| {
        results
            .iter()
            .find(|result| result.id == id)
            .map(|result| result.score)
            .unwrap()
    };
    // One of two query words among the title's words
    assert!((score_of(partial) - 0.25).abs() < 1e-6);
    assert!((score_of(summary) - 0.6).abs() < 1e-6);
    assert_eq!(results[0].id, summary);
}

#[test]
fn test_ties_keep_most_recent_first() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let older = store.add_debate("tax reform", "").unwrap();
    let newer = store.add_debate("tax reform now", "").unwrap();

    let results = HybridSearchEngine::new(&store)
        .search("tax reform", 0.0, false)
        .unwrap();
    let ids: Vec<_> = results.iter().map(|result| result.id).collect();
    assert_eq!(ids, vec![newer, older]);
    assert!(results.iter().all(|result| (result.score - 0.9).abs() < 1e-6));
}

#[test]
fn test_lexical_fallback_feeds_debate_scores() {
    let dir = TempDir::new().unwrap();
    let store = open_store_with(
        &dir,
        Arc::new(FailingEmbedder),
        Arc::new(ProvidedDescriber::new()),
    );

    let sofas = store.add_debate("cats on sofas", "").unwrap();
    store
        .add_image_record(Some(sofas), "sofa.png", &axis(0), "")
        .unwrap();
    store.add_debate("dogs", "").unwrap();

    let results = HybridSearchEngine::new(&store)
        .search_detailed("cats playing", 0.0, false)
        .unwrap();
    assert_eq!(results.strategy, QueryStrategy::Lexical);
    assert_eq!(results.debates.len(), 1);
    assert_eq!(results.debates[0].id, sofas);

    // Jaccard 1/4 gives distance 0.75, above the 0.25 title overlap
    let expected = 1.0 / 1.75;
    assert!((results.debates[0].score - expected).abs() < 1e-5);
}

#[test]
fn test_vector_k_limits_image_hits() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let near = store.add_debate("alpha", "").unwrap();
    store.add_image_record(Some(near), "a.png", &axis(3), "").unwrap();
    let far = store.add_debate("beta", "").unwrap();
    store.add_image_record(Some(far), "b.png", &axis(4), "").unwrap();

    let results = HybridSearchEngine::new(&store)
        .with_vector_k(1)
        .search("bird", 0.0, false)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, near);
}

#[test]
fn test_search_never_mutates_store() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let debate = store.add_debate("cats", "").unwrap();
    store.add_image_record(Some(debate), "cat.png", &axis(0), "").unwrap();
    let before = store.stats().unwrap();

    HybridSearchEngine::new(&store).search("cats", 0.0, true).unwrap();
    assert_eq!(store.stats().unwrap(), before);
}

#[test]
fn test_unreadable_image_row_falls_back_to_lexical_ranking() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    // Added before any debate exists, so it stays unlinked
    store
        .add_image_record(None, "stray.png", &keyword_vector("cat"), "")
        .unwrap();
    let cats = store.add_debate("cats", "").unwrap();

    let conn = rusqlite::Connection::open(test_paths(&dir).database).unwrap();
    conn.execute(
        "UPDATE image SET created_at = 'garbage' WHERE debate_id IS NULL",
        [],
    )
    .unwrap();
    drop(conn);

    assert!(store.search_by_text("cats", 5).is_err());

    let results = HybridSearchEngine::new(&store)
        .search_detailed("cats", 0.0, false)
        .unwrap();
    assert_eq!(results.strategy, QueryStrategy::Lexical);
    assert_eq!(results.debates.len(), 1);
    assert_eq!(results.debates[0].id, cats);
    assert!((results.debates[0].score - 0.9).abs() < 1e-6);
}
