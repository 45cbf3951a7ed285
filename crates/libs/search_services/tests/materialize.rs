mod helpers;

use helpers::{query_embedding, seed_corpus, test_settings};
use search_services::interfaces::Paging;
use search_services::scope::{ScopeFilter, SearchFilters};
use search_services::session::{SessionConfig, SessionManager};
use std::collections::HashSet;
use std::sync::Arc;

fn paging(page: u32, page_size: usize) -> Paging {
    Paging { page, page_size }
}

#[tokio::test]
async fn delivered_pages_keep_items_deleted_afterwards() {
    let (index, store) = seed_corpus(20);
    let manager = Arc::new(SessionManager::new(
        index,
        store.clone(),
        SessionConfig::from(&test_settings()),
    ));
    let session = manager.create_session(query_embedding(), ScopeFilter::Public, None, HashSet::new(), SearchFilters::default());

    let first = manager
        .page(&session.query_id, None, paging(1, 10))
        .await
        .expect("page 1");
    assert!(first.items.iter().any(|i| i.id == "m03"));

    // The item disappears from the store after the page was served.
    store.remove_media("m03");

    let again = manager
        .page(&session.query_id, None, paging(1, 10))
        .await
        .expect("page 1 again");
    assert_eq!(first.items, again.items, "served pages never change");
}

#[tokio::test]
async fn backfill_compensates_for_deleted_candidates() {
    let (index, store) = seed_corpus(30);
    // Soft-delete every other item before anything is materialized; the
    // index still returns them as candidates.
    for i in (1..=20).step_by(2) {
        store.remove_media(&format!("m{i:02}"));
    }
    let manager = Arc::new(SessionManager::new(
        index,
        store,
        SessionConfig::from(&test_settings()),
    ));
    let session = manager.create_session(query_embedding(), ScopeFilter::Public, None, HashSet::new(), SearchFilters::default());

    let page = manager
        .page(&session.query_id, None, paging(1, 10))
        .await
        .expect("page 1");

    // The page stays full, drawing on deeper-ranked survivors.
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].id, "m02");
    assert_eq!(page.items[9].id, "m20");
}

#[tokio::test]
async fn backfill_budget_bounds_page_work() {
    let (index, store) = seed_corpus(30);
    // More deletions in a row than the per-call budget compensates for.
    for i in 3..=10 {
        store.remove_media(&format!("m{i:02}"));
    }
    let mut settings = test_settings();
    settings.max_backfill = 5;
    let manager = Arc::new(SessionManager::new(
        index,
        store,
        SessionConfig::from(&settings),
    ));
    let session = manager.create_session(query_embedding(), ScopeFilter::Public, None, HashSet::new(), SearchFilters::default());

    let page = manager
        .page(&session.query_id, None, paging(1, 10))
        .await
        .expect("budget exhaustion is not an error");

    // Short page, but honest about more being available.
    let ids: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["m01", "m02"]);
    assert!(page.has_more);

    // A follow-up call gets a fresh budget and completes the page without
    // disturbing the already-delivered prefix.
    let retry = manager
        .page(&session.query_id, None, paging(1, 10))
        .await
        .expect("second attempt");
    assert_eq!(retry.items.len(), 10);
    assert_eq!(&retry.items[..2], &page.items[..]);
    assert_eq!(retry.items[2].id, "m11");
    assert_eq!(retry.items[9].id, "m18");
}

#[tokio::test]
async fn fully_deleted_corpus_drains_to_empty_pages() {
    let (index, store) = seed_corpus(8);
    for i in 1..=8 {
        store.remove_media(&format!("m{i:02}"));
    }
    let manager = Arc::new(SessionManager::new(
        index,
        store,
        SessionConfig::from(&test_settings()),
    ));
    let session = manager.create_session(query_embedding(), ScopeFilter::Public, None, HashSet::new(), SearchFilters::default());

    let page = manager
        .page(&session.query_id, None, paging(1, 10))
        .await
        .expect("page");
    assert!(page.items.is_empty());
    assert!(!page.has_more);
    assert_eq!(page.total, 0);
}
