mod helpers;

use common_types::{CollectionMeta, MediaType, Visibility};
use helpers::{StubEmbedder, embedding_at_rank, meta, seed_corpus, test_settings};
use search_services::error::SearchError;
use search_services::index::IndexedMedia;
use search_services::interfaces::{
    ImageSearchParams, PageParams, SimilarParams, TextSearchParams,
};
use search_services::scope::Scope;
use search_services::service::SearchContext;
use std::sync::Arc;

fn context(n: usize) -> SearchContext {
    let (index, store) = seed_corpus(n);
    SearchContext::new(Arc::new(StubEmbedder), index, store, test_settings())
}

fn text_params(query: &str, scope: Scope) -> TextSearchParams {
    TextSearchParams {
        query: query.to_string(),
        scope,
        collection_id: None,
        threshold: None,
        tags: None,
        content_type: None,
        page: None,
        page_size: None,
    }
}

#[tokio::test]
async fn text_search_serves_first_page_and_reentry() {
    let ctx = context(15);

    let results = ctx
        .search_text(None, text_params("sunset over water", Scope::Public))
        .await
        .expect("text search");

    assert_eq!(results.items.len(), 10);
    assert_eq!(results.items[0].id, "m01");
    assert!(results.has_more);
    assert!(results.query_id.starts_with("q_"));
    assert!(results.search_time_ms >= 0.0);

    let page2 = ctx
        .results_page(
            None,
            &results.query_id,
            PageParams {
                page: Some(2),
                page_size: None,
            },
        )
        .await
        .expect("page 2");
    assert_eq!(page2.items.len(), 5);
    assert_eq!(page2.query_id, results.query_id);
    assert!(!page2.has_more);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let ctx = context(5);
    let err = ctx
        .search_text(None, text_params("   ", Scope::Public))
        .await
        .expect_err("whitespace-only query must be rejected");
    assert!(matches!(err, SearchError::BadRequest(_)));
}

#[tokio::test]
async fn paging_bounds_are_enforced() {
    let ctx = context(5);

    let mut params = text_params("anything", Scope::Public);
    params.page = Some(0);
    let err = ctx.search_text(None, params).await.expect_err("page 0");
    assert!(matches!(err, SearchError::BadRequest(_)));

    let mut params = text_params("anything", Scope::Public);
    params.page_size = Some(1000);
    let err = ctx
        .search_text(None, params)
        .await
        .expect_err("oversized page");
    assert!(matches!(err, SearchError::BadRequest(_)));
}

#[tokio::test]
async fn anonymous_library_scope_requires_auth() {
    let ctx = context(5);
    let err = ctx
        .search_text(None, text_params("mine", Scope::Library))
        .await
        .expect_err("anonymous library search must fail");
    assert!(matches!(err, SearchError::AuthRequired));
}

#[tokio::test]
async fn image_search_rejects_empty_upload() {
    let ctx = context(5);
    let err = ctx
        .search_image(
            None,
            &[],
            ImageSearchParams {
                scope: Scope::Public,
                collection_id: None,
                threshold: None,
                tags: None,
                content_type: None,
                page: None,
                page_size: None,
            },
        )
        .await
        .expect_err("empty upload must be rejected");
    assert!(matches!(err, SearchError::BadRequest(_)));
}

#[tokio::test]
async fn image_search_opens_a_session() {
    let ctx = context(12);
    let results = ctx
        .search_image(
            None,
            b"\xff\xd8\xff\xe0 fake jpeg bytes",
            ImageSearchParams {
                scope: Scope::Public,
                collection_id: None,
                threshold: None,
                tags: None,
                content_type: None,
                page: None,
                page_size: Some(5),
            },
        )
        .await
        .expect("image search");
    assert_eq!(results.items.len(), 5);
    assert!(results.has_more);
}

#[tokio::test]
async fn similar_search_excludes_the_source_item() {
    let ctx = context(10);

    let results = ctx
        .search_similar(
            None,
            "m03",
            SimilarParams {
                scope: None,
                collection_id: None,
                threshold: None,
                tags: None,
                content_type: None,
                page: None,
                page_size: None,
            },
        )
        .await
        .expect("similar search");

    assert_eq!(results.items.len(), 9);
    assert!(results.items.iter().all(|i| i.id != "m03"));
    // Ranked against m03's own embedding, its closest neighbour leads.
    assert_eq!(results.items[0].id, "m04");
}

#[tokio::test]
async fn similar_search_unknown_id_is_not_found() {
    let ctx = context(5);
    let err = ctx
        .search_similar(
            None,
            "nope",
            SimilarParams {
                scope: None,
                collection_id: None,
                threshold: None,
                tags: None,
                content_type: None,
                page: None,
                page_size: None,
            },
        )
        .await
        .expect_err("unknown media id must 404");
    assert!(matches!(err, SearchError::NotFound(_)));
}

#[tokio::test]
async fn collection_scope_restricts_results_to_members() {
    let (index, store) = seed_corpus(10);
    store.insert_collection(CollectionMeta {
        id: "c1".into(),
        owner_id: 1,
        is_public: true,
        member_ids: vec!["m02".into(), "m05".into(), "m09".into()],
    });
    let ctx = SearchContext::new(Arc::new(StubEmbedder), index, store, test_settings());

    let mut params = text_params("beach", Scope::Collection);
    params.collection_id = Some("c1".into());
    let results = ctx.search_text(None, params).await.expect("search");

    let ids: Vec<&str> = results.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["m02", "m05", "m09"]);
    assert!(!results.has_more);
}

#[tokio::test]
async fn private_collection_is_forbidden_to_strangers() {
    let (index, store) = seed_corpus(4);
    store.insert_collection(CollectionMeta {
        id: "secret".into(),
        owner_id: 1,
        is_public: false,
        member_ids: vec!["m01".into()],
    });
    let ctx = SearchContext::new(Arc::new(StubEmbedder), index, store, test_settings());

    let mut params = text_params("peek", Scope::Collection);
    params.collection_id = Some("secret".into());
    let err = ctx
        .search_text(Some(2), params)
        .await
        .expect_err("stranger must be refused");
    assert!(matches!(err, SearchError::Forbidden(_)));
}

#[tokio::test]
async fn library_scope_only_returns_own_items() {
    let (index, store) = seed_corpus(6);
    // Someone else's private item, closer to the query than anything owned.
    index.upsert(IndexedMedia {
        id: "other".into(),
        embedding: embedding_at_rank(0),
        owner_id: Some(2),
        visibility: Visibility::Private,
    });
    store.insert_media(meta("other", Some(2), Visibility::Private));
    let ctx = SearchContext::new(Arc::new(StubEmbedder), index, store, test_settings());

    let results = ctx
        .search_text(Some(1), text_params("mine", Scope::Library))
        .await
        .expect("library search");

    assert_eq!(results.items.len(), 6);
    assert!(results.items.iter().all(|i| i.owner_id == Some(1)));
}

#[tokio::test]
async fn favorites_scope_uses_the_snapshot() {
    let (index, store) = seed_corpus(8);
    store.set_favorites(1, ["m04", "m07"]);
    let ctx = SearchContext::new(Arc::new(StubEmbedder), index, store.clone(), test_settings());

    let results = ctx
        .search_text(Some(1), text_params("favorites", Scope::Favorites))
        .await
        .expect("favorites search");
    let ids: Vec<&str> = results.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["m04", "m07"]);

    // Unfavoriting after the session opened does not change its pages.
    store.set_favorites(1, Vec::<String>::new());
    let again = ctx
        .results_page(
            Some(1),
            &results.query_id,
            PageParams {
                page: Some(1),
                page_size: None,
            },
        )
        .await
        .expect("re-entry");
    assert_eq!(results.items, again.items);
}

#[tokio::test]
async fn threshold_cuts_off_low_scoring_items() {
    let ctx = context(10);

    let mut params = text_params("close matches only", Scope::Public);
    params.threshold = Some(0.9);
    let results = ctx.search_text(None, params).await.expect("search");

    // Only m01 and m02 score above 0.9 against the stub query.
    let ids: Vec<&str> = results.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["m01", "m02"]);
    assert_eq!(results.total, 2);
    assert!(!results.has_more);
    assert!(results.items.iter().all(|i| i.similarity_score.unwrap() >= 0.9));
}

#[tokio::test]
async fn out_of_range_threshold_is_a_bad_request() {
    let ctx = context(5);

    let mut params = text_params("anything", Scope::Public);
    params.threshold = Some(1.5);
    let err = ctx
        .search_text(None, params)
        .await
        .expect_err("threshold above 1 must be rejected");
    assert!(matches!(err, SearchError::BadRequest(_)));
}

#[tokio::test]
async fn content_type_filter_excludes_other_media() {
    let (index, store) = seed_corpus(4);
    index.upsert(IndexedMedia {
        id: "vid".into(),
        embedding: embedding_at_rank(0),
        owner_id: Some(1),
        visibility: Visibility::Public,
    });
    let mut video = meta("vid", Some(1), Visibility::Public);
    video.media_type = MediaType::Video;
    store.insert_media(video);
    let ctx = SearchContext::new(Arc::new(StubEmbedder), index, store, test_settings());

    let mut params = text_params("clips", Scope::Public);
    params.content_type = Some(MediaType::Video);
    let results = ctx.search_text(None, params).await.expect("search");

    let ids: Vec<&str> = results.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["vid"]);
    assert!(!results.has_more);
}

#[tokio::test]
async fn tag_filter_matches_any_of_the_requested_tags() {
    let (index, store) = seed_corpus(6);
    let mut beach = meta("m02", Some(1), Visibility::Public);
    beach.tags = vec!["beach".into()];
    store.insert_media(beach);
    let ctx = SearchContext::new(Arc::new(StubEmbedder), index, store, test_settings());

    let mut params = text_params("by the sea", Scope::Public);
    params.tags = Some("beach,boat".into());
    let results = ctx.search_text(None, params).await.expect("search");

    let ids: Vec<&str> = results.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["m02"]);
}

#[tokio::test]
async fn invalidate_tears_the_session_down() {
    let ctx = context(5);
    let results = ctx
        .search_text(None, text_params("gone soon", Scope::Public))
        .await
        .expect("search");

    ctx.invalidate(None, &results.query_id).expect("invalidate");

    let err = ctx
        .results_page(
            None,
            &results.query_id,
            PageParams {
                page: Some(1),
                page_size: None,
            },
        )
        .await
        .expect_err("invalidated session must be gone");
    assert!(matches!(err, SearchError::SessionExpired(_)));
}
