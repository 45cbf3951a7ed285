use crate::embedding::{EmbedError, Embedding, EmbeddingProvider};
use crate::error::SearchError;
use crate::index::{IndexError, VectorIndex};
use crate::interfaces::{
    ImageSearchParams, PageParams, Paging, SearchResults, SimilarParams, TextSearchParams,
};
use crate::retry::with_retries;
use crate::scope::{Scope, ScopeFilter, SearchFilters, resolve_scope};
use crate::session::{PageResult, SessionConfig, SessionManager};
use crate::store::MetadataStore;
use app_state::SearchSettings;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Everything the search endpoints need, wired once at startup.
pub struct SearchContext {
    pub settings: SearchSettings,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn MetadataStore>,
    sessions: Arc<SessionManager>,
}

impl SearchContext {
    #[must_use]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn MetadataStore>,
        settings: SearchSettings,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            index,
            store.clone(),
            SessionConfig::from(&settings),
        ));
        Self {
            settings,
            embedder,
            store,
            sessions,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Start the background session TTL sweep.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        self.sessions.spawn_sweeper()
    }

    async fn embed_text(&self, query: &str) -> Result<Embedding, SearchError> {
        Ok(with_retries(
            "embed text",
            self.settings.transient_retries,
            self.settings.retry_delay(),
            EmbedError::is_transient,
            || self.embedder.embed_text(query),
        )
        .await?)
    }

    async fn embed_image(&self, bytes: &[u8]) -> Result<Embedding, SearchError> {
        Ok(with_retries(
            "embed image",
            self.settings.transient_retries,
            self.settings.retry_delay(),
            EmbedError::is_transient,
            || self.embedder.embed_image(bytes),
        )
        .await?)
    }

    async fn open_session(
        &self,
        embedding: Embedding,
        scope: Scope,
        collection_id: Option<&str>,
        requester_id: Option<i32>,
        exclude: HashSet<String>,
        filters: SearchFilters,
        paging: Paging,
        started: Instant,
    ) -> Result<SearchResults, SearchError> {
        let filter: ScopeFilter =
            resolve_scope(self.store.as_ref(), scope, collection_id, requester_id).await?;
        let session = self
            .sessions
            .create_session(embedding, filter, requester_id, exclude, filters);
        let page = self
            .sessions
            .page(&session.query_id, requester_id, paging)
            .await?;
        Ok(results(session.query_id.clone(), page, started))
    }

    /// Text query: embed, resolve scope, open a session, serve the first
    /// requested page.
    pub async fn search_text(
        &self,
        requester_id: Option<i32>,
        params: TextSearchParams,
    ) -> Result<SearchResults, SearchError> {
        let started = Instant::now();
        let query = params.query.trim();
        if query.is_empty() {
            return Err(SearchError::BadRequest("query must not be empty".into()));
        }
        let paging = Paging::resolve(params.page, params.page_size, &self.settings)?;
        let filters = SearchFilters::from_params(
            params.threshold,
            params.tags.as_deref(),
            params.content_type,
        )?;
        let embedding = self.embed_text(query).await?;
        info!("Text search ({} dims), scope {:?}", embedding.len(), params.scope);
        self.open_session(
            embedding,
            params.scope,
            params.collection_id.as_deref(),
            requester_id,
            HashSet::new(),
            filters,
            paging,
            started,
        )
        .await
    }

    /// Image query from uploaded bytes.
    pub async fn search_image(
        &self,
        requester_id: Option<i32>,
        bytes: &[u8],
        params: ImageSearchParams,
    ) -> Result<SearchResults, SearchError> {
        let started = Instant::now();
        if bytes.is_empty() {
            return Err(SearchError::BadRequest("empty file provided".into()));
        }
        let paging = Paging::resolve(params.page, params.page_size, &self.settings)?;
        let filters = SearchFilters::from_params(
            params.threshold,
            params.tags.as_deref(),
            params.content_type,
        )?;
        let embedding = self.embed_image(bytes).await?;
        info!("Image search ({} dims), scope {:?}", embedding.len(), params.scope);
        self.open_session(
            embedding,
            params.scope,
            params.collection_id.as_deref(),
            requester_id,
            HashSet::new(),
            filters,
            paging,
            started,
        )
        .await
    }

    /// Similar-by-id: the query embedding is the stored embedding of an
    /// existing item; the source item itself is excluded from results.
    pub async fn search_similar(
        &self,
        requester_id: Option<i32>,
        media_id: &str,
        params: SimilarParams,
    ) -> Result<SearchResults, SearchError> {
        let started = Instant::now();
        let paging = Paging::resolve(params.page, params.page_size, &self.settings)?;
        let filters = SearchFilters::from_params(
            params.threshold,
            params.tags.as_deref(),
            params.content_type,
        )?;
        let embedding = with_retries(
            "stored embedding lookup",
            self.settings.transient_retries,
            self.settings.retry_delay(),
            IndexError::is_transient,
            || self.sessions.index().stored_embedding(media_id),
        )
        .await?
        .ok_or_else(|| SearchError::NotFound(format!("media item {media_id}")))?;

        let mut exclude = HashSet::new();
        exclude.insert(media_id.to_string());
        self.open_session(
            embedding,
            params.scope.unwrap_or_default(),
            params.collection_id.as_deref(),
            requester_id,
            exclude,
            filters,
            paging,
            started,
        )
        .await
    }

    /// Re-enter an existing session for a further page.
    pub async fn results_page(
        &self,
        requester_id: Option<i32>,
        query_id: &str,
        params: PageParams,
    ) -> Result<SearchResults, SearchError> {
        let started = Instant::now();
        let paging = Paging::resolve(params.page, params.page_size, &self.settings)?;
        let page = self.sessions.page(query_id, requester_id, paging).await?;
        Ok(results(query_id.to_string(), page, started))
    }

    /// Explicitly invalidate a session.
    pub fn invalidate(
        &self,
        requester_id: Option<i32>,
        query_id: &str,
    ) -> Result<(), SearchError> {
        self.sessions.invalidate(query_id, requester_id)
    }
}

fn results(query_id: String, page: PageResult, started: Instant) -> SearchResults {
    SearchResults {
        query_id,
        items: page.items,
        total: page.total,
        has_more: page.has_more,
        search_time_ms: started.elapsed().as_secs_f64() * 1000.0,
    }
}
