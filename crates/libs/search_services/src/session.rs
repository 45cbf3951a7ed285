use crate::embedding::Embedding;
use crate::error::SearchError;
use crate::index::{IndexError, RankedCandidate, VectorIndex};
use crate::interfaces::{Paging, SearchItem};
use crate::retry::with_retries;
use crate::scope::{ScopeFilter, SearchFilters};
use crate::store::{MetadataStore, StoreError};
use app_state::SearchSettings;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
    /// Deepest retrievable rank per session (top-K cap).
    pub max_depth: usize,
    /// Candidates pulled from the index per extension round.
    pub fetch_batch: usize,
    /// Max soft-deleted ids skipped per page call while backfilling.
    pub max_backfill: usize,
    pub transient_retries: u32,
    pub retry_delay: Duration,
}

impl From<&SearchSettings> for SessionConfig {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            ttl: settings.session_ttl(),
            sweep_interval: settings.sweep_interval(),
            max_depth: settings.max_depth,
            fetch_batch: settings.fetch_batch.max(1),
            max_backfill: settings.max_backfill,
            transient_retries: settings.transient_retries,
            retry_delay: settings.retry_delay(),
        }
    }
}

/// One page served out of a session.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub items: Vec<SearchItem>,
    /// Best-effort estimate (`>=` items returned so far); exact once the
    /// index is drained.
    pub total: usize,
    /// Authoritative: whether unfetched candidates remain.
    pub has_more: bool,
}

/// Mutable session state. `ranked` and `delivered` are append-only once
/// computed; nothing ever reorders previously delivered items.
struct SessionState {
    /// Deduplicated ranked candidates, score-descending, ties by id.
    ranked: Vec<RankedCandidate>,
    /// Ids ever admitted into `ranked` (plus pre-seeded exclusions).
    seen: HashSet<String>,
    /// Raw index positions consumed so far; the `after_rank` cursor.
    scanned: usize,
    /// The index reported no candidates past `scanned`.
    index_exhausted: bool,
    /// Materialized items, in final delivery order. Pages are slices of
    /// this vector, which is what makes `get_page` idempotent.
    delivered: Vec<SearchItem>,
    /// How many of `ranked` have been materialized or dropped.
    consumed: usize,
}

impl SessionState {
    /// No further items can ever be delivered.
    fn drained(&self, config: &SessionConfig) -> bool {
        self.consumed >= self.ranked.len()
            && (self.index_exhausted || self.ranked.len() >= config.max_depth)
    }
}

/// Server-side state binding a query's embedding + scope snapshot to a
/// stable, incrementally-paginated ranked result list.
pub struct QuerySession {
    pub query_id: String,
    pub requester_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    embedding: Embedding,
    filter: ScopeFilter,
    filters: SearchFilters,
    /// Millis since epoch; refreshed on access.
    expires_at: AtomicI64,
    state: tokio::sync::RwLock<SessionState>,
    /// At most one ranked-list extension runs per session; reads of
    /// already-materialized ranges never take this lock.
    extend_lock: tokio::sync::Mutex<()>,
}

impl QuerySession {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() > self.expires_at.load(Ordering::Acquire)
    }

    fn touch(&self, ttl: Duration) {
        let deadline = Utc::now().timestamp_millis() + ttl.as_millis() as i64;
        self.expires_at.store(deadline, Ordering::Release);
    }
}

fn nice_id(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    (0..len)
        .map(|_| ALPHABET[fastrand::usize(..ALPHABET.len())] as char)
        .collect()
}

/// Owns the `query_id -> QuerySession` table and serves pagination
/// requests with the stability guarantees the clients depend on.
///
/// Session state is per-instance; in a multi-instance deployment, sessions
/// must be sticky-routed to the instance that created them.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<QuerySession>>>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn MetadataStore>,
    config: SessionConfig,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn MetadataStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            index,
            store,
            config,
        }
    }

    #[must_use]
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.read().expect("session table poisoned").len()
    }

    /// Allocate a new session. Nothing is fetched from the index until the
    /// first page is requested; the ranked list is a lazy, memoized,
    /// monotonically-growing sequence capped at `max_depth`.
    ///
    /// `exclude` pre-seeds deduplication; similar-by-id queries use it to
    /// suppress the source item.
    pub fn create_session(
        &self,
        embedding: Embedding,
        filter: ScopeFilter,
        requester_id: Option<i32>,
        exclude: HashSet<String>,
        filters: SearchFilters,
    ) -> Arc<QuerySession> {
        let query_id = format!("q_{}", nice_id(10));
        let session = Arc::new(QuerySession {
            query_id: query_id.clone(),
            requester_id,
            created_at: Utc::now(),
            embedding,
            filter,
            filters,
            expires_at: AtomicI64::new(0),
            state: tokio::sync::RwLock::new(SessionState {
                ranked: Vec::new(),
                seen: exclude,
                scanned: 0,
                index_exhausted: false,
                delivered: Vec::new(),
                consumed: 0,
            }),
            extend_lock: tokio::sync::Mutex::new(()),
        });
        session.touch(self.config.ttl);

        self.sessions
            .write()
            .expect("session table poisoned")
            .insert(query_id.clone(), session.clone());
        debug!("Created query session {}", query_id);
        session
    }

    fn lookup(
        &self,
        query_id: &str,
        requester_id: Option<i32>,
    ) -> Result<Arc<QuerySession>, SearchError> {
        let session = self
            .sessions
            .read()
            .expect("session table poisoned")
            .get(query_id)
            .cloned()
            .ok_or_else(|| SearchError::SessionExpired(query_id.to_string()))?;

        // A session is private to the identity that created it. Mismatches
        // get the same answer as unknown ids so nothing leaks.
        if session.requester_id != requester_id {
            return Err(SearchError::SessionExpired(query_id.to_string()));
        }
        if session.is_expired(Utc::now()) {
            self.sessions
                .write()
                .expect("session table poisoned")
                .remove(query_id);
            return Err(SearchError::SessionExpired(query_id.to_string()));
        }
        Ok(session)
    }

    /// Serve one page of a session, extending the ranked list on demand.
    ///
    /// Idempotent: repeated calls with the same arguments return identical
    /// pages, because ranking and materialization are computed once and
    /// cached, never recomputed from the live index.
    pub async fn page(
        &self,
        query_id: &str,
        requester_id: Option<i32>,
        paging: Paging,
    ) -> Result<PageResult, SearchError> {
        let session = self.lookup(query_id, requester_id)?;
        session.touch(self.config.ttl);

        let want = paging.page as usize * paging.page_size;
        self.fill(&session, want).await?;

        let state = session.state.read().await;
        let start = (paging.page as usize - 1) * paging.page_size;
        let end = want.min(state.delivered.len());
        let items = if start >= state.delivered.len() {
            Vec::new()
        } else {
            state.delivered[start..end].to_vec()
        };
        let pending_candidates = state.ranked.len() - state.consumed;
        let has_more = state.delivered.len() > want
            || pending_candidates > 0
            || !(state.index_exhausted || state.ranked.len() >= self.config.max_depth);
        let total = state.delivered.len() + pending_candidates;

        Ok(PageResult {
            items,
            total,
            has_more,
        })
    }

    /// Explicitly tear down a session.
    pub fn invalidate(&self, query_id: &str, requester_id: Option<i32>) -> Result<(), SearchError> {
        let session = self.lookup(query_id, requester_id)?;
        self.sessions
            .write()
            .expect("session table poisoned")
            .remove(&session.query_id);
        debug!("Invalidated query session {}", query_id);
        Ok(())
    }

    /// Extend `delivered` until it holds `want` items, the candidate stream
    /// drains, or this call's backfill budget runs out.
    ///
    /// Extension is all-or-nothing per round: session state is only written
    /// after the index and store calls succeed, so a timed-out call leaves
    /// no partial mutation behind.
    async fn fill(&self, session: &QuerySession, want: usize) -> Result<(), SearchError> {
        let mut dropped_budget = self.config.max_backfill;

        loop {
            {
                let state = session.state.read().await;
                if state.delivered.len() >= want || state.drained(&self.config) {
                    return Ok(());
                }
            }

            let _extend = session.extend_lock.lock().await;
            // Re-check: a concurrent call may have extended while we waited.
            let (mut scanned, mut exhausted, ranked_len, consumed, delivered_len, mut seen, tail) = {
                let state = session.state.read().await;
                if state.delivered.len() >= want || state.drained(&self.config) {
                    return Ok(());
                }
                (
                    state.scanned,
                    state.index_exhausted,
                    state.ranked.len(),
                    state.consumed,
                    state.delivered.len(),
                    state.seen.clone(),
                    state.ranked[state.consumed..].to_vec(),
                )
            };

            // Pull candidates until enough unconsumed ones are available.
            let mut pending: Vec<RankedCandidate> = Vec::new();
            let target_unconsumed = want - delivered_len;
            while tail.len() + pending.len() < target_unconsumed
                && !exhausted
                && ranked_len + pending.len() < self.config.max_depth
            {
                let batch_size = self
                    .config
                    .fetch_batch
                    .min(self.config.max_depth - (ranked_len + pending.len()));
                let mut batch = with_retries(
                    "vector index query",
                    self.config.transient_retries,
                    self.config.retry_delay,
                    IndexError::is_transient,
                    || {
                        self.index
                            .query(&session.embedding, &session.filter, scanned, batch_size)
                    },
                )
                .await?;

                scanned += batch.len();
                if batch.len() < batch_size {
                    exhausted = true;
                }
                // Candidates arrive score-descending, so the first one below
                // the minimum score ends the whole candidate stream.
                if let Some(threshold) = session.filters.threshold {
                    if let Some(cut) = batch.iter().position(|c| c.score < threshold) {
                        batch.truncate(cut);
                        exhausted = true;
                    }
                }
                for candidate in batch {
                    // The index may return duplicate ids (sharded ANN).
                    // Candidates arrive score-descending, so keeping the
                    // first occurrence keeps the highest score.
                    if seen.insert(candidate.media_id.clone()) {
                        pending.push(candidate);
                    }
                }
            }

            // Materialize the unconsumed candidates, skipping soft-deleted
            // ids up to the remaining backfill budget.
            let candidates: Vec<RankedCandidate> = tail
                .into_iter()
                .chain(pending.iter().cloned())
                .take(target_unconsumed + dropped_budget)
                .collect();
            let ids: Vec<String> = candidates.iter().map(|c| c.media_id.clone()).collect();
            let metas = with_retries(
                "metadata hydration",
                self.config.transient_retries,
                self.config.retry_delay,
                |e: &StoreError| matches!(e, StoreError::Unavailable(_)),
                || self.store.find_by_ids(&ids),
            )
            .await?;
            let mut by_id: HashMap<String, common_types::MediaMeta> =
                metas.into_iter().map(|m| (m.id.clone(), m)).collect();

            let mut new_items: Vec<SearchItem> = Vec::new();
            let mut consumed_now = 0usize;
            for candidate in &candidates {
                if new_items.len() + delivered_len >= want {
                    break;
                }
                consumed_now += 1;
                // A missing record is a soft-deleted item; a present record
                // can still be rejected by the session's tag or media-type
                // filter. Both consume backfill budget the same way.
                let meta = by_id
                    .remove(&candidate.media_id)
                    .filter(|meta| session.filters.matches_meta(meta));
                if let Some(meta) = meta {
                    new_items.push(SearchItem::from_meta(meta, candidate.score));
                } else {
                    debug!(
                        "Dropping item {} from session {}",
                        candidate.media_id, session.query_id
                    );
                    if dropped_budget == 0 {
                        break;
                    }
                    dropped_budget -= 1;
                }
            }

            let budget_exhausted = dropped_budget == 0;

            // Commit the whole round at once.
            {
                let mut state = session.state.write().await;
                for candidate in &pending {
                    state.seen.insert(candidate.media_id.clone());
                }
                state.ranked.extend(pending);
                state.scanned = scanned;
                state.index_exhausted = exhausted;
                state.consumed = consumed + consumed_now;
                state.delivered.extend(new_items);
            }

            if budget_exhausted {
                info!(
                    "Backfill budget exhausted for session {}; serving partial page",
                    session.query_id
                );
                return Ok(());
            }
        }
    }

    /// Remove expired sessions. An entry with outstanding references (an
    /// in-flight page call holds one) is skipped and reclaimed on a later
    /// sweep, so reclamation never races a reader.
    pub fn sweep(&self) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().expect("session table poisoned");
        let before = sessions.len();
        sessions.retain(|_, session| !(session.is_expired(now) && Arc::strong_count(session) == 1));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("Swept {} expired query sessions", removed);
        }
    }

    /// Spawn the background TTL sweep. Stops when the manager is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                manager.sweep();
            }
        })
    }
}
