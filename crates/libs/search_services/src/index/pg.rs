use crate::embedding::Embedding;
use crate::index::{IndexError, RankedCandidate, VectorIndex};
use crate::scope::ScopeFilter;
use async_trait::async_trait;
use common_types::SimilarityMetric;
use pgvector::Vector;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres};

/// pgvector-backed index adapter over the `media_index` table.
///
/// Ordering is done on the raw distance operator so the ANN index is used;
/// the id tie-break keeps repeated queries reproducible, which the session
/// manager's `after_rank` cursor depends on.
pub struct PgVectorIndex {
    pool: PgPool,
    metric: SimilarityMetric,
}

impl PgVectorIndex {
    #[must_use]
    pub fn new(pool: PgPool, metric: SimilarityMetric) -> Self {
        Self { pool, metric }
    }

    fn operators(&self) -> (&'static str, &'static str) {
        // (score expression, distance expression for ORDER BY)
        match self.metric {
            SimilarityMetric::Cosine => (
                "(2 - (embedding <=> $1::vector)) / 2",
                "embedding <=> $1::vector",
            ),
            // <#> returns the negated dot product; unit-norm embeddings put
            // it in [-1, 1], shifted into [0, 1] like the cosine score.
            SimilarityMetric::InnerProduct => (
                "(1 - (embedding <#> $1::vector)) / 2",
                "embedding <#> $1::vector",
            ),
        }
    }
}

#[derive(FromRow)]
struct CandidateRow {
    media_id: String,
    score: f32,
}

type CandidateQuery<'q> = QueryAs<'q, Postgres, CandidateRow, PgArguments>;

fn bind_filter<'q>(query: CandidateQuery<'q>, filter: &'q ScopeFilter) -> CandidateQuery<'q> {
    match filter {
        ScopeFilter::Public => query,
        ScopeFilter::Owner(owner_id) => query.bind(owner_id),
        ScopeFilter::OwnedSet { owner_id, ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            query.bind(owner_id).bind(ids)
        }
        ScopeFilter::Members { ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            query.bind(ids)
        }
    }
}

fn where_clause(filter: &ScopeFilter) -> &'static str {
    match filter {
        ScopeFilter::Public => "visibility = 'public'",
        ScopeFilter::Owner(_) => "owner_id = $2",
        ScopeFilter::OwnedSet { .. } => "owner_id = $2 AND media_id = ANY($3)",
        ScopeFilter::Members { .. } => "media_id = ANY($2)",
    }
}

fn paging_params(filter: &ScopeFilter) -> (&'static str, &'static str) {
    match filter {
        ScopeFilter::Public => ("$2", "$3"),
        ScopeFilter::Owner(_) => ("$3", "$4"),
        ScopeFilter::OwnedSet { .. } => ("$4", "$5"),
        ScopeFilter::Members { .. } => ("$3", "$4"),
    }
}

fn map_sqlx_error(err: sqlx::Error) -> IndexError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            IndexError::Unavailable(err.to_string())
        }
        other => IndexError::Query(other),
    }
}

#[async_trait]
impl VectorIndex for PgVectorIndex {
    async fn query(
        &self,
        embedding: &Embedding,
        filter: &ScopeFilter,
        after_rank: usize,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, IndexError> {
        let (score_expr, distance_expr) = self.operators();
        let (offset_param, limit_param) = paging_params(filter);
        let sql = format!(
            "SELECT media_id, ({score_expr})::real AS score \
             FROM media_index \
             WHERE {} \
             ORDER BY {distance_expr} ASC, media_id ASC \
             OFFSET {offset_param} LIMIT {limit_param}",
            where_clause(filter),
        );

        let vector = Vector::from(embedding.as_slice().to_vec());
        let query = sqlx::query_as::<_, CandidateRow>(&sql).bind(vector);
        let rows = bind_filter(query, filter)
            .bind(i64::try_from(after_rank).unwrap_or(i64::MAX))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| RankedCandidate {
                media_id: row.media_id,
                score: row.score.clamp(0.0, 1.0),
            })
            .collect())
    }

    async fn stored_embedding(&self, media_id: &str) -> Result<Option<Embedding>, IndexError> {
        let vector = sqlx::query_scalar::<_, Vector>(
            "SELECT embedding FROM media_index WHERE media_id = $1",
        )
        .bind(media_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(vector.map(|v| Embedding::new(v.to_vec())))
    }
}
