use crate::api_state::ApiContext;
use crate::create_router;
use app_state::AppSettings;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use http::{HeaderValue, header};
use search_services::embedding::RemoteEmbedder;
use search_services::index::PgVectorIndex;
use search_services::service::SearchContext;
use search_services::store::PgMetadataStore;
use sqlx::postgres::PgPoolOptions;
use std::iter::once;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors;
use tower_http::cors::CorsLayer;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub async fn serve(settings: AppSettings) -> Result<()> {
    info!("🚀 Initializing server...");
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&settings.secrets.database_url)
        .await?;
    sqlx::migrate!("../../../migrations").run(&pool).await?;

    let embedder = Arc::new(RemoteEmbedder::new(
        &settings.embedder.base_url,
        settings.embedder.timeout(),
    ));
    let index = Arc::new(PgVectorIndex::new(pool.clone(), settings.search.metric));
    let store = Arc::new(PgMetadataStore::new(pool));
    let search = Arc::new(SearchContext::new(
        embedder,
        index,
        store,
        settings.search.clone(),
    ));
    let _sweeper = search.spawn_sweeper();

    let api_state = ApiContext {
        settings: settings.clone(),
        search,
    };

    // --- CORS Configuration ---
    let allowed_origins: Vec<HeaderValue> = settings
        .api
        .allowed_origins
        .iter()
        .filter_map(|s| match s.parse() {
            Ok(hv) => Some(hv),
            Err(e) => {
                error!("Invalid CORS origin configured: {} - Error: {}", s, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods(cors::Any)
        .allow_origin(allowed_origins)
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            header::USER_AGENT,
        ]);

    let app = create_router(api_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(SetSensitiveRequestHeadersLayer::new(once(
            header::AUTHORIZATION,
        )));

    let addr: SocketAddr = format!("{}:{}", settings.api.host, settings.api.port)
        .parse()
        .map_err(|e| eyre!("Invalid address: {}", e))?;

    info!("🐸 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
