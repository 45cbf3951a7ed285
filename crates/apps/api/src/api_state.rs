use app_state::AppSettings;
use axum::extract::FromRef;
use search_services::service::SearchContext;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiContext {
    pub settings: AppSettings,
    pub search: Arc<SearchContext>,
}

// Lets extractors and middleware pull just the settings out of the state.
impl FromRef<ApiContext> for AppSettings {
    fn from_ref(state: &ApiContext) -> Self {
        state.settings.clone()
    }
}
