use crate::routes::{root, search};
use search_services::interfaces::{SearchItem, SearchResults};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        root::handlers::root,
        root::handlers::health_check,
        // Search handlers
        search::handlers::search_text_handler,
        search::handlers::search_image_handler,
        search::handlers::search_similar_handler,
        search::handlers::get_results_page_handler,
        search::handlers::invalidate_results_handler,
    ),
    components(
        schemas(
            SearchItem,
            SearchResults,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Search", description = "Visual similarity search endpoints"),
        (name = "System", description = "Health check"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
