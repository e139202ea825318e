//! REST API layer: route handlers, DTOs, extractors, and router
//! composition.
//!
//! All endpoints are mounted at the root; peers address each other by
//! `/event` and `/subscribe` directly.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod openapi;

#[cfg(test)]
pub(crate) mod testing;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
///
/// With the `swagger-ui` feature the OpenAPI document and Swagger UI are
/// mounted as well.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
}
