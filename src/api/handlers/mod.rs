//! REST endpoint handlers organized by resource.

pub mod event;
pub mod subscription;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes every resource route at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(event::routes())
        .merge(subscription::routes())
        .merge(system::routes())
}
