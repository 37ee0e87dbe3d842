//! Router assembly: common routes at the root, data routes under every mount path.

mod common;
mod data;

pub use common::common_routes;
pub use data::data_routes;

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Full application router. `mounts` are paths such as `/api/data`.
pub fn app_router(state: AppState, mounts: &[String], body_limit: usize) -> Router {
    let mut app = common_routes(state.clone());
    for mount in mounts {
        app = app.nest(mount, data_routes(state.clone()));
    }
    app.layer(
        ServiceBuilder::new()
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(body_limit)),
    )
}
