//! Model and record routes, relative to a mount path.

use crate::handlers::{create, delete, fetch, fetch_record, get_model, refresh_model, update};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn data_routes(state: AppState) -> Router {
    Router::new()
        .route("/models/:model_id", get(get_model))
        .route("/models/:model_id/refresh", post(refresh_model))
        .route(
            "/models/:model_id/sources/:container/fetch",
            get(fetch_record).post(fetch),
        )
        .route("/models/:model_id/sources/:container/create", post(create))
        .route("/models/:model_id/sources/:container/update", post(update))
        .route("/models/:model_id/sources/:container/delete", post(delete))
        .with_state(state)
}
