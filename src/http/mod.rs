//! HTTP interface
//!
//! Routes, request parsing, upload handling and the mapping from action
//! errors to status codes.

pub mod error;
pub mod form;
pub mod routes;
pub mod upload;

pub use error::ApiError;
pub use routes::{AppState, Clock, SharedState};
pub use upload::{ImageStore, StoredImage, UploadedImage, IMAGE_FIELD, UPLOADS_ROUTE};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Largest request body accepted, uploads included
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router
pub fn router(state: SharedState) -> Router {
    let uploads = ServeDir::new(state.images.dir());

    Router::new()
        .route("/", get(routes::health))
        .route(
            "/habitCards",
            get(routes::latest_habits).post(routes::create_habit),
        )
        .route("/publicHabits", get(routes::public_habits))
        .route(
            "/habits/{id}",
            get(routes::get_habit)
                .patch(routes::update_habit)
                .delete(routes::delete_habit),
        )
        .route("/habits/complete/{id}", patch(routes::mark_complete))
        .route("/myHabits/{email}", get(routes::my_habits))
        .route("/myhabits/{email}", get(routes::my_habits))
        .nest_service(UPLOADS_ROUTE, uploads)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
