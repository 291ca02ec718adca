pub mod routes;
pub mod state;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState) -> Router {
    with_layers(
        Router::new()
            .route("/process", post(routes::process))
            .route("/status", get(routes::status))
            .route("/stop", post(routes::stop))
            .with_state(state),
    )
}

fn with_layers(app: Router) -> Router {
    app.layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

/// Un pánico en un manejador también responde 200 con `{success: false}`.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("💥 handler panicked: {detail}");

    let body = json!({ "success": false, "message": format!("Internal error: {detail}") });
    (StatusCode::OK, Json(body)).into_response()
}
