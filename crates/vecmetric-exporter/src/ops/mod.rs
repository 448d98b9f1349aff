//! Operational HTTP endpoints.
//!
//! - `<expose path>` : scrape output of the registry, via the configured encoder
//! - `/healthz`      : liveness, for hosts that mount it on the debug mux

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
};

use vecmetric_core::{Encoder, Registry};

/// What a scrape needs: where to read from and how to serialize.
#[derive(Clone)]
pub struct ScrapeState {
    registry: Registry,
    encoder: Arc<dyn Encoder>,
}

impl ScrapeState {
    pub fn new(registry: Registry, encoder: Arc<dyn Encoder>) -> Self {
        Self { registry, encoder }
    }
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<ScrapeState>) -> Response {
    let families = state.registry.gather();
    match state.encoder.encode(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.encoder.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "encode metrics failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET route serving `state`, ready to attach to a [`Mux`](crate::Mux).
pub fn metrics_route(state: ScrapeState) -> MethodRouter {
    get(metrics).with_state(state)
}
