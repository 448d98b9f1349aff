//! Path → handler routing tables.
//!
//! A [`Mux`] collects routes; [`Mux::router`] serves it as an axum
//! [`Router`] that resolves every request against the table as it is at that
//! moment, so routes added or removed while a server runs take effect at
//! once. [`debug_mux`] is the process-wide table other subsystems hang debug
//! endpoints on; the exporter attaches to it when asked to share.

use std::sync::{Arc, OnceLock};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::MethodRouter,
    Router,
};
use dashmap::{mapref::entry::Entry, DashMap};
use tower::ServiceExt;

use vecmetric_core::error::{MetricError, Result};

static DEBUG_MUX: OnceLock<Mux> = OnceLock::new();

/// The process-wide debug mux.
pub fn debug_mux() -> Mux {
    DEBUG_MUX.get_or_init(Mux::new).clone()
}

/// Paths are matched literally: must start with `/` and carry no capture syntax.
pub fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(MetricError::HandlerBuildFailure(format!(
            "path must start with '/': {path:?}"
        )));
    }
    if path.contains([':', '*', '{', '}']) || path.chars().any(char::is_whitespace) {
        return Err(MetricError::HandlerBuildFailure(format!(
            "path must be a literal route: {path:?}"
        )));
    }
    Ok(())
}

/// Cloneable routing table; clones share routes.
#[derive(Clone, Default)]
pub struct Mux {
    routes: Arc<DashMap<String, MethodRouter>>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `route` at `path`. Fails if the path is malformed or taken.
    pub fn handle(&self, path: &str, route: MethodRouter) -> Result<()> {
        validate_path(path)?;
        match self.routes.entry(path.to_string()) {
            Entry::Occupied(_) => Err(MetricError::HandlerBuildFailure(format!(
                "path already routed: {path}"
            ))),
            Entry::Vacant(e) => {
                e.insert(route);
                Ok(())
            }
        }
    }

    /// Detach the route at `path`; `false` when nothing was there.
    pub fn remove(&self, path: &str) -> bool {
        self.routes.remove(path).is_some()
    }

    /// Whether a route is attached at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// Attached paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.routes.iter().map(|r| r.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Router backed by the live table. Unknown paths answer 404.
    pub fn router(&self) -> Router {
        Router::new().fallback(dispatch).with_state(self.clone())
    }
}

async fn dispatch(State(mux): State<Mux>, req: Request) -> Response {
    let route = mux.routes.get(req.uri().path()).map(|r| r.value().clone());
    let Some(route) = route else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match route.oneshot(req).await {
        Ok(resp) => resp,
        Err(never) => match never {},
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ops;
    use axum::routing::get;

    #[test]
    fn rejects_bad_paths() {
        for bad in ["", "metric", "/m/:id", "/m/*rest", "/m/{id}", "/a b"] {
            let err = validate_path(bad).unwrap_err();
            assert_eq!(err.kind().as_str(), "HANDLER_BUILD_FAILURE", "{bad:?}");
        }
        validate_path("/metric").unwrap();
        validate_path("/").unwrap();
    }

    #[test]
    fn duplicate_path_is_refused() {
        let mux = Mux::new();
        mux.handle("/healthz", get(ops::healthz)).unwrap();
        assert!(mux.handle("/healthz", get(ops::healthz)).is_err());

        assert!(mux.remove("/healthz"));
        mux.handle("/healthz", get(ops::healthz)).unwrap();
    }

    #[test]
    fn clones_share_routes() {
        let mux = Mux::new();
        let other = mux.clone();
        other.handle("/b", get(ops::healthz)).unwrap();
        mux.handle("/a", get(ops::healthz)).unwrap();

        assert_eq!(mux.paths(), vec!["/a".to_string(), "/b".to_string()]);
        assert!(other.contains("/a"));
    }

    #[tokio::test]
    async fn router_follows_later_changes() {
        use axum::body::Body;

        let mux = Mux::new();
        let router = mux.router();
        let get_late = || Request::builder().uri("/late").body(Body::empty()).unwrap();

        let resp = router.clone().oneshot(get_late()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        mux.handle("/late", get(ops::healthz)).unwrap();
        let resp = router.clone().oneshot(get_late()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        mux.remove("/late");
        let resp = router.oneshot(get_late()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
