//! Debug endpoints mounted on the shared mux.
//!
//! With the `pprof` feature, `/debug/pprof/profile` samples CPU stacks for
//! `seconds` (default 30) at `frequency` Hz (default 1000) and answers with a
//! pprof protobuf, readable by `go tool pprof`, or an SVG flamegraph when
//! `flamegraph=true`.

use vecmetric_core::error::Result;

use crate::router::Mux;

/// Attach every compiled-in debug route to `mux`. Already attached routes
/// are left alone, so calling this twice is harmless.
pub fn register_debug_routes(mux: &Mux) -> Result<()> {
    attach_profile(mux)
}

#[cfg(feature = "pprof")]
fn attach_profile(mux: &Mux) -> Result<()> {
    if !mux.contains(pprof_routes::PROFILE_PATH) {
        pprof_routes::register_pprof(mux)?;
    }
    Ok(())
}

#[cfg(not(feature = "pprof"))]
fn attach_profile(mux: &Mux) -> Result<()> {
    tracing::debug!(paths = ?mux.paths(), "built without pprof, no debug routes to add");
    Ok(())
}

#[cfg(feature = "pprof")]
pub use pprof_routes::{profile, register_pprof, ProfileParams, PROFILE_PATH};

#[cfg(feature = "pprof")]
mod pprof_routes {
    use std::time::Duration;

    use axum::{
        extract::Query,
        http::{header, StatusCode},
        response::{IntoResponse, Response},
        routing::get,
    };
    use pprof::protos::Message;
    use serde::Deserialize;

    use vecmetric_core::error::Result;

    use crate::router::Mux;

    pub const PROFILE_PATH: &str = "/debug/pprof/profile";

    const DEFAULT_PROFILE_SECONDS: u64 = 30;
    const MAX_PROFILE_SECONDS: u64 = 300;
    const DEFAULT_FREQUENCY: i32 = 1000;

    #[derive(Debug, Deserialize)]
    pub struct ProfileParams {
        #[serde(default = "default_seconds")]
        pub seconds: u64,
        #[serde(default = "default_frequency")]
        pub frequency: i32,
        #[serde(default)]
        pub flamegraph: bool,
    }

    fn default_seconds() -> u64 {
        DEFAULT_PROFILE_SECONDS
    }
    fn default_frequency() -> i32 {
        DEFAULT_FREQUENCY
    }

    pub fn register_pprof(mux: &Mux) -> Result<()> {
        mux.handle(PROFILE_PATH, get(profile))
    }

    pub async fn profile(Query(params): Query<ProfileParams>) -> Response {
        if !(1..=MAX_PROFILE_SECONDS).contains(&params.seconds) {
            return (
                StatusCode::BAD_REQUEST,
                format!("seconds must be between 1 and {MAX_PROFILE_SECONDS}"),
            )
                .into_response();
        }
        if params.frequency <= 0 {
            return (StatusCode::BAD_REQUEST, "frequency must be positive").into_response();
        }

        let content_type = if params.flamegraph {
            "image/svg+xml"
        } else {
            "application/protobuf"
        };

        // The profiler guard lives on a blocking thread for the whole window.
        match tokio::task::spawn_blocking(move || collect(&params)).await {
            Ok(Ok(body)) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
                ],
                body,
            )
                .into_response(),
            Ok(Err(reason)) => {
                tracing::error!(%reason, "build profile failed");
                (StatusCode::INTERNAL_SERVER_ERROR, reason).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "profile task failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }

    fn collect(params: &ProfileParams) -> std::result::Result<Vec<u8>, String> {
        let guard = pprof::ProfilerGuardBuilder::default()
            .frequency(params.frequency)
            .blocklist(&["libc", "libgcc", "pthread", "vdso"])
            .build()
            .map_err(|e| format!("build profiler failed, {e}"))?;

        std::thread::sleep(Duration::from_secs(params.seconds));

        let report = guard
            .report()
            .build()
            .map_err(|e| format!("build report failed, {e}"))?;

        if params.flamegraph {
            let mut buf = Vec::new();
            report
                .flamegraph(&mut buf)
                .map_err(|e| format!("render flamegraph failed, {e}"))?;
            Ok(buf)
        } else {
            let profile = report
                .pprof()
                .map_err(|e| format!("build pprof failed, {e}"))?;
            Ok(profile.encode_to_vec())
        }
    }
}
