//! Exporter server lifecycle.
//!
//! `Uninitialized → Starting → Listening(addr)`; `Failed` when the handler
//! cannot be attached or the listener dies; `Stopped` after a graceful stop.
//! [`Exporter::start`] returns as soon as the route is attached: binding and
//! serving happen on a spawned task reported through [`ExporterHandle`].

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, OnceLock};

use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use vecmetric_core::error::{MetricError, Result};
use vecmetric_core::{Encoder, Registry, TextEncoder};

use crate::config::ExporterConfig;
use crate::debug;
use crate::ops::{self, ScrapeState};
use crate::router::{debug_mux, Mux};

static GLOBAL_EXPORTER: OnceLock<Exporter> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExporterState {
    Uninitialized,
    Starting,
    Listening(SocketAddr),
    Failed(String),
    Stopped,
}

/// Where and how to expose the registry.
#[derive(Debug, Clone)]
pub struct ExporterOptions {
    pub path: String,
    pub port: u16,
    pub share_debug_mux: bool,
    pub bind: IpAddr,
}

impl Default for ExporterOptions {
    fn default() -> Self {
        Self::new("/metric", 18089, false)
    }
}

impl ExporterOptions {
    /// Listens on all interfaces; see [`ExporterOptions::bind`].
    pub fn new(path: impl Into<String>, port: u16, share_debug_mux: bool) -> Self {
        Self {
            path: path.into(),
            port,
            share_debug_mux,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }

    pub fn bind(mut self, ip: IpAddr) -> Self {
        self.bind = ip;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Serves one registry. At most one server per `Exporter` runs at a time.
#[derive(Clone)]
pub struct Exporter {
    registry: Registry,
    encoder: Arc<dyn Encoder>,
    shared_mux: Mux,
    state: Arc<watch::Sender<ExporterState>>,
}

impl Exporter {
    pub fn new(registry: Registry) -> Self {
        let (state, _) = watch::channel(ExporterState::Uninitialized);
        Self {
            registry,
            encoder: Arc::new(TextEncoder::new()),
            shared_mux: debug_mux(),
            state: Arc::new(state),
        }
    }

    /// Exporter over [`Registry::global`] sharing [`debug_mux`].
    pub fn global() -> Exporter {
        GLOBAL_EXPORTER
            .get_or_init(|| Exporter::new(Registry::global()))
            .clone()
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Mux used when `share_debug_mux` is set. Defaults to [`debug_mux`].
    pub fn with_debug_mux(mut self, mux: Mux) -> Self {
        self.shared_mux = mux;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> ExporterState {
        self.state.borrow().clone()
    }

    /// Attach the scrape route and spawn the listener on the current tokio
    /// runtime. Bind errors arrive later, through the returned handle.
    pub fn start(&self, opts: ExporterOptions) -> Result<ExporterHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MetricError::Internal(format!("exporter needs a tokio runtime: {e}")))?;

        let mut running_at = String::new();
        let claimed = self.state.send_if_modified(|state| match state {
            ExporterState::Starting => {
                running_at = opts.addr().to_string();
                false
            }
            ExporterState::Listening(addr) => {
                running_at = addr.to_string();
                false
            }
            _ => {
                *state = ExporterState::Starting;
                true
            }
        });
        if !claimed {
            return Err(MetricError::AlreadyRunning(running_at));
        }

        let mux = if opts.share_debug_mux {
            self.shared_mux.clone()
        } else {
            Mux::new()
        };
        let scrape = ScrapeState::new(self.registry.clone(), Arc::clone(&self.encoder));
        if let Err(e) = mux.handle(&opts.path, ops::metrics_route(scrape)) {
            tracing::error!(path = %opts.path, error = %e, "init metrics failed");
            self.state.send_replace(ExporterState::Failed(e.to_string()));
            return Err(e);
        }

        let router = mux.router();
        let shared = opts.share_debug_mux.then_some(mux);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = runtime.spawn(serve(
            opts.clone(),
            router,
            shutdown_rx,
            Arc::clone(&self.state),
            shared,
        ));

        Ok(ExporterHandle {
            addr: opts.addr(),
            path: opts.path,
            state: self.state.subscribe(),
            shutdown: Some(shutdown_tx),
            task,
        })
    }
}

async fn serve(
    opts: ExporterOptions,
    router: axum::Router,
    shutdown: oneshot::Receiver<()>,
    state: Arc<watch::Sender<ExporterState>>,
    shared: Option<Mux>,
) -> Result<()> {
    let addr = opts.addr();
    let result = listen(addr, &opts.path, router, shutdown, &state).await;

    // Free the path on the shared mux so a later start can claim it again.
    if let Some(mux) = shared {
        mux.remove(&opts.path);
    }

    match result {
        Ok(()) => {
            tracing::info!(%addr, path = %opts.path, "exporter stopped");
            state.send_replace(ExporterState::Stopped);
            Ok(())
        }
        Err(reason) => {
            tracing::error!(%addr, path = %opts.path, %reason, "start exporter failed");
            state.send_replace(ExporterState::Failed(reason.clone()));
            Err(MetricError::ListenFailure {
                addr: addr.to_string(),
                path: opts.path,
                reason,
            })
        }
    }
}

async fn listen(
    addr: SocketAddr,
    path: &str,
    router: axum::Router,
    shutdown: oneshot::Receiver<()>,
    state: &watch::Sender<ExporterState>,
) -> std::result::Result<(), String> {
    tracing::info!(%addr, %path, "starting exporter");
    let listener = TcpListener::bind(addr).await.map_err(|e| e.to_string())?;
    let local = listener.local_addr().map_err(|e| e.to_string())?;

    state.send_replace(ExporterState::Listening(local));
    tracing::info!(addr = %local, %path, "exporter listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            // A dropped handle detaches: keep serving until process exit.
            if shutdown.await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
        .map_err(|e| e.to_string())
}

/// Lifecycle handle of a started exporter.
///
/// Dropping it leaves the server running; use [`ExporterHandle::stop`] to
/// shut it down.
pub struct ExporterHandle {
    addr: SocketAddr,
    path: String,
    state: watch::Receiver<ExporterState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ExporterHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> ExporterState {
        self.state.borrow().clone()
    }

    /// Wait until the listener is bound and return its local address.
    pub async fn listening(&mut self) -> Result<SocketAddr> {
        let state = self
            .state
            .wait_for(|s| !matches!(s, ExporterState::Starting))
            .await
            .map_err(|_| MetricError::Internal("exporter state channel closed".into()))?
            .clone();

        match state {
            ExporterState::Listening(addr) => Ok(addr),
            ExporterState::Failed(reason) => Err(MetricError::ListenFailure {
                addr: self.addr.to_string(),
                path: self.path.clone(),
                reason,
            }),
            other => Err(MetricError::Internal(format!(
                "exporter is not listening: {other:?}"
            ))),
        }
    }

    /// Resolve once the server has stopped or failed.
    pub async fn finished(&mut self) -> ExporterState {
        let done = |s: &ExporterState| matches!(s, ExporterState::Failed(_) | ExporterState::Stopped);
        if let Ok(state) = self.state.wait_for(done).await {
            return state.clone();
        }
        self.state.borrow().clone()
    }

    /// Graceful shutdown. Returns the listener's failure if it had one.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.wait().await
    }

    /// Wait for the server task to end without asking it to.
    pub async fn wait(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| MetricError::Internal(format!("exporter task: {e}")))?
    }
}

/// Start the process-wide exporter over the global registry.
pub fn start_exporter(path: &str, port: u16, share_debug_mux: bool) -> Result<ExporterHandle> {
    Exporter::global().start(ExporterOptions::new(path, port, share_debug_mux))
}

/// Start the process-wide exporter if the config enables it. Sharing the
/// debug mux also mounts the debug routes (`/debug/pprof/profile`).
pub fn init_from_config(cfg: &ExporterConfig) -> Result<Option<ExporterHandle>> {
    if !cfg.metric.enable {
        tracing::info!("metric exporter disabled");
        return Ok(None);
    }
    let opts = cfg.exporter_options()?;
    if opts.share_debug_mux {
        debug::register_debug_routes(&debug_mux())?;
    }
    Exporter::global().start(opts).map(Some)
}
