//! `wohnfair-ml-server`: health, status and metrics endpoints.
//!
//! A blocking HTTP listener served by a fixed pool of worker threads, all
//! pulling requests from one shared socket.
//!
//! ```no_run
//! use wohnfair_ml_config::Settings;
//! use wohnfair_ml_server::{HttpServer, ServerConfig};
//!
//! let config = ServerConfig::from_settings(&Settings::default());
//! let server = HttpServer::bind(config)?;
//! server.run()?;
//! # Ok::<(), wohnfair_ml_server::ServerError>(())
//! ```

pub mod metrics;
pub mod routes;

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tiny_http::{Header, Response, StatusCode};
use wohnfair_ml_config::Settings;

pub use metrics::RequestMetrics;
pub use routes::{Endpoint, Reply, Router};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("worker thread panicked")]
    WorkerPanicked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Listener configuration, usually derived from [`Settings`] and then
/// adjusted by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub metrics_path: String,
    pub record_metrics: bool,
    pub service_name: String,
}

impl ServerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            workers: settings.server.workers,
            metrics_path: settings.monitoring.prometheus_path.clone(),
            record_metrics: settings.is_prometheus_enabled(),
            service_name: settings.service_name.clone(),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Stops a running [`HttpServer`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    server: Arc<tiny_http::Server>,
    stopping: Arc<AtomicBool>,
    workers: usize,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Each unblock wakes exactly one worker blocked in `recv`.
        for _ in 0..self.workers {
            self.server.unblock();
        }
    }
}

pub struct HttpServer {
    server: Arc<tiny_http::Server>,
    router: Router,
    config: ServerConfig,
    stopping: Arc<AtomicBool>,
}

impl HttpServer {
    /// Bind the listening socket. Nothing is served until [`HttpServer::run`].
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.addr();
        let server = tiny_http::Server::http(&addr).map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            message: e.to_string(),
        })?;
        let router = Router::new(
            config.metrics_path.clone(),
            Arc::new(RequestMetrics::new()),
            config.record_metrics,
        );
        Ok(Self {
            server: Arc::new(server),
            router,
            config,
            stopping: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Bound address; useful when binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn metrics(&self) -> Arc<RequestMetrics> {
        Arc::clone(self.router.metrics())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server: Arc::clone(&self.server),
            stopping: Arc::clone(&self.stopping),
            workers: self.config.workers.max(1),
        }
    }

    /// Serve until [`ShutdownHandle::shutdown`] is called.
    pub fn run(self) -> Result<(), ServerError> {
        let workers = self.config.workers.max(1);
        tracing::info!(
            service = %self.config.service_name,
            addr = ?self.local_addr(),
            workers,
            "HTTP server listening"
        );

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let server = Arc::clone(&self.server);
                let router = self.router.clone();
                let stopping = Arc::clone(&self.stopping);
                std::thread::Builder::new()
                    .name(format!("http-worker-{id}"))
                    .spawn(move || worker_loop(&server, &router, &stopping))
            })
            .collect::<Result<_, _>>()?;

        let mut panicked = false;
        for handle in handles {
            panicked |= handle.join().is_err();
        }
        tracing::info!("HTTP server stopped");

        if panicked {
            return Err(ServerError::WorkerPanicked);
        }
        Ok(())
    }
}

fn worker_loop(server: &tiny_http::Server, router: &Router, stopping: &AtomicBool) {
    loop {
        if stopping.load(Ordering::SeqCst) {
            break;
        }
        let request = match server.recv() {
            Ok(request) => request,
            Err(e) => {
                if !stopping.load(Ordering::SeqCst) {
                    tracing::warn!("Accept error: {e}");
                }
                continue;
            }
        };

        let reply = router.handle(request.method(), request.url());
        tracing::debug!(
            method = %request.method(),
            url = request.url(),
            status = reply.status,
            "Handled request"
        );
        if let Err(e) = request.respond(into_response(reply)) {
            tracing::warn!("Failed to write response: {e}");
        }
    }
}

fn into_response(reply: Reply) -> Response<Cursor<Vec<u8>>> {
    let body = reply.body.into_bytes();
    let length = body.len();
    let headers = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
        .map(|header| vec![header])
        .unwrap_or_default();
    Response::new(
        StatusCode(reply.status),
        headers,
        Cursor::new(body),
        Some(length),
        None,
    )
}
