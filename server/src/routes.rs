//! Request routing.
//!
//! Routing is independent of the socket so it can be exercised directly;
//! [`crate::HttpServer`] only translates [`Reply`] into a wire response.

use std::sync::Arc;
use std::time::Instant;

use tiny_http::Method;

use crate::metrics::{self, RequestMetrics};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Healthz,
    Status,
    Metrics,
}

/// Response produced by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    metrics_path: String,
    metrics: Arc<RequestMetrics>,
    record_requests: bool,
}

impl Router {
    /// `metrics_path` is where the scrape endpoint lives (normally
    /// `/metrics`). With `record_requests` off the exposition stays empty.
    pub fn new(
        metrics_path: impl Into<String>,
        metrics: Arc<RequestMetrics>,
        record_requests: bool,
    ) -> Self {
        Self {
            metrics_path: metrics_path.into(),
            metrics,
            record_requests,
        }
    }

    pub fn metrics(&self) -> &Arc<RequestMetrics> {
        &self.metrics
    }

    /// Match a request target, ignoring any query string.
    pub fn resolve(&self, url: &str) -> Option<Endpoint> {
        let path = url.split_once('?').map_or(url, |(path, _)| path);
        match path {
            "/healthz" => Some(Endpoint::Healthz),
            "/status" => Some(Endpoint::Status),
            p if p == self.metrics_path => Some(Endpoint::Metrics),
            _ => None,
        }
    }

    fn path_of(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Healthz => "/healthz",
            Endpoint::Status => "/status",
            Endpoint::Metrics => &self.metrics_path,
        }
    }

    pub fn handle(&self, method: &Method, url: &str) -> Reply {
        let started = Instant::now();

        let Some(endpoint) = self.resolve(url) else {
            return Reply::text(404, "not found\n");
        };
        if *method != Method::Get {
            return Reply::text(405, "method not allowed\n");
        }

        let reply = match endpoint {
            Endpoint::Healthz => Reply::text(200, "ok\n"),
            Endpoint::Status => Reply::text(200, "running\n"),
            Endpoint::Metrics => Reply {
                status: 200,
                content_type: metrics::CONTENT_TYPE,
                body: self.metrics.render(),
            },
        };

        if self.record_requests {
            self.metrics
                .record(self.path_of(endpoint), method.as_str(), started.elapsed());
        }
        reply
    }
}
