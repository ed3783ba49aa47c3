//! Request metrics in Prometheus text exposition format.
//!
//! Two families are exported:
//! - `wohnfair_ml_requests_total{endpoint,method}` (counter)
//! - `wohnfair_ml_request_duration_seconds{endpoint}` (histogram)
//!
//! A family with no samples still renders its HELP and TYPE lines.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub const REQUESTS_TOTAL: &str = "wohnfair_ml_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "wohnfair_ml_request_duration_seconds";

/// Content type of the exposition body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const BUCKET_COUNT: usize = 14;

/// Latency bucket upper bounds in seconds (`+Inf` is implicit).
pub const DEFAULT_BUCKETS: [f64; BUCKET_COUNT] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

#[derive(Debug, Clone, Default)]
struct Histogram {
    /// Cumulative counts, one per entry of `DEFAULT_BUCKETS`.
    buckets: [u64; BUCKET_COUNT],
    count: u64,
    sum: f64,
}

impl Histogram {
    fn observe(&mut self, seconds: f64) {
        for (bound, bucket) in DEFAULT_BUCKETS.iter().zip(self.buckets.iter_mut()) {
            if seconds <= *bound {
                *bucket += 1;
            }
        }
        self.count += 1;
        self.sum += seconds;
    }
}

#[derive(Debug, Default)]
struct Families {
    requests: BTreeMap<(String, String), u64>,
    latency: BTreeMap<String, Histogram>,
}

/// Thread-safe request counters shared by all server workers.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    families: Mutex<Families>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request and its latency.
    pub fn record(&self, endpoint: &str, method: &str, elapsed: Duration) {
        let mut families = self.families.lock().unwrap_or_else(PoisonError::into_inner);
        *families
            .requests
            .entry((endpoint.to_string(), method.to_string()))
            .or_default() += 1;
        families
            .latency
            .entry(endpoint.to_string())
            .or_default()
            .observe(elapsed.as_secs_f64());
    }

    pub fn request_count(&self, endpoint: &str, method: &str) -> u64 {
        let families = self.families.lock().unwrap_or_else(PoisonError::into_inner);
        families
            .requests
            .get(&(endpoint.to_string(), method.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Render both families in exposition format.
    pub fn render(&self) -> String {
        let families = self.families.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::new();

        out.push_str(&format!("# HELP {REQUESTS_TOTAL} Total API requests\n"));
        out.push_str(&format!("# TYPE {REQUESTS_TOTAL} counter\n"));
        for ((endpoint, method), value) in &families.requests {
            let endpoint = escape_label(endpoint);
            let method = escape_label(method);
            out.push_str(&format!(
                "{REQUESTS_TOTAL}{{endpoint=\"{endpoint}\",method=\"{method}\"}} {value}\n"
            ));
        }

        out.push_str(&format!("# HELP {REQUEST_DURATION_SECONDS} Request latency\n"));
        out.push_str(&format!("# TYPE {REQUEST_DURATION_SECONDS} histogram\n"));
        for (endpoint, histogram) in &families.latency {
            let endpoint = escape_label(endpoint);
            for (bound, value) in DEFAULT_BUCKETS.iter().zip(histogram.buckets.iter()) {
                let le = format_bound(*bound);
                out.push_str(&format!(
                    "{REQUEST_DURATION_SECONDS}_bucket{{endpoint=\"{endpoint}\",le=\"{le}\"}} {value}\n"
                ));
            }
            let count = histogram.count;
            let sum = histogram.sum;
            out.push_str(&format!(
                "{REQUEST_DURATION_SECONDS}_bucket{{endpoint=\"{endpoint}\",le=\"+Inf\"}} {count}\n"
            ));
            out.push_str(&format!(
                "{REQUEST_DURATION_SECONDS}_count{{endpoint=\"{endpoint}\"}} {count}\n"
            ));
            out.push_str(&format!(
                "{REQUEST_DURATION_SECONDS}_sum{{endpoint=\"{endpoint}\"}} {sum}\n"
            ));
        }

        out
    }
}

fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 {
        format!("{bound:.1}")
    } else {
        format!("{bound}")
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
