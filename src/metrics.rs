//! HTTP request metrics kept in a private Prometheus registry.

use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
    uptime: Gauge,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests served."),
            &["method", "path", "status"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Time spent serving HTTP requests.",
            ),
            &["method", "path"],
        )?;
        let uptime = Gauge::new("process_uptime_seconds", "Seconds since the server started.")?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(uptime.clone()))?;

        Ok(Self {
            registry,
            requests,
            latency,
            uptime,
            started_at: Instant::now(),
        })
    }

    /// `path` must be the route template (`/question/{id}`), not the raw URI,
    /// so label cardinality stays bounded.
    pub fn record(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.requests
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.latency
            .with_label_values(&[method, path])
            .observe(elapsed.as_secs_f64());
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    pub fn render(&self) -> anyhow::Result<String> {
        self.uptime.set(self.started_at.elapsed().as_secs_f64());

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
