use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{http::StatusCode, routing::get, Router};
use prometheus::{Encoder, TextEncoder, IntCounterVec, Opts, Registry, HistogramVec, HistogramOpts};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct MetricsPlugin {
    registry: Arc<Registry>,
    pub request_counter: Arc<IntCounterVec>,
    pub request_duration: Arc<HistogramVec>,
}

impl MetricsPlugin {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let ctr_opts = Opts::new("requests_total", "Total HTTP requests");
        let counter = IntCounterVec::new(ctr_opts, &["method", "path", "status"])?;
        registry.register(Box::new(counter.clone()))?;

        let hist_opts = HistogramOpts::new("request_duration_seconds", "HTTP request latencies in seconds");
        let histogram = HistogramVec::new(hist_opts, &["method", "path"])?;
        registry.register(Box::new(histogram.clone()))?;

        // process collector only exists on Linux with the prometheus `process` feature
        #[cfg(target_os = "linux")]
        {
            let collector = prometheus::process_collector::ProcessCollector::for_self();
            registry.register(Box::new(collector)).ok();
        }

        Ok(MetricsPlugin {
            registry: Arc::new(registry),
            request_counter: Arc::new(counter),
            request_duration: Arc::new(histogram),
        })
    }

    /// Wraps `router` so every request through it is counted and timed under
    /// the `path` label `route`.
    pub fn instrument(&self, router: Router, route: &'static str) -> Router {
        let metrics = self.clone();
        router.layer(middleware::from_fn(move |req: Request, next: Next| {
            let metrics = metrics.clone();
            async move { metrics.track(route, req, next).await }
        }))
    }

    async fn track(&self, route: &'static str, req: Request, next: Next) -> Response {
        let method = req.method().as_str().to_owned();
        let started = Instant::now();
        let resp = next.run(req).await;
        let status = resp.status().as_u16().to_string();
        self.request_counter
            .with_label_values(&[method.as_str(), route, status.as_str()])
            .inc();
        self.request_duration
            .with_label_values(&[method.as_str(), route])
            .observe(started.elapsed().as_secs_f64());
        resp
    }

    pub fn render(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }

    pub fn router(&self) -> Router {
        let metrics = self.clone();
        Router::new().route("/", get(move || {
            let rendered = metrics.render();
            async move {
                match rendered {
                    Ok(body) => (StatusCode::OK, body),
                    Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
                }
            }
        }))
    }
}
