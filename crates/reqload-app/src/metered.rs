use crate::collector::MetricsCollector;
use async_trait::async_trait;
use reqload_adapters::{HttpClient, TransportError};
use reqload_types::{Request, Response};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// `HttpClient` decorator that feeds the `http_*` metrics.
pub struct MeteredClient<C> {
    inner: C,
    collector: Arc<MetricsCollector>,
}

impl<C: HttpClient> MeteredClient<C> {
    pub fn new(inner: C, collector: Arc<MetricsCollector>) -> Self {
        Self { inner, collector }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for MeteredClient<C> {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let started = Instant::now();
        let result = self.inner.send(request).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(res) => {
                debug!(
                    method = %request.method,
                    url = %request.url,
                    status = res.status,
                    elapsed_ms,
                    "response"
                );
                self.collector
                    .record_request(elapsed_ms, !res.is_expected_status());
            }
            Err(err) => {
                warn!(method = %request.method, url = %request.url, error = %err, "transport failure");
                self.collector.record_request(elapsed_ms, true);
            }
        }
        result
    }
}
