//! Metrics middleware for gateway calls.
//!
//! Records call duration and outcome in a `tracing` span and through the
//! `metrics` facade. No exporter is installed here.

use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::Instant;

use mse_core::GatewayResponse;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::entrance::{GatewayCall, GatewayFuture};

#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

/// Service wrapper that records call duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S, Req, Res> Service<GatewayCall<Req, Res>> for MetricsService<S>
where
    S: Service<GatewayCall<Req, Res>, Response = Res, Error = Infallible> + Send,
    S::Future: Send + 'static,
    Res: GatewayResponse + Send + 'static,
{
    type Response = Res;
    type Error = Infallible;
    type Future = GatewayFuture<Res>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: GatewayCall<Req, Res>) -> Self::Future {
        let method = call.method.name();
        let service = call.method.service().as_str();

        let span = info_span!(
            "gateway_dispatch",
            method = method,
            service = service,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(call);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let outcome = match &result {
                    Ok(res) if res.is_success() => "ok",
                    _ => "failed",
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                metrics::counter!("mse_gateway_calls_total", "service" => service, "outcome" => outcome)
                    .increment(1);
                metrics::histogram!("mse_gateway_call_duration_seconds", "service" => service)
                    .record(elapsed.as_secs_f64());

                tracing::info!(method, service, duration_ms, outcome, "gateway call complete");

                result
            }
            .instrument(span),
        )
    }
}
