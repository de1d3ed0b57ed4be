//! Timeout middleware for gateway calls.
//!
//! The entrance itself never times out; this layer is the transport-side
//! bound. A call that exceeds it is abandoned and answered with a copy of its
//! original response shell, marked failed. The abandoned entrance never writes
//! its outbound payload log, so this layer writes it for the fallback instead.

use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::Duration;

use mse_core::GatewayResponse;
use serde::Serialize;
use tower::{Layer, Service};
use tracing::warn;

use crate::service::entrance::{log_payload, GatewayCall, GatewayFuture};

/// Message set on calls that exceeded the configured timeout.
pub const TIMED_OUT_MESSAGE: &str = "gateway call timed out";

#[derive(Debug, Clone)]
pub struct TimeoutLayer {
    timeout: Duration,
    log_payloads: bool,
}

impl TimeoutLayer {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            log_payloads: false,
        }
    }

    /// Writes the outbound payload log for timed-out calls.
    #[must_use]
    pub fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            timeout: self.timeout,
            log_payloads: self.log_payloads,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    timeout: Duration,
    log_payloads: bool,
}

impl<S, Req, Res> Service<GatewayCall<Req, Res>> for TimeoutService<S>
where
    S: Service<GatewayCall<Req, Res>, Response = Res, Error = Infallible> + Send,
    S::Future: Send + 'static,
    Res: GatewayResponse + Serialize + Clone + Send + 'static,
{
    type Response = Res;
    type Error = Infallible;
    type Future = GatewayFuture<Res>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: GatewayCall<Req, Res>) -> Self::Future {
        let method = call.method;
        let mut fallback = call.response.clone();
        let timeout = self.timeout;
        let log_payloads = self.log_payloads;
        let fut = self.inner.call(call);
        Box::pin(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    #[allow(clippy::cast_possible_truncation)]
                    let timeout_ms = timeout.as_millis() as u64;
                    warn!(method = method.name(), service = %method.service(), timeout_ms, "gateway call timed out");
                    fallback.mark_failed(TIMED_OUT_MESSAGE);
                    if log_payloads {
                        log_payload("outbound", &fallback);
                    }
                    Ok(fallback)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use mse_core::{methods, BaseResponse};
    use tower::ServiceExt;

    use super::*;

    /// Service that takes a configurable delay before responding.
    struct SlowService {
        delay_ms: u64,
    }

    impl Service<GatewayCall<(), BaseResponse>> for SlowService {
        type Response = BaseResponse;
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<BaseResponse, Infallible>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _call: GatewayCall<(), BaseResponse>) -> Self::Future {
            let delay = self.delay_ms;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(BaseResponse::ok())
            })
        }
    }

    fn make_call() -> GatewayCall<(), BaseResponse> {
        GatewayCall::new(methods::SEARCH, (), BaseResponse::default())
    }

    #[tokio::test]
    async fn completes_within_timeout() {
        let svc = TimeoutLayer::new(Duration::from_millis(1000)).layer(SlowService { delay_ms: 10 });
        let res = svc.oneshot(make_call()).await.unwrap();
        assert!(res.success);
        assert_eq!(res.message, None);
    }

    #[tokio::test]
    async fn exceeding_timeout_returns_failed_shell() {
        let svc = TimeoutLayer::new(Duration::from_millis(50)).layer(SlowService { delay_ms: 200 });
        let res = svc.oneshot(make_call()).await.unwrap();
        assert!(!res.success);
        assert_eq!(res.message.as_deref(), Some(TIMED_OUT_MESSAGE));
    }

    #[tokio::test]
    async fn timed_out_call_with_payload_logging_still_answers() {
        let layer = TimeoutLayer::new(Duration::from_millis(20)).with_payload_logging(true);
        assert!(layer.log_payloads);
        let svc = layer.layer(SlowService { delay_ms: 200 });
        let shell = BaseResponse {
            success: true,
            message: Some("prefilled".to_string()),
        };
        let res = svc
            .oneshot(GatewayCall::new(methods::SEARCH, (), shell))
            .await
            .unwrap();
        assert!(!res.success);
        assert_eq!(res.message.as_deref(), Some(TIMED_OUT_MESSAGE));
    }

    #[test]
    fn payload_logging_is_off_by_default() {
        assert!(!TimeoutLayer::new(Duration::from_secs(1)).log_payloads);
    }
}
