//! Load-shedding middleware for gateway calls.
//!
//! Rejects calls once `max_concurrent_calls` are in flight. A rejected call
//! never reaches the entrance; its response shell comes back marked failed.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use mse_core::GatewayResponse;
use tokio::sync::Semaphore;
use tower::{Layer, Service};
use tracing::warn;

use crate::service::entrance::{GatewayCall, GatewayFuture};

/// Message set on calls rejected because the gateway is at capacity.
pub const OVERLOADED_MESSAGE: &str = "gateway overloaded, try again later";

// ---------------------------------------------------------------------------
// LoadShedLayer
// ---------------------------------------------------------------------------

/// Tower layer that limits concurrent calls via a semaphore.
///
/// When all permits are taken, incoming calls are answered immediately rather
/// than queued.
#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    semaphore: Arc<Semaphore>,
}

impl LoadShedLayer {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            semaphore: self.semaphore.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoadShedService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    semaphore: Arc<Semaphore>,
}

impl<S, Req, Res> Service<GatewayCall<Req, Res>> for LoadShedService<S>
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
        let Ok(permit) = self.semaphore.clone().try_acquire_owned() else {
            warn!(method = call.method.name(), service = %call.method.service(), "gateway overloaded, call rejected");
            metrics::counter!("mse_gateway_shed_total", "service" => call.method.service().as_str())
                .increment(1);
            let mut response = call.response;
            response.mark_failed(OVERLOADED_MESSAGE);
            return Box::pin(async move { Ok(response) });
        };

        let fut = self.inner.call(call);
        Box::pin(async move {
            let result = fut.await;
            drop(permit);
            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    use mse_core::{methods, BaseResponse};
    use tower::ServiceExt;

    use super::*;

    /// Service that holds each call for a configurable duration.
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
    async fn allows_calls_under_limit() {
        let svc = LoadShedLayer::new(10).layer(SlowService { delay_ms: 1 });
        let res = svc.oneshot(make_call()).await.unwrap();
        assert!(res.success);
    }

    #[tokio::test]
    async fn rejects_when_overloaded() {
        let mut svc = LoadShedLayer::new(1).layer(SlowService { delay_ms: 500 });

        // First call takes the single permit.
        let _ = ServiceExt::ready(&mut svc).await.unwrap();
        let in_flight = tokio::spawn(svc.call(make_call()));

        tokio::time::sleep(Duration::from_millis(10)).await;

        let res = svc.call(make_call()).await.unwrap();
        assert!(!res.success);
        assert_eq!(res.message.as_deref(), Some(OVERLOADED_MESSAGE));

        let first = in_flight.await.unwrap().unwrap();
        assert!(first.success);
    }

    #[tokio::test]
    async fn permit_is_released_after_completion() {
        let mut svc = LoadShedLayer::new(1).layer(SlowService { delay_ms: 1 });
        let first = svc.call(make_call()).await.unwrap();
        let second = svc.call(make_call()).await.unwrap();
        assert!(first.success && second.success);
    }
}
