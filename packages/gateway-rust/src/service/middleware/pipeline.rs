//! Pipeline composition: wraps the entrance in the middleware layers.

use std::convert::Infallible;

use mse_core::GatewayResponse;
use serde::Serialize;
use tower::ServiceBuilder;

use super::load_shed::LoadShedLayer;
use super::metrics::MetricsLayer;
use super::timeout::TimeoutLayer;
use crate::service::config::GatewayConfig;
use crate::service::entrance::{GatewayCall, GatewayEntrance, GatewayFuture};

/// Build the call pipeline by wrapping the `GatewayEntrance` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` -- reject when overloaded (fail fast before doing any work)
/// 2. `TimeoutLayer` -- bound the whole call
/// 3. `MetricsLayer` -- record timing and outcome (closest to the entrance)
///
/// The returned future is `Send`, so calls can run on spawned tasks.
#[must_use]
pub fn build_gateway_pipeline<Req, Res, InVO, OutVO>(
    entrance: GatewayEntrance<Req, Res, InVO, OutVO>,
    config: &GatewayConfig,
) -> impl tower::Service<
    GatewayCall<Req, Res>,
    Response = Res,
    Error = Infallible,
    Future = GatewayFuture<Res>,
> + Clone
+ Send
where
    Req: Serialize + Send + Sync + 'static,
    Res: GatewayResponse + Serialize + Clone + Send + 'static,
    InVO: Send + Sync + 'static,
    OutVO: Send + Sync + 'static,
{
    ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_calls))
        .layer(TimeoutLayer::new(config.call_timeout()).with_payload_logging(config.log_payloads))
        .layer(MetricsLayer)
        .service(entrance)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mse_core::{detail, methods, service_ids};
    use tower::ServiceExt;

    use super::*;
    use crate::service::domain::search::{register_search, Document, SearchRequest, SearchResponse};
    use crate::service::registry::{RegistryBuilder, ServiceRegistry};

    fn entrance() -> crate::service::domain::search::SearchEntrance {
        let mut builder = RegistryBuilder::new();
        register_search(
            &mut builder,
            vec![Document::new("1", "Rust gateway", "five stage pipeline")],
        );
        GatewayEntrance::new(
            Arc::new(ServiceRegistry::new(builder.build())),
            Arc::new(GatewayConfig::default()),
        )
    }

    #[tokio::test]
    async fn pipeline_routes_through_all_layers() {
        let config = GatewayConfig {
            max_concurrent_calls: 100,
            ..GatewayConfig::default()
        };
        let svc = build_gateway_pipeline(entrance(), &config);
        let res = svc
            .oneshot(GatewayCall::new(
                methods::SEARCH,
                SearchRequest::new("gateway"),
                SearchResponse::default(),
            ))
            .await
            .unwrap();
        assert!(res.base.success);
        assert_eq!(res.total, 1);
    }

    #[tokio::test]
    async fn pipeline_keeps_entrance_failures() {
        let svc = build_gateway_pipeline(entrance(), &GatewayConfig::default());
        let res = svc
            .oneshot(GatewayCall::new(
                methods::SEARCH,
                SearchRequest::new("   "),
                SearchResponse::default(),
            ))
            .await
            .unwrap();
        assert!(!res.base.success);
        assert_eq!(res.base.message.as_deref(), Some(detail::VALIDATION));
        assert_eq!(methods::SEARCH.service(), service_ids::SEARCH);
    }

    #[tokio::test]
    async fn pipeline_calls_run_on_spawned_tasks() {
        let svc = build_gateway_pipeline(entrance(), &GatewayConfig::default());
        let handle = tokio::spawn(svc.oneshot(GatewayCall::new(
            methods::SEARCH,
            SearchRequest::new("gateway"),
            SearchResponse::default(),
        )));
        let res = handle.await.unwrap().unwrap();
        assert!(res.base.success);
        assert_eq!(res.total, 1);
    }
}
