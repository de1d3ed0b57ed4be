//! Gateway entrance: drives one call through the five-stage pipeline.
//!
//! Stages run strictly in order (validate, pre-convert, intercept, invoke,
//! post-convert). Each stage resolves its collaborator from the registry on
//! its own, so the converter is looked up twice. The first failure
//! short-circuits the rest and is mapped onto the caller's response shell.
//! Nothing escapes `invoke`: collaborator errors and panics alike become a
//! response with `success=false`.

use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures_util::FutureExt;
use mse_core::{
    CollaboratorKind, ExecutionContext, FailureKind, GatewayError, GatewayMethod,
    GatewayResponse, Stage, StageTimings,
};
use serde::Serialize;
use tower::Service;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::config::GatewayConfig;
use super::registry::ServiceRegistry;

// ---------------------------------------------------------------------------
// GatewayCall / GatewayOutcome
// ---------------------------------------------------------------------------

/// Boxed future returned by the entrance and every gateway layer.
pub type GatewayFuture<Res> = Pin<Box<dyn Future<Output = Result<Res, Infallible>> + Send>>;

/// One call as seen by the tower stack: method, request, and the response
/// shell that failures are written into.
#[derive(Debug, Clone)]
pub struct GatewayCall<Req, Res> {
    pub method: GatewayMethod,
    pub request: Req,
    pub response: Res,
}

impl<Req, Res> GatewayCall<Req, Res> {
    #[must_use]
    pub fn new(method: GatewayMethod, request: Req, response: Res) -> Self {
        Self {
            method,
            request,
            response,
        }
    }
}

/// Result of [`GatewayEntrance::execute`]: the response plus what happened
/// on the way.
#[derive(Debug)]
pub struct GatewayOutcome<Res> {
    pub response: Res,
    /// Completed stage segments, in pipeline order.
    pub timings: StageTimings,
    /// Category of the failure that ended the call, if any.
    pub failure: Option<FailureKind>,
}

impl<Res> GatewayOutcome<Res> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

// ---------------------------------------------------------------------------
// GatewayEntrance
// ---------------------------------------------------------------------------

/// Single dispatch point for every service of one request/response family.
pub struct GatewayEntrance<Req, Res, InVO, OutVO> {
    registry: Arc<ServiceRegistry<Req, Res, InVO, OutVO>>,
    config: Arc<GatewayConfig>,
}

impl<Req, Res, InVO, OutVO> Clone for GatewayEntrance<Req, Res, InVO, OutVO> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
        }
    }
}

impl<Req, Res, InVO, OutVO> GatewayEntrance<Req, Res, InVO, OutVO> {
    #[must_use]
    pub fn new(
        registry: Arc<ServiceRegistry<Req, Res, InVO, OutVO>>,
        config: Arc<GatewayConfig>,
    ) -> Self {
        Self { registry, config }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceRegistry<Req, Res, InVO, OutVO>> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

impl<Req, Res, InVO, OutVO> GatewayEntrance<Req, Res, InVO, OutVO>
where
    Req: Serialize + Send + Sync,
    Res: GatewayResponse + Serialize + Send,
    InVO: Send + Sync,
    OutVO: Send + Sync,
{
    /// Runs `request` through the pipeline for `method`.
    ///
    /// Always returns a response. On failure it is `response` with the success
    /// flag cleared and the failure category's detail message set.
    pub async fn invoke(&self, method: GatewayMethod, request: Req, response: Res) -> Res {
        self.execute(method, request, response).await.response
    }

    /// Like [`invoke`](Self::invoke), but also reports stage timings and the
    /// failure category.
    pub async fn execute(
        &self,
        method: GatewayMethod,
        request: Req,
        response: Res,
    ) -> GatewayOutcome<Res> {
        let ctx = ExecutionContext::new(method);
        let span = info_span!(
            "gateway_call",
            node = %self.config.node_id,
            method = method.name(),
            service = %method.service(),
            call_id = %ctx.call_id(),
        );
        self.execute_in(ctx, request, response).instrument(span).await
    }

    async fn execute_in(
        &self,
        mut ctx: ExecutionContext<InVO, OutVO>,
        request: Req,
        mut shell: Res,
    ) -> GatewayOutcome<Res> {
        self.log_payload("inbound", &request);

        let result = match AssertUnwindSafe(self.run_stages(&request, &mut ctx))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(GatewayError::Unclassified(anyhow::anyhow!(
                "collaborator panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        let (response, failure) = match result {
            Ok(response) => (response, None),
            Err(err) => {
                let kind = err.kind();
                report_failure(&ctx, &err);
                shell.mark_failed(kind.detail_message());
                (shell, Some(kind))
            }
        };

        self.log_payload("outbound", &response);
        let timings = ctx.into_timings();
        debug!(%timings, "gateway stage timings");

        GatewayOutcome {
            response,
            timings,
            failure,
        }
    }

    async fn run_stages(
        &self,
        request: &Req,
        ctx: &mut ExecutionContext<InVO, OutVO>,
    ) -> Result<Res, GatewayError> {
        let service = ctx.service();

        let validator = self
            .registry
            .validator(service)
            .ok_or(GatewayError::missing(CollaboratorKind::Validator, service))?;
        let started = Instant::now();
        let outcome = validator.validate(request).await;
        finish_stage(ctx, Stage::Validate, started, outcome)?;

        let converter = self
            .registry
            .converter(service)
            .ok_or(GatewayError::missing(CollaboratorKind::Converter, service))?;
        let started = Instant::now();
        let outcome = converter.request_to_vo(request).await;
        let vo = finish_stage(ctx, Stage::PreConvert, started, outcome)?;
        ctx.set_request(vo);

        let interceptor = self
            .registry
            .interceptor(service)
            .ok_or(GatewayError::missing(CollaboratorKind::Interceptor, service))?;
        let started = Instant::now();
        let outcome = interceptor.intercept(ctx).await;
        let vo = finish_stage(ctx, Stage::Intercept, started, outcome)?;
        ctx.set_request(vo);

        let invoker = self
            .registry
            .invoker(service)
            .ok_or(GatewayError::missing(CollaboratorKind::ProxyInvoker, service))?;
        let vo = ctx.request().ok_or_else(|| {
            GatewayError::Unclassified(anyhow::anyhow!("internal request missing before invoke"))
        })?;
        let started = Instant::now();
        let outcome = invoker.invoke(vo).await;
        let response = finish_stage(ctx, Stage::Invoke, started, outcome)?;
        ctx.set_response(response);

        let converter = self
            .registry
            .converter(service)
            .ok_or(GatewayError::missing(CollaboratorKind::Converter, service))?;
        let response = ctx.take_response().ok_or_else(|| {
            GatewayError::Unclassified(anyhow::anyhow!("invoker response missing before post-convert"))
        })?;
        let started = Instant::now();
        let outcome = converter.vo_to_response(response).await;
        finish_stage(ctx, Stage::PostConvert, started, outcome)
    }

    fn log_payload<T: Serialize>(&self, direction: &'static str, payload: &T) {
        if self.config.log_payloads {
            log_payload(direction, payload);
        }
    }
}

/// Audit-logs a request or response as JSON. Unserializable payloads are
/// reported, never fatal.
pub(crate) fn log_payload<T: Serialize>(direction: &'static str, payload: &T) {
    match serde_json::to_string(payload) {
        Ok(json) => info!(direction, payload = %json, "gateway payload"),
        Err(err) => warn!(direction, error = %err, "gateway payload is not serializable"),
    }
}

/// Closes a stage segment and classifies its collaborator error, if any.
fn finish_stage<T, InVO, OutVO>(
    ctx: &mut ExecutionContext<InVO, OutVO>,
    stage: Stage,
    started: Instant,
    outcome: anyhow::Result<T>,
) -> Result<T, GatewayError> {
    let elapsed = started.elapsed();
    ctx.record_stage(stage, elapsed);
    metrics::histogram!(
        "mse_gateway_stage_duration_seconds",
        "service" => ctx.service().as_str(),
        "stage" => stage.as_str()
    )
    .record(elapsed.as_secs_f64());
    outcome.map_err(|err| GatewayError::classify(err, stage.failure_kind()))
}

fn report_failure<InVO, OutVO>(ctx: &ExecutionContext<InVO, OutVO>, err: &GatewayError) {
    let kind = err.kind();
    metrics::counter!(
        "mse_gateway_failures_total",
        "service" => ctx.service().as_str(),
        "kind" => kind.as_str()
    )
    .increment(1);

    if kind == FailureKind::Configuration {
        error!(kind = %kind, error = %err, "gateway collaborator missing");
    } else {
        warn!(
            kind = %kind,
            detail = kind.detail_message(),
            error = %err,
            cause = ?err,
            "gateway call failed"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return message;
    }
    payload
        .downcast_ref::<String>()
        .map_or("non-string panic payload", String::as_str)
}

// ---------------------------------------------------------------------------
// tower::Service
// ---------------------------------------------------------------------------

impl<Req, Res, InVO, OutVO> Service<GatewayCall<Req, Res>> for GatewayEntrance<Req, Res, InVO, OutVO>
where
    Req: Serialize + Send + Sync + 'static,
    Res: GatewayResponse + Serialize + Send + 'static,
    InVO: Send + Sync + 'static,
    OutVO: Send + Sync + 'static,
{
    type Response = Res;
    type Error = Infallible;
    type Future = GatewayFuture<Res>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: GatewayCall<Req, Res>) -> Self::Future {
        let entrance = self.clone();
        Box::pin(async move {
            Ok(entrance
                .invoke(call.method, call.request, call.response)
                .await)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
