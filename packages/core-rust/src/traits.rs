use std::fmt;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::response::ResponseContext;

/// Checks an inbound request before anything else touches it.
/// Untyped errors are classified as validation failures.
#[async_trait]
pub trait Validator<Req>: Send + Sync {
    async fn validate(&self, request: &Req) -> anyhow::Result<()>;
}

/// Translates between the wire types and the internal value objects.
/// Untyped errors from either direction are classified as conversion failures.
#[async_trait]
pub trait Converter<Req, Res, InVO, OutVO>: Send + Sync {
    /// Wire request to internal request (pre-convert).
    async fn request_to_vo(&self, request: &Req) -> anyhow::Result<InVO>;

    /// Invoker result to wire response (post-convert).
    async fn vo_to_response(&self, response: ResponseContext<OutVO>) -> anyhow::Result<Res>;
}

/// Runs between conversion and invocation.
///
/// Returns the internal request that the invoker will receive; this may be the
/// current one, an enriched copy, or a derived value. Untyped errors are
/// classified as intercept failures.
#[async_trait]
pub trait Interceptor<InVO, OutVO>: Send + Sync {
    async fn intercept(&self, ctx: &ExecutionContext<InVO, OutVO>) -> anyhow::Result<InVO>;
}

/// Calls the backing service. Any retry policy lives here.
/// Untyped errors are classified as service invocation failures.
#[async_trait]
pub trait ProxyInvoker<InVO, OutVO>: Send + Sync {
    async fn invoke(&self, request: &InVO) -> anyhow::Result<ResponseContext<OutVO>>;
}

/// The four collaborator roles a service registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollaboratorKind {
    Validator,
    Converter,
    Interceptor,
    ProxyInvoker,
}

impl CollaboratorKind {
    pub const ALL: [CollaboratorKind; 4] = [
        CollaboratorKind::Validator,
        CollaboratorKind::Converter,
        CollaboratorKind::Interceptor,
        CollaboratorKind::ProxyInvoker,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validator => "validator",
            Self::Converter => "converter",
            Self::Interceptor => "interceptor",
            Self::ProxyInvoker => "proxy invoker",
        }
    }
}

impl fmt::Display for CollaboratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
