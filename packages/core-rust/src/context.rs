use std::time::Duration;

use uuid::Uuid;

use crate::response::ResponseContext;
use crate::timing::{Stage, StageTimings};
use crate::types::{GatewayMethod, ServiceId};

/// Per-call state threaded through the gateway pipeline.
///
/// Created fresh for each call and owned by exactly one invocation. Stages
/// write to it in pipeline order; interceptors only get a shared borrow.
#[derive(Debug)]
pub struct ExecutionContext<InVO, OutVO> {
    method: GatewayMethod,
    /// Correlates log lines belonging to the same call.
    call_id: Uuid,
    request: Option<InVO>,
    response: Option<ResponseContext<OutVO>>,
    timings: StageTimings,
}

impl<InVO, OutVO> ExecutionContext<InVO, OutVO> {
    #[must_use]
    pub fn new(method: GatewayMethod) -> Self {
        Self {
            method,
            call_id: Uuid::new_v4(),
            request: None,
            response: None,
            timings: StageTimings::new(),
        }
    }

    #[must_use]
    pub fn method(&self) -> GatewayMethod {
        self.method
    }

    #[must_use]
    pub fn service(&self) -> ServiceId {
        self.method.service()
    }

    #[must_use]
    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    /// Internal request value, present once pre-convert has run.
    #[must_use]
    pub fn request(&self) -> Option<&InVO> {
        self.request.as_ref()
    }

    pub fn set_request(&mut self, request: InVO) {
        self.request = Some(request);
    }

    /// Invoker result, present once the invoke stage has run.
    #[must_use]
    pub fn response(&self) -> Option<&ResponseContext<OutVO>> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, response: ResponseContext<OutVO>) {
        self.response = Some(response);
    }

    pub fn take_response(&mut self) -> Option<ResponseContext<OutVO>> {
        self.response.take()
    }

    #[must_use]
    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }

    pub fn record_stage(&mut self, stage: Stage, elapsed: Duration) {
        self.timings.record(stage, elapsed);
    }

    #[must_use]
    pub fn into_timings(self) -> StageTimings {
        self.timings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::methods;

    #[test]
    fn fresh_context_is_empty() {
        let ctx: ExecutionContext<String, u32> = ExecutionContext::new(methods::SEARCH);
        assert_eq!(ctx.service().as_str(), "search");
        assert!(ctx.request().is_none());
        assert!(ctx.response().is_none());
        assert!(ctx.timings().is_empty());
    }

    #[test]
    fn each_context_gets_its_own_call_id() {
        let a: ExecutionContext<(), ()> = ExecutionContext::new(methods::SEARCH);
        let b: ExecutionContext<(), ()> = ExecutionContext::new(methods::SEARCH);
        assert_ne!(a.call_id(), b.call_id());
    }

    #[test]
    fn request_and_response_are_replaceable() {
        let mut ctx: ExecutionContext<String, u32> = ExecutionContext::new(methods::SEARCH);
        ctx.set_request("raw".to_string());
        ctx.set_request("enriched".to_string());
        assert_eq!(ctx.request().map(String::as_str), Some("enriched"));

        ctx.set_response(ResponseContext::ok(3));
        assert_eq!(ctx.take_response().and_then(ResponseContext::into_data), Some(3));
        assert!(ctx.response().is_none());
    }
}
