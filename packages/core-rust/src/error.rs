//! Failure taxonomy for the gateway pipeline.
//!
//! Every failure carries a [`FailureKind`], and every kind maps to a fixed
//! user-facing detail message. The message is independent of the underlying
//! cause, so internal error text never reaches a response.

use std::fmt;

use crate::traits::CollaboratorKind;
use crate::types::ServiceId;

/// Stable user-facing detail messages, one per [`FailureKind`].
pub mod detail {
    pub const INTERCEPT: &str = "request rejected by gateway interceptor";
    pub const VALIDATION: &str = "request parameters are invalid";
    pub const CONVERSION: &str = "request or response conversion failed";
    pub const SERVICE_INVOCATION: &str = "downstream service call failed";
    pub const CONFIGURATION: &str = "gateway configuration error: service is not fully registered";
    pub const UNCLASSIFIED: &str = "gateway internal error";
}

/// Failure categories, in the order they can first occur in a call.
///
/// `Configuration` is the escalation for a missing collaborator: a deployment
/// fault rather than a business failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Intercept,
    Validation,
    Conversion,
    ServiceInvocation,
    Configuration,
    Unclassified,
}

impl FailureKind {
    #[must_use]
    pub const fn detail_message(self) -> &'static str {
        match self {
            Self::Intercept => detail::INTERCEPT,
            Self::Validation => detail::VALIDATION,
            Self::Conversion => detail::CONVERSION,
            Self::ServiceInvocation => detail::SERVICE_INVOCATION,
            Self::Configuration => detail::CONFIGURATION,
            Self::Unclassified => detail::UNCLASSIFIED,
        }
    }

    /// Short label used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intercept => "intercept",
            Self::Validation => "validation",
            Self::Conversion => "conversion",
            Self::ServiceInvocation => "service_invocation",
            Self::Configuration => "configuration",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified pipeline failure wrapping its underlying cause.
///
/// Collaborators may return one of these (boxed in `anyhow::Error`) to pick
/// their own category; anything else is reclassified by the entrance with
/// [`GatewayError::classify`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("intercept failed: {0}")]
    Intercept(#[source] anyhow::Error),
    #[error("validation failed: {0}")]
    Validation(#[source] anyhow::Error),
    #[error("conversion failed: {0}")]
    Conversion(#[source] anyhow::Error),
    #[error("service invocation failed: {0}")]
    ServiceInvocation(#[source] anyhow::Error),
    #[error("no {kind} registered for service `{service}`")]
    MissingCollaborator {
        kind: CollaboratorKind,
        service: ServiceId,
    },
    #[error("unclassified failure: {0}")]
    Unclassified(#[source] anyhow::Error),
}

impl GatewayError {
    pub fn intercept<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::Intercept(anyhow::Error::msg(message))
    }

    pub fn validation<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::Validation(anyhow::Error::msg(message))
    }

    pub fn conversion<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::Conversion(anyhow::Error::msg(message))
    }

    pub fn service_invocation<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::ServiceInvocation(anyhow::Error::msg(message))
    }

    #[must_use]
    pub const fn missing(kind: CollaboratorKind, service: ServiceId) -> Self {
        Self::MissingCollaborator { kind, service }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Intercept(_) => FailureKind::Intercept,
            Self::Validation(_) => FailureKind::Validation,
            Self::Conversion(_) => FailureKind::Conversion,
            Self::ServiceInvocation(_) => FailureKind::ServiceInvocation,
            Self::MissingCollaborator { .. } => FailureKind::Configuration,
            Self::Unclassified(_) => FailureKind::Unclassified,
        }
    }

    #[must_use]
    pub fn detail_message(&self) -> &'static str {
        self.kind().detail_message()
    }

    /// Classifies a collaborator error.
    ///
    /// An error that already is a `GatewayError` keeps its category; any other
    /// error is wrapped in `fallback`. A `Configuration` fallback has no cause
    /// slot and degrades to `Unclassified`.
    #[must_use]
    pub fn classify(err: anyhow::Error, fallback: FailureKind) -> Self {
        match err.downcast::<GatewayError>() {
            Ok(typed) => typed,
            Err(cause) => match fallback {
                FailureKind::Intercept => Self::Intercept(cause),
                FailureKind::Validation => Self::Validation(cause),
                FailureKind::Conversion => Self::Conversion(cause),
                FailureKind::ServiceInvocation => Self::ServiceInvocation(cause),
                FailureKind::Configuration | FailureKind::Unclassified => {
                    Self::Unclassified(cause)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::types::service_ids;

    fn arb_stage_kind() -> impl Strategy<Value = FailureKind> {
        prop_oneof![
            Just(FailureKind::Intercept),
            Just(FailureKind::Validation),
            Just(FailureKind::Conversion),
            Just(FailureKind::ServiceInvocation),
            Just(FailureKind::Unclassified),
        ]
    }

    proptest! {
        #[test]
        fn untyped_cause_always_lands_in_fallback(message in ".{0,64}", fallback in arb_stage_kind()) {
            let err = GatewayError::classify(anyhow::Error::msg(message), fallback);
            prop_assert_eq!(err.kind(), fallback);
            prop_assert_eq!(err.detail_message(), fallback.detail_message());
        }
    }

    #[test]
    fn untyped_errors_take_the_fallback_category() {
        let err = GatewayError::classify(anyhow::anyhow!("socket closed"), FailureKind::ServiceInvocation);
        assert_eq!(err.kind(), FailureKind::ServiceInvocation);
        assert_eq!(err.detail_message(), detail::SERVICE_INVOCATION);
    }

    #[test]
    fn typed_errors_keep_their_category() {
        let raw: anyhow::Error = GatewayError::validation("page size too large").into();
        let err = GatewayError::classify(raw, FailureKind::Intercept);
        assert_eq!(err.kind(), FailureKind::Validation);
    }

    #[test]
    fn typed_errors_survive_added_context() {
        let raw = anyhow::Error::from(GatewayError::intercept("forbidden")).context("while enriching");
        let err = GatewayError::classify(raw, FailureKind::Unclassified);
        assert_eq!(err.kind(), FailureKind::Intercept);
    }

    #[test]
    fn configuration_fallback_degrades_to_unclassified() {
        let err = GatewayError::classify(anyhow::anyhow!("boom"), FailureKind::Configuration);
        assert_eq!(err.kind(), FailureKind::Unclassified);
    }

    #[test]
    fn missing_collaborator_is_a_configuration_fault() {
        let err = GatewayError::missing(CollaboratorKind::Validator, service_ids::SEARCH);
        assert_eq!(err.kind(), FailureKind::Configuration);
        assert_eq!(err.detail_message(), detail::CONFIGURATION);
        assert_eq!(err.to_string(), "no validator registered for service `search`");
    }

    #[test]
    fn detail_message_never_contains_the_cause() {
        let err = GatewayError::conversion("column `secret_token` missing");
        assert!(!err.detail_message().contains("secret_token"));
        assert!(err.to_string().contains("secret_token"));
    }

    #[test]
    fn every_kind_has_a_distinct_message() {
        let kinds = [
            FailureKind::Intercept,
            FailureKind::Validation,
            FailureKind::Conversion,
            FailureKind::ServiceInvocation,
            FailureKind::Configuration,
            FailureKind::Unclassified,
        ];
        let mut messages: Vec<_> = kinds.iter().map(|k| k.detail_message()).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());
    }
}
