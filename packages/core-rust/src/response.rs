use serde::{Deserialize, Serialize};

/// Outbound payload contract.
///
/// Every pipeline outcome, success or failure, is expressed through the
/// success flag and the message field. The gateway never inspects anything
/// else on a response.
pub trait GatewayResponse {
    fn is_success(&self) -> bool;

    fn message(&self) -> Option<&str>;

    fn set_success(&mut self, success: bool);

    fn set_message(&mut self, message: String);

    /// Marks the response as failed with a user-facing message.
    fn mark_failed(&mut self, message: &str) {
        self.set_success(false);
        self.set_message(message.to_string());
    }
}

/// Success flag and message, meant to be embedded in concrete responses with
/// `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BaseResponse {
    /// A successful response with no message.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }
}

impl GatewayResponse for BaseResponse {
    fn is_success(&self) -> bool {
        self.success
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn set_success(&mut self, success: bool) {
        self.success = success;
    }

    fn set_message(&mut self, message: String) {
        self.message = Some(message);
    }
}

/// Result envelope returned by a proxy invoker.
///
/// A downstream service can answer with a business-level failure (`success`
/// false plus a code) without that being a gateway error; the converter
/// decides how to surface it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseContext<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ResponseContext<T> {
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            code: None,
            message: None,
            data: Some(data),
        }
    }

    #[must_use]
    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code.into()),
            message: Some(message.into()),
            data: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}
