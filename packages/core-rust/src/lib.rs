//! MSE Core: service identifiers, stage contracts, execution context, and the
//! gateway failure taxonomy.

pub mod context;
pub mod error;
pub mod response;
pub mod timing;
pub mod traits;
pub mod types;

pub use context::ExecutionContext;
pub use error::{detail, FailureKind, GatewayError};
pub use response::{BaseResponse, GatewayResponse, ResponseContext};
pub use timing::{Stage, StageTimings};
pub use traits::{CollaboratorKind, Converter, Interceptor, ProxyInvoker, Validator};
pub use types::{methods, service_ids, GatewayMethod, ServiceId};
