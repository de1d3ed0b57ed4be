//! Tower middleware layers around the gateway entrance.
//!
//! - [`load_shed`]: Semaphore-based concurrency limiting
//! - [`timeout`]: Whole-call timeout enforcement
//! - [`metrics`]: Call timing and counting via `tracing` spans and `metrics`
//! - [`pipeline`]: Composes all layers into a single service stack
//!
//! Every layer keeps the entrance contract: the error type is `Infallible`
//! and each outcome is a response value.

pub mod load_shed;
pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use load_shed::{LoadShedLayer, OVERLOADED_MESSAGE};
pub use metrics::MetricsLayer;
pub use pipeline::build_gateway_pipeline;
pub use timeout::{TimeoutLayer, TIMED_OUT_MESSAGE};
