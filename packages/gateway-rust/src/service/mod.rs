//! Gateway service layer.
//!
//! 1. **Registry** (`registry`): per-service collaborator sets, swapped atomically
//! 2. **Entrance** (`entrance`): the five-stage call pipeline
//! 3. **Middleware** (`middleware`): Tower layers (load-shedding, timeout, metrics)
//! 4. **Domain services** (`domain`): concrete collaborator sets
//! 5. **Configuration** (`config`): gateway tunables

pub mod config;
pub mod domain;
pub mod entrance;
pub mod middleware;
pub mod registry;

// Re-export key types for convenient access.
pub use config::GatewayConfig;
pub use entrance::{GatewayCall, GatewayEntrance, GatewayFuture, GatewayOutcome};
pub use middleware::build_gateway_pipeline;
pub use registry::{Collaborators, RegistryBuilder, RegistryTable, ServiceRegistry};
