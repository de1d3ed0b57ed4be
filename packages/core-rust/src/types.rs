use std::fmt;

use serde::Serialize;

/// Identifier of a business capability whose collaborators are registered
/// with the gateway (e.g. `"search"`).
///
/// Identifiers are compile-time constants; the full set is known at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ServiceId(&'static str);

impl ServiceId {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Well-known service identifiers.
pub mod service_ids {
    use super::ServiceId;

    pub const SEARCH: ServiceId = ServiceId::new("search");
}

/// A public gateway method bound to the service that handles it.
///
/// The method name is what callers see; collaborators are always resolved
/// through [`GatewayMethod::service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GatewayMethod {
    name: &'static str,
    service: ServiceId,
}

impl GatewayMethod {
    #[must_use]
    pub const fn new(name: &'static str, service: ServiceId) -> Self {
        Self { name, service }
    }

    /// Public method name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Service whose collaborators handle this method.
    #[must_use]
    pub const fn service(&self) -> ServiceId {
        self.service
    }
}

impl fmt::Display for GatewayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.service)
    }
}

/// Well-known gateway methods.
pub mod methods {
    use super::{service_ids, GatewayMethod};

    pub const SEARCH: GatewayMethod = GatewayMethod::new("search", service_ids::SEARCH);
}
