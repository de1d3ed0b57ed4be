use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Gateway-level configuration.
///
/// Controls payload audit logging and the limits enforced by the optional
/// middleware stack around the entrance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Identifier of this gateway node, attached to every call span.
    pub node_id: String,
    /// Log inbound request and outbound response payloads as JSON.
    pub log_payloads: bool,
    /// Upper bound for a whole call when `TimeoutLayer` is installed.
    pub call_timeout_ms: u64,
    /// Maximum number of in-flight calls before load shedding.
    pub max_concurrent_calls: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            log_payloads: true,
            call_timeout_ms: 30_000,
            max_concurrent_calls: 1000,
        }
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Loads a configuration from a JSON file. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading gateway config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing gateway config {}", path.display()))
    }
}
