//! Liveness probe payload.

use serde::{Deserialize, Serialize};

/// Status reported by a healthy service.
pub const STATUS_OK: &str = "ok";

/// Response to a liveness ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    /// Always `"ok"` when the service answers
    pub status: String,
    /// Configured service name
    pub service: String,
}

impl PingResponse {
    /// Healthy response for `service`.
    #[must_use]
    pub fn ok(service: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            service: service.into(),
        }
    }
}
