use serde::{Deserialize, Serialize};

/// Event kind reserved for Blossom authorization events.
pub const BLOSSOM_AUTH_KIND: u64 = 24242;

/// Configuration for the authorization gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Event kind an authorization event must carry.
    pub auth_kind: u64,
    /// How far `created_at` may sit in the future before the event is refused.
    pub max_clock_skew_secs: u64,
    /// When `true`, the event `id` must equal the canonical digest of the
    /// event body before the signature over it is trusted.
    pub verify_event_id: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            auth_kind: BLOSSOM_AUTH_KIND,
            max_clock_skew_secs: 60,
            verify_event_id: true,
        }
    }
}

impl GateConfig {
    /// Signature-only checking, for clients that sign ids they did not
    /// derive canonically.
    pub fn lenient() -> Self {
        Self {
            verify_event_id: false,
            ..Default::default()
        }
    }
}
