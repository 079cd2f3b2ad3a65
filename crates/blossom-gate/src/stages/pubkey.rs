use blossom_types::AuthErrorKind;

use crate::error::GateError;
use crate::event::{is_lower_hex, AuthEvent};
use crate::stage::{AuthStage, GateContext, StageDecision};

/// Public key format stage.
///
/// The `pubkey` field must be a 64-char lowercase hex x-only key.
pub struct PubkeyStage;

impl AuthStage for PubkeyStage {
    fn name(&self) -> &str {
        "pubkey"
    }

    fn evaluate(
        &self,
        event: &AuthEvent,
        _context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        if !is_lower_hex(&event.pubkey, 64) {
            return Ok(StageDecision::fail(
                AuthErrorKind::InvalidFormat,
                "pubkey must be 64 lowercase hex characters",
            ));
        }
        Ok(StageDecision::Pass)
    }
}
