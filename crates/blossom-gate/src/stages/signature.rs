use blossom_crypto::{Signature, VerifyingKey};
use blossom_types::AuthErrorKind;

use crate::error::GateError;
use crate::event::{decode_digest, is_lower_hex, AuthEvent};
use crate::stage::{AuthStage, GateContext, StageDecision};

/// BIP-340 signature stage.
///
/// `sig` must be 128 lowercase hex characters and verify over the 32-byte
/// event `id` under `pubkey`. With `verify_event_id` on, the `id` must also
/// be the canonical digest of the event.
pub struct SignatureStage;

impl AuthStage for SignatureStage {
    fn name(&self) -> &str {
        "signature"
    }

    fn evaluate(
        &self,
        event: &AuthEvent,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        if !is_lower_hex(&event.sig, 128) {
            return Ok(StageDecision::fail(
                AuthErrorKind::InvalidSignature,
                "sig must be 128 lowercase hex characters",
            ));
        }

        let digest = match decode_digest(&event.id) {
            Some(digest) if is_lower_hex(&event.id, 64) => digest,
            _ => {
                return Ok(StageDecision::fail(
                    AuthErrorKind::InvalidSignature,
                    "id must be 64 lowercase hex characters",
                ))
            }
        };

        if context.config.verify_event_id && event.id != event.compute_id() {
            return Ok(StageDecision::fail(
                AuthErrorKind::InvalidSignature,
                "id does not match event content",
            ));
        }

        let key = VerifyingKey::from_hex(&event.pubkey)?;
        let signature = Signature::from_hex(&event.sig)?;
        key.verify_digest(&digest, &signature)?;

        Ok(StageDecision::Pass)
    }
}
