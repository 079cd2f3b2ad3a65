use blossom_types::AuthErrorKind;

use crate::error::GateError;
use crate::event::AuthEvent;
use crate::stage::{AuthStage, GateContext, StageDecision};

/// Time window stage.
///
/// Checks, in order:
/// - `created_at` is no further in the future than the configured skew
/// - an `expiration` tag exists and parses as unix seconds
/// - `expiration` is strictly after now
pub struct ExpiryStage;

impl AuthStage for ExpiryStage {
    fn name(&self) -> &str {
        "expiry"
    }

    fn evaluate(
        &self,
        event: &AuthEvent,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        let latest_allowed = context
            .now
            .saturating_add(context.config.max_clock_skew_secs);
        if event.created_at > latest_allowed {
            return Ok(StageDecision::fail(
                AuthErrorKind::TimestampFuture,
                format!(
                    "created_at {} is more than {}s ahead of server time",
                    event.created_at, context.config.max_clock_skew_secs
                ),
            ));
        }

        let Some(expiration) = event.expiration() else {
            return Ok(StageDecision::fail(
                AuthErrorKind::MissingTags,
                "missing or invalid expiration tag",
            ));
        };

        if expiration <= context.now {
            return Ok(StageDecision::fail(
                AuthErrorKind::Expired,
                format!("event expired at {expiration}"),
            ));
        }

        Ok(StageDecision::Pass)
    }
}
