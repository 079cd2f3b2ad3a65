use blossom_types::AuthErrorKind;

use crate::error::GateError;
use crate::event::AuthEvent;
use crate::stage::{AuthStage, GateContext, StageDecision};

/// Scope stage: the event must name the requested action in a `t` tag and,
/// when the caller targets a specific blob, its hash in an `x` tag.
pub struct ActionStage;

impl AuthStage for ActionStage {
    fn name(&self) -> &str {
        "action"
    }

    fn evaluate(
        &self,
        event: &AuthEvent,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        let request = context.request;
        if !event.tags.contains("t", request.action) {
            return Ok(StageDecision::fail(
                AuthErrorKind::InvalidAction,
                format!("no 't' tag authorizing '{}'", request.action),
            ));
        }

        if let Some(hash) = request.required_hash {
            if !event.tags.contains("x", hash) {
                return Ok(StageDecision::fail(
                    AuthErrorKind::MissingTags,
                    format!("no 'x' tag for blob {hash}"),
                ));
            }
        }

        Ok(StageDecision::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::event::Tag;
    use crate::stage::AuthRequest;
    use crate::stages::fixtures::{event_with, upload_event, NOW};

    fn run(event: &AuthEvent, request: AuthRequest<'_>) -> StageDecision {
        let config = GateConfig::default();
        let ctx = GateContext::new(&config, request, NOW);
        ActionStage.evaluate(event, &ctx).unwrap()
    }

    #[test]
    fn matching_action_passes() {
        assert!(run(&upload_event(), AuthRequest::new("upload")).is_pass());
    }

    #[test]
    fn other_action_is_rejected() {
        match run(&upload_event(), AuthRequest::new("delete")) {
            StageDecision::Fail { kind, .. } => assert_eq!(kind, AuthErrorKind::InvalidAction),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn any_t_tag_may_match() {
        let event = event_with(NOW, vec![Tag::new("t", "get"), Tag::new("t", "delete")]);
        assert!(run(&event, AuthRequest::new("delete")).is_pass());
    }

    #[test]
    fn required_hash_needs_x_tag() {
        let hash = "ab".repeat(32);
        assert!(run(&upload_event(), AuthRequest::new("upload").with_hash(&hash)).is_pass());

        let other = "cd".repeat(32);
        match run(&upload_event(), AuthRequest::new("upload").with_hash(&other)) {
            StageDecision::Fail { kind, .. } => assert_eq!(kind, AuthErrorKind::MissingTags),
            other => panic!("unexpected {other:?}"),
        }
    }
}
