use std::time::Duration;

use blossom_types::{AuthErrorKind, UnixSeconds};

use crate::config::GateConfig;
use crate::error::GateError;
use crate::event::AuthEvent;

// ---------------------------------------------------------------------------
// AuthRequest
// ---------------------------------------------------------------------------

/// What the caller needs the credential to authorize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthRequest<'a> {
    /// Required `t` tag value: `upload`, `get`, `delete`, ...
    pub action: &'a str,
    /// Required `x` tag value, when the operation targets a known blob.
    pub required_hash: Option<&'a str>,
}

impl<'a> AuthRequest<'a> {
    pub fn new(action: &'a str) -> Self {
        Self {
            action,
            required_hash: None,
        }
    }

    pub fn with_hash(mut self, hash: &'a str) -> Self {
        self.required_hash = Some(hash);
        self
    }
}

// ---------------------------------------------------------------------------
// StageDecision
// ---------------------------------------------------------------------------

/// The outcome of a single stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// The stage passed; proceed to the next stage.
    Pass,
    /// The stage failed; the credential is rejected.
    Fail { kind: AuthErrorKind, reason: String },
}

impl StageDecision {
    pub fn fail(kind: AuthErrorKind, reason: impl Into<String>) -> Self {
        Self::Fail {
            kind,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the decision is `Pass`.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    /// Name of the stage that produced this result.
    pub stage_name: String,
    /// Whether the stage passed.
    pub passed: bool,
    /// Optional reason (populated on failure).
    pub reason: Option<String>,
    /// Wall-clock time the stage took to evaluate.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// GateContext
// ---------------------------------------------------------------------------

/// Contextual information available to every stage.
pub struct GateContext<'a> {
    pub config: &'a GateConfig,
    pub request: AuthRequest<'a>,
    /// Reference "now" for all time checks in this evaluation.
    pub now: UnixSeconds,
}

impl<'a> GateContext<'a> {
    pub fn new(config: &'a GateConfig, request: AuthRequest<'a>, now: UnixSeconds) -> Self {
        Self {
            config,
            request,
            now,
        }
    }
}

// ---------------------------------------------------------------------------
// AuthStage trait
// ---------------------------------------------------------------------------

/// A single check in the authorization pipeline.
///
/// Stages run in order against an already-decoded event. The trait is
/// object-safe and `Send + Sync` so stages can be stored in a
/// `Vec<Box<dyn AuthStage>>`. An `Err` is treated as a failure with the
/// error's [`GateError::kind`].
pub trait AuthStage: Send + Sync {
    /// Human-readable name of this stage (e.g., "pubkey", "signature").
    fn name(&self) -> &str;

    /// Check the event and return a decision.
    fn evaluate(&self, event: &AuthEvent, context: &GateContext<'_>)
        -> Result<StageDecision, GateError>;
}
