use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use blossom_types::{unix_now, AuthErrorKind, UnixSeconds};
use tracing::debug;

use crate::config::GateConfig;
use crate::event::AuthEvent;
use crate::stage::{AuthRequest, AuthStage, GateContext, StageDecision, StageResult};
use crate::stages::{ActionStage, ExpiryStage, PubkeyStage, SignatureStage};

// ---------------------------------------------------------------------------
// AuthDecision
// ---------------------------------------------------------------------------

/// The outcome of checking one `Authorization` header.
#[derive(Clone, Debug)]
pub struct AuthDecision {
    pub valid: bool,
    /// Hex public key of the signer, once decoding got that far.
    pub pubkey: Option<String>,
    /// The action that was requested.
    pub action: String,
    pub created_at: Option<UnixSeconds>,
    pub expiration: Option<UnixSeconds>,
    /// Tag name to first-seen value.
    pub tags: BTreeMap<String, String>,
    /// Why the credential was refused; `None` when valid.
    pub error_kind: Option<AuthErrorKind>,
    pub reason: Option<String>,
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    pub elapsed: Duration,
}

impl AuthDecision {
    fn rejected(action: &str, kind: AuthErrorKind, reason: String, started: Instant) -> Self {
        Self {
            valid: false,
            pubkey: None,
            action: action.to_string(),
            created_at: None,
            expiration: None,
            tags: BTreeMap::new(),
            error_kind: Some(kind),
            reason: Some(reason),
            stage_results: Vec::new(),
            elapsed: started.elapsed(),
        }
    }

    /// Returns `true` if the credential authorizes the request.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// First value of tag `name` on a decoded event.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// The failure kind, with `MissingAuth` for an unexplained rejection.
    pub fn failure(&self) -> Option<AuthErrorKind> {
        if self.valid {
            None
        } else {
            Some(self.error_kind.unwrap_or(AuthErrorKind::MissingAuth))
        }
    }
}

// ---------------------------------------------------------------------------
// AuthGate
// ---------------------------------------------------------------------------

/// The authorization gate: decodes a `Nostr` credential and runs it through
/// a pipeline of stages.
///
/// The gate only reports validity. Whether an operation needs a valid
/// decision is up to the caller.
pub struct AuthGate {
    stages: Vec<Box<dyn AuthStage>>,
    config: GateConfig,
}

impl AuthGate {
    /// Create a new gate with an empty pipeline.
    ///
    /// Use [`Self::add_stage`] to add stages, or
    /// [`Self::with_default_stages`] for the standard pipeline.
    pub fn new(config: GateConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Create a gate with the default pipeline:
    /// Pubkey -> Expiry -> Action -> Signature
    pub fn with_default_stages(config: GateConfig) -> Self {
        let mut gate = Self::new(config);
        gate.add_stage(Box::new(PubkeyStage));
        gate.add_stage(Box::new(ExpiryStage));
        gate.add_stage(Box::new(ActionStage));
        gate.add_stage(Box::new(SignatureStage));
        gate
    }

    /// Append a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Box<dyn AuthStage>) {
        self.stages.push(stage);
    }

    /// The current configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Check `header` against the current wall clock.
    pub fn validate(&self, header: Option<&str>, request: AuthRequest<'_>) -> AuthDecision {
        self.validate_at(header, request, unix_now())
    }

    /// Check `header` as of `now`.
    ///
    /// Decoding failures and the first failing stage short-circuit into a
    /// rejected decision. This never panics and never returns an error.
    pub fn validate_at(
        &self,
        header: Option<&str>,
        request: AuthRequest<'_>,
        now: UnixSeconds,
    ) -> AuthDecision {
        let pipeline_start = Instant::now();

        let event = match AuthEvent::from_header(header, &self.config) {
            Ok(event) => event,
            Err(e) => {
                debug!(action = request.action, kind = %e.kind(), error = %e, "Auth header rejected");
                return AuthDecision::rejected(request.action, e.kind(), e.to_string(), pipeline_start);
            }
        };

        let context = GateContext::new(&self.config, request, now);
        let mut stage_results = Vec::with_capacity(self.stages.len());
        let mut failure = None;

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(&event, &context).unwrap_or_else(|e| StageDecision::Fail {
                kind: e.kind(),
                reason: e.to_string(),
            });

            let result = StageResult {
                stage_name: stage.name().to_string(),
                passed: decision.is_pass(),
                reason: match &decision {
                    StageDecision::Pass => None,
                    StageDecision::Fail { reason, .. } => Some(reason.clone()),
                },
                elapsed: stage_start.elapsed(),
            };
            stage_results.push(result);

            // Fail-fast: stop on first failure.
            if let StageDecision::Fail { kind, reason } = decision {
                debug!(stage = stage.name(), action = request.action, %kind, %reason, "Auth event rejected");
                failure = Some((kind, reason));
                break;
            }
        }

        let (error_kind, reason) = match failure {
            Some((kind, reason)) => (Some(kind), Some(reason)),
            None => (None, None),
        };

        AuthDecision {
            valid: error_kind.is_none(),
            pubkey: Some(event.pubkey.clone()),
            action: request.action.to_string(),
            created_at: Some(event.created_at),
            expiration: event.expiration(),
            tags: event.tags.to_map(),
            error_kind,
            reason,
            stage_results,
            elapsed: pipeline_start.elapsed(),
        }
    }
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::with_default_stages(GateConfig::default())
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}
