//! Authorization gate for the Blossom blob server.
//!
//! Requests carry a signed Nostr event (kind 24242) in an
//! `Authorization: Nostr <base64>` header. The gate decodes it and runs it
//! through a pipeline of stages (pubkey format, time window, action scope,
//! signature) and produces an [`AuthDecision`] with a full audit trail.
//!
//! # Quick Start
//!
//! ```rust
//! use blossom_crypto::SigningKey;
//! use blossom_gate::{AuthEvent, AuthGate, AuthRequest, GateConfig, Tag, Tags};
//!
//! let key = SigningKey::from_bytes(&[7u8; 32]).unwrap();
//! let now = 1_700_000_000;
//! let tags = Tags::new(vec![
//!     Tag::new("t", "get"),
//!     Tag::new("expiration", (now + 60).to_string()),
//! ]);
//! let event = AuthEvent::sign(&key, 24242, now, tags, "Get blobs").unwrap();
//! let header = event.to_header().unwrap();
//!
//! let gate = AuthGate::with_default_stages(GateConfig::default());
//! let decision = gate.validate_at(Some(&header), AuthRequest::new("get"), now);
//! assert!(decision.is_valid());
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod gate;
pub mod stage;
pub mod stages;

// Re-exports for convenience.
pub use config::{GateConfig, BLOSSOM_AUTH_KIND};
pub use error::{GateError, GateResult};
pub use event::{AuthEvent, Tag, Tags, AUTH_SCHEME};
pub use gate::{AuthDecision, AuthGate};
pub use stage::{AuthRequest, AuthStage, GateContext, StageDecision, StageResult};
pub use stages::{ActionStage, ExpiryStage, PubkeyStage, SignatureStage};
