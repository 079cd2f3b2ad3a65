//! Nostr authorization events and the `Authorization: Nostr <base64>` header.

use std::collections::BTreeMap;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use blossom_crypto::{ContentHasher, SigningKey};
use blossom_types::UnixSeconds;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};

/// Authorization scheme prefix, including the separating space.
pub const AUTH_SCHEME: &str = "Nostr ";

/// Standard alphabet. Encodes with padding, decodes with or without it.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// One event tag: `["name", "value", ...]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tag {
    pub name: String,
    pub values: Vec<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// First value after the name, if any.
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

impl From<Vec<String>> for Tag {
    fn from(mut parts: Vec<String>) -> Self {
        if parts.is_empty() {
            return Self {
                name: String::new(),
                values: Vec::new(),
            };
        }
        let name = parts.remove(0);
        Self {
            name,
            values: parts,
        }
    }
}

impl From<Tag> for Vec<String> {
    fn from(tag: Tag) -> Self {
        let mut parts = Vec::with_capacity(tag.values.len() + 1);
        parts.push(tag.name);
        parts.extend(tag.values);
        parts
    }
}

/// The tag list of an event. Tags without a value are ignored by lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(pub Vec<Tag>);

impl Tags {
    pub fn new(tags: Vec<Tag>) -> Self {
        Self(tags)
    }

    fn valued(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|t| t.value().map(|v| (t.name.as_str(), v)))
    }

    /// Value of the first tag named `name`.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.valued().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Whether any tag named `name` has `value` as its first value.
    pub fn contains(&self, name: &str, value: &str) -> bool {
        self.valued().any(|(n, v)| n == name && v == value)
    }

    /// Tag name to first-seen value.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for (name, value) in self.valued() {
            map.entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
        map
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AuthEvent
// ---------------------------------------------------------------------------

/// A signed Nostr event used as a request credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: UnixSeconds,
    pub kind: u64,
    pub tags: Tags,
    pub content: String,
    pub sig: String,
}

impl AuthEvent {
    /// Decode an `Authorization` header value.
    ///
    /// Checks, in order: scheme, base64, JSON object, `kind`, then the
    /// presence and types of the remaining fields. Content checks on the
    /// decoded event are left to the gate stages.
    pub fn from_header(header: Option<&str>, config: &GateConfig) -> GateResult<Self> {
        let header = header.filter(|h| !h.trim().is_empty()).ok_or(GateError::MissingHeader)?;
        let payload = header
            .strip_prefix(AUTH_SCHEME)
            .ok_or_else(|| GateError::InvalidScheme("expected 'Nostr'".into()))?
            .trim();
        if payload.is_empty() {
            return Err(GateError::InvalidScheme("missing event payload".into()));
        }

        let json = PAYLOAD_ENGINE.decode(payload)?;
        Self::from_json(&json, config)
    }

    /// Decode an event from its JSON bytes.
    pub fn from_json(json: &[u8], config: &GateConfig) -> GateResult<Self> {
        let value: Value = serde_json::from_slice(json)?;
        let object = value
            .as_object()
            .ok_or_else(|| GateError::field("event", "expected a JSON object"))?;

        match object.get("kind").and_then(Value::as_u64) {
            Some(kind) if kind == config.auth_kind => {}
            _ => {
                return Err(GateError::InvalidKind {
                    expected: config.auth_kind,
                })
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Canonical event id: SHA-256 of `[0, pubkey, created_at, kind, tags, content]`.
    pub fn compute_id(&self) -> String {
        let canonical = serde_json::json!([
            0,
            self.pubkey,
            self.created_at,
            self.kind,
            self.tags,
            self.content,
        ]);
        ContentHasher::hash(canonical.to_string().as_bytes()).to_hex()
    }

    /// Build and sign an event with `key`.
    pub fn sign(
        key: &SigningKey,
        kind: u64,
        created_at: UnixSeconds,
        tags: Tags,
        content: impl Into<String>,
    ) -> GateResult<Self> {
        let mut event = Self {
            id: String::new(),
            pubkey: key.verifying_key().to_hex(),
            created_at,
            kind,
            tags,
            content: content.into(),
            sig: String::new(),
        };
        event.id = event.compute_id();

        let digest = decode_digest(&event.id)
            .ok_or_else(|| GateError::field("id", "not a 32-byte hex digest"))?;
        event.sig = key.sign_digest(&digest)?.to_hex();
        Ok(event)
    }

    /// Value of the `expiration` tag as unix seconds.
    pub fn expiration(&self) -> Option<UnixSeconds> {
        self.tags
            .first_value("expiration")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Render as a complete `Authorization` header value.
    pub fn to_header(&self) -> GateResult<String> {
        let json = serde_json::to_vec(self)?;
        Ok(format!("{AUTH_SCHEME}{}", PAYLOAD_ENGINE.encode(json)))
    }
}

/// Decode a 64-char hex string into 32 bytes.
pub(crate) fn decode_digest(hex_str: &str) -> Option<[u8; 32]> {
    let mut out = [0u8; 32];
    hex::decode_to_slice(hex_str, &mut out).ok()?;
    Some(out)
}

/// Whether `s` is exactly `len` lowercase hex characters.
pub(crate) fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
