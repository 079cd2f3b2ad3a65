use k256::schnorr;
use signature::hazmat::{PrehashSigner, PrehashVerifier};

/// BIP-340 signing key (secp256k1 secret scalar).
pub struct SigningKey(schnorr::SigningKey);

/// BIP-340 x-only public key.
#[derive(Clone)]
pub struct VerifyingKey(schnorr::VerifyingKey);

/// 64-byte BIP-340 Schnorr signature.
#[derive(Clone)]
pub struct Signature(schnorr::Signature);

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        Self(schnorr::SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Create from a raw 32-byte secret.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, SignatureError> {
        schnorr::SigningKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }

    /// Parse a 64-char hex secret.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = decode_fixed::<32>(s).ok_or(SignatureError::InvalidKey)?;
        Self::from_bytes(&bytes)
    }

    /// The corresponding x-only public key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key().clone())
    }

    /// Sign a 32-byte message digest (for Nostr, the event id).
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, SignatureError> {
        self.0
            .sign_prehash(digest)
            .map(Signature)
            .map_err(|_| SignatureError::SigningFailed)
    }
}

impl VerifyingKey {
    /// Create from a raw 32-byte x-only public key.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, SignatureError> {
        schnorr::VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }

    /// Parse a 64-char hex x-only public key.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = decode_fixed::<32>(s).ok_or(SignatureError::InvalidKey)?;
        Self::from_bytes(&bytes)
    }

    /// Raw x-only public key bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    /// Lowercase hex encoding, as used in Nostr `pubkey` fields.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verify a signature over a 32-byte message digest.
    pub fn verify_digest(
        &self,
        digest: &[u8; 32],
        signature: &Signature,
    ) -> Result<(), SignatureError> {
        self.0
            .verify_prehash(digest, &signature.0)
            .map_err(|_| SignatureError::InvalidSignature)
    }
}

impl Signature {
    /// Parse from 64 raw bytes.
    pub fn from_bytes(bytes: &[u8; 64]) -> Result<Self, SignatureError> {
        schnorr::Signature::try_from(&bytes[..])
            .map(Self)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Parse a 128-char hex signature.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = decode_fixed::<64>(s).ok_or(SignatureError::InvalidSignature)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// Decode exactly `N` bytes of hex.
fn decode_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut out = [0u8; N];
    hex::decode_to_slice(s, &mut out).ok()?;
    Some(out)
}

impl PartialEq for VerifyingKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for VerifyingKey {}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for Signature {}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", self.to_hex())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.to_bytes()[..8]))
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
    #[error("signing failed")]
    SigningFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32]).unwrap()
    }

    #[test]
    fn sign_and_verify() {
        let sk = test_key();
        let digest = [42u8; 32];
        let sig = sk.sign_digest(&digest).unwrap();
        assert!(sk.verifying_key().verify_digest(&digest, &sig).is_ok());
    }

    #[test]
    fn verify_fails_on_wrong_digest() {
        let sk = test_key();
        let sig = sk.sign_digest(&[1u8; 32]).unwrap();
        assert_eq!(
            sk.verifying_key().verify_digest(&[2u8; 32], &sig),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn verify_fails_with_wrong_key() {
        let sk1 = test_key();
        let sk2 = SigningKey::generate();
        let sig = sk1.sign_digest(&[9u8; 32]).unwrap();
        assert!(sk2.verifying_key().verify_digest(&[9u8; 32], &sig).is_err());
    }

    #[test]
    fn hex_roundtrips() {
        let sk = test_key();
        let vk = sk.verifying_key();
        let parsed = VerifyingKey::from_hex(&vk.to_hex()).unwrap();
        assert_eq!(parsed, vk);
        assert_eq!(vk.to_hex().len(), 64);

        let sig = sk.sign_digest(&[3u8; 32]).unwrap();
        assert_eq!(sig.to_hex().len(), 128);
        assert_eq!(Signature::from_hex(&sig.to_hex()).unwrap(), sig);
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert_eq!(
            VerifyingKey::from_hex("zz"),
            Err(SignatureError::InvalidKey)
        );
        assert_eq!(
            Signature::from_hex(&"ab".repeat(63)),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn zero_secret_is_rejected() {
        assert_eq!(
            SigningKey::from_bytes(&[0u8; 32]).unwrap_err(),
            SignatureError::InvalidKey
        );
    }

    #[test]
    fn debug_redacts_signing_key() {
        let debug = format!("{:?}", test_key());
        assert!(debug.contains("redacted"));
    }
}
