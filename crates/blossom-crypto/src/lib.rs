//! Cryptographic primitives for the Blossom blob server.
//!
//! Provides streaming SHA-256 content hashing and BIP-340 Schnorr signing
//! and verification over secp256k1 x-only keys.
//!
//! All crypto operations wrap established libraries - no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::ContentHasher;
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
