//! Built-in authorization stages, in the order the default gate runs them.

pub mod action;
pub mod expiry;
pub mod pubkey;
pub mod signature;

pub use action::ActionStage;
pub use expiry::ExpiryStage;
pub use pubkey::PubkeyStage;
pub use signature::SignatureStage;
