//! Foundation types for the Blossom blob server.
//!
//! Every other crate in the workspace depends on `blossom-types`. Nothing in
//! here performs I/O.
//!
//! # Key Types
//!
//! - [`BlobHash`] - content-addressed identity (SHA-256, 64 lowercase hex)
//! - [`BlobRecord`] / [`AccessRecord`] - persisted metadata rows
//! - [`BlobDescriptor`] - upload response document
//! - [`ByteRange`] - validated, clamped single HTTP byte range
//! - [`ErrorKind`] / [`AuthErrorKind`] - outcome taxonomy for core operations

pub mod blob;
pub mod error;
pub mod hash;
pub mod kind;
pub mod range;
pub mod temporal;

pub use blob::{AccessRecord, BlobDescriptor, BlobRecord, DEFAULT_MIME_TYPE};
pub use error::TypeError;
pub use hash::{BlobHash, HASH_HEX_LEN};
pub use kind::{AuthErrorKind, ErrorKind};
pub use range::ByteRange;
pub use temporal::{unix_now, UnixSeconds};
