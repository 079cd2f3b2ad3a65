use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the UNIX epoch. Used for upload, access, and credential
/// timestamps alike.
pub type UnixSeconds = u64;

/// Current wall-clock time in whole seconds since the UNIX epoch.
///
/// A clock set before 1970 reads as zero rather than failing.
pub fn unix_now() -> UnixSeconds {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
