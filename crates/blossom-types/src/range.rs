//! HTTP byte-range resolution for single-range requests.
//!
//! Only the `bytes=<start>-[<end>]` form is accepted. Suffix ranges
//! (`bytes=-500`) and multi-range lists are treated as no range at all, so
//! callers fall back to serving the full content.

use std::fmt;

use serde::{Deserialize, Serialize};

const UNIT_PREFIX: &str = "bytes=";

/// An inclusive byte range `[start, end]` within a resource.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered (the range is inclusive).
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a resource of `total` bytes.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }

    /// Resolve a `Range` header against a resource of `total_size` bytes.
    ///
    /// Returns `None` for anything that is not a satisfiable single range:
    /// malformed text, a comma-separated list, `start >= total_size`, or
    /// `start > end`. An omitted or oversized `end` is clamped to the last
    /// byte.
    pub fn parse(header: &str, total_size: u64) -> Option<Self> {
        let spec = header.trim().strip_prefix(UNIT_PREFIX)?;
        if spec.contains(',') {
            return None;
        }
        let (start_text, end_text) = spec.split_once('-')?;

        let start = parse_digits(start_text)?;
        if start >= total_size {
            return None;
        }

        let last = total_size - 1;
        let end = if end_text.is_empty() {
            last
        } else {
            parse_digits(end_text)?.min(last)
        };

        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    /// Re-check a range that came from an untrusted source.
    pub fn is_valid(&self, total_size: u64) -> bool {
        self.start <= self.end && self.end < total_size
    }
}

/// Strict unsigned decimal: no sign, no whitespace, no empty string.
fn parse_digits(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteRange({}-{})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn r(start: u64, end: u64) -> Option<ByteRange> {
        Some(ByteRange::new(start, end))
    }

    #[test]
    fn single_byte() {
        assert_eq!(ByteRange::parse("bytes=0-0", 100), r(0, 0));
    }

    #[test]
    fn start_beyond_size() {
        assert_eq!(ByteRange::parse("bytes=200-250", 100), None);
        assert_eq!(ByteRange::parse("bytes=100-", 100), None);
    }

    #[test]
    fn start_after_end() {
        assert_eq!(ByteRange::parse("bytes=50-25", 100), None);
    }

    #[test]
    fn open_ended() {
        assert_eq!(ByteRange::parse("bytes=0-", 100), r(0, 99));
        assert_eq!(ByteRange::parse("bytes=90-", 100), r(90, 99));
    }

    #[test]
    fn end_is_clamped() {
        assert_eq!(ByteRange::parse("bytes=0-150", 100), r(0, 99));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        assert_eq!(ByteRange::parse("  bytes=2-4 ", 10), r(2, 4));
    }

    #[test]
    fn malformed_inputs() {
        for header in [
            "",
            "bytes=",
            "bytes=-",
            "bytes=-5",
            "bytes=a-5",
            "bytes=1-b",
            "bytes=+1-5",
            "bytes=-1-5",
            "bytes= 1-5",
            "bytes=0-1,3-4",
            "items=0-5",
            "0-5",
            "bytes=99999999999999999999999-",
        ] {
            assert_eq!(ByteRange::parse(header, 100), None, "header {header:?}");
        }
    }

    #[test]
    fn empty_resource_has_no_ranges() {
        assert_eq!(ByteRange::parse("bytes=0-", 0), None);
        assert_eq!(ByteRange::parse("bytes=0-0", 0), None);
    }

    #[test]
    fn length_and_content_range() {
        let range = ByteRange::new(2, 4);
        assert_eq!(range.length(), 3);
        assert_eq!(range.content_range(10), "bytes 2-4/10");
    }

    #[test]
    fn is_valid_checks_bounds() {
        assert!(ByteRange::new(0, 99).is_valid(100));
        assert!(!ByteRange::new(0, 100).is_valid(100));
        assert!(!ByteRange::new(5, 4).is_valid(100));
        assert!(!ByteRange::new(0, 0).is_valid(0));
    }

    proptest! {
        #[test]
        fn parsed_ranges_are_always_valid(
            start in 0u64..1_000,
            end in proptest::option::of(0u64..2_000),
            total in 0u64..1_000,
        ) {
            let header = match end {
                Some(e) => format!("bytes={start}-{e}"),
                None => format!("bytes={start}-"),
            };
            if let Some(range) = ByteRange::parse(&header, total) {
                prop_assert!(range.is_valid(total));
                prop_assert_eq!(range.start, start);
                prop_assert!(range.length() <= total - start);
            }
        }

        #[test]
        fn multi_range_never_resolves(a in 0u64..50, b in 50u64..100) {
            let header = format!("bytes={a}-{b},{b}-");
            prop_assert_eq!(ByteRange::parse(&header, 100), None);
        }
    }
}
