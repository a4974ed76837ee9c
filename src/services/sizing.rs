//! Size resolution
//!
//! Requested pixel sizes are attacker-controlled and arbitrary; every request
//! is normalized to one of a fixed ascending set of bucket sizes so the cache
//! key space stays bounded. A requested size of exactly 0 means "the original
//! image, unresized" and is never bucket-cached.

use crate::error::{AppError, Result};

/// Bucket sizes thumbnails may be generated at, ascending.
pub const SUPPORTED_SIZES: [u32; 8] = [32, 64, 128, 256, 512, 1024, 2048, 4096];

/// A requested size after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedSize {
    /// Full-resolution passthrough (requested size 0).
    Original,
    /// One of `SUPPORTED_SIZES`.
    Bucket(u32),
}

impl ResolvedSize {
    pub fn bucket(&self) -> Option<u32> {
        match self {
            Self::Original => None,
            Self::Bucket(px) => Some(*px),
        }
    }
}

/// Normalize a requested size to the smallest supported bucket that covers
/// it, or the largest bucket when the request exceeds all of them.
pub fn resolve_size(requested: u32) -> ResolvedSize {
    if requested == 0 {
        return ResolvedSize::Original;
    }

    let bucket = SUPPORTED_SIZES
        .iter()
        .find(|&&size| size >= requested)
        .copied()
        .unwrap_or(SUPPORTED_SIZES[SUPPORTED_SIZES.len() - 1]);

    ResolvedSize::Bucket(bucket)
}

/// Parse and normalize the size path segment.
///
/// Any numeric request is honored; values beyond `u32` saturate and clamp to
/// the largest bucket like every other oversized request.
pub fn parse_size(raw: &str) -> Result<ResolvedSize> {
    let requested: u64 = raw
        .parse()
        .map_err(|_| AppError::InvalidSize("Invalid size.".to_string()))?;

    Ok(resolve_size(requested.min(u32::MAX as u64) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_original() {
        assert_eq!(resolve_size(0), ResolvedSize::Original);
    }

    #[test]
    fn test_rounds_up_to_next_bucket() {
        assert_eq!(resolve_size(1), ResolvedSize::Bucket(32));
        assert_eq!(resolve_size(60), ResolvedSize::Bucket(64));
        assert_eq!(resolve_size(120), ResolvedSize::Bucket(128));
        assert_eq!(resolve_size(129), ResolvedSize::Bucket(256));
    }

    #[test]
    fn test_exact_match_resolves_to_itself() {
        for size in SUPPORTED_SIZES {
            assert_eq!(resolve_size(size), ResolvedSize::Bucket(size));
        }
    }

    #[test]
    fn test_above_max_clamps_to_max() {
        assert_eq!(resolve_size(4097), ResolvedSize::Bucket(4096));
        assert_eq!(resolve_size(u32::MAX), ResolvedSize::Bucket(4096));
    }

    #[test]
    fn test_resolved_is_always_supported() {
        for requested in 1..5000u32 {
            match resolve_size(requested) {
                ResolvedSize::Bucket(px) => {
                    assert!(SUPPORTED_SIZES.contains(&px));
                    // Smallest bucket covering the request.
                    if px > SUPPORTED_SIZES[0] && requested <= 4096 {
                        let idx = SUPPORTED_SIZES.iter().position(|&s| s == px).unwrap();
                        assert!(SUPPORTED_SIZES[idx - 1] < requested);
                    }
                }
                ResolvedSize::Original => panic!("non-zero size resolved to original"),
            }
        }
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_size("abc").is_err());
        assert!(parse_size("-1").is_err());
        assert!(parse_size("12.5").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn test_parse_ok() {
        assert_eq!(parse_size("60").unwrap(), ResolvedSize::Bucket(64));
        assert_eq!(parse_size("0").unwrap(), ResolvedSize::Original);
    }

    #[test]
    fn test_parse_beyond_u32_clamps_to_max_bucket() {
        assert_eq!(parse_size("5000000000").unwrap(), ResolvedSize::Bucket(4096));
        // u64::MAX still resolves; only non-numeric input is invalid.
        assert_eq!(
            parse_size("18446744073709551615").unwrap(),
            ResolvedSize::Bucket(4096)
        );
    }
}
