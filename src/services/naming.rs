//! Derivative storage naming
//!
//! Derivative paths are derived deterministically from the source path, the
//! resolved bucket and the output extension, so repeated generations of the
//! same triple land on the same object. The stem is bounded; overlong stems
//! are truncated and suffixed with a short digest of the full stem to stay
//! collision-resistant within an owner.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Maximum length of the derivative filename stem.
pub const MAX_STEM_LENGTH: usize = 55;

/// Directory prefix all derivatives are stored under.
const THUMBNAIL_PREFIX: &str = "thumbnails";

/// Hex digest chars appended when a stem is truncated.
const DIGEST_LENGTH: usize = 8;

/// Build the storage path for a derivative of `source_path` at `size` pixels
/// with the given file extension, e.g.
/// `thumbnails/category-backgrounds/background_thumbnail_64.png`.
///
/// The source's directory is kept in the derivative path; otherwise sources
/// of unrelated owners sharing a basename would collide on the same object.
pub fn derivative_path(source_path: &str, size: u32, extension: &str) -> String {
    let source = Path::new(source_path.trim_start_matches('/'));

    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let stem = bounded_stem(stem);

    match source.parent().and_then(|p| p.to_str()).filter(|p| !p.is_empty()) {
        Some(dir) => format!("{THUMBNAIL_PREFIX}/{dir}/{stem}_thumbnail_{size}.{extension}"),
        None => format!("{THUMBNAIL_PREFIX}/{stem}_thumbnail_{size}.{extension}"),
    }
}

/// Truncate an overlong stem, keeping a digest of the full stem so distinct
/// long names stay distinct.
fn bounded_stem(stem: &str) -> String {
    if stem.len() <= MAX_STEM_LENGTH {
        return stem.to_string();
    }

    let digest = Sha256::digest(stem.as_bytes());
    let digest_hex: String = digest
        .iter()
        .take(DIGEST_LENGTH / 2)
        .map(|b| format!("{:02x}", b))
        .collect();

    let keep = MAX_STEM_LENGTH - DIGEST_LENGTH - 1;
    let truncated: String = stem.chars().take(keep).collect();

    format!("{truncated}_{digest_hex}")
}
