//! Global-id codec
//!
//! Client-facing entity references are opaque base64 strings embedding a
//! type name and a raw key, `base64("TypeName:raw_key")`. Decoding is the
//! first step of every resolve call; nothing about the key itself is
//! validated here beyond the shape.

use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Decode an opaque id into its (type name, raw key) parts.
pub fn decode_global_id(opaque_id: &str) -> Result<(String, String)> {
    let decoded = STANDARD
        .decode(opaque_id)
        .map_err(|_| AppError::InvalidId("Cannot decode the provided ID.".to_string()))?;

    let decoded = String::from_utf8(decoded)
        .map_err(|_| AppError::InvalidId("Cannot decode the provided ID.".to_string()))?;

    match decoded.split_once(':') {
        Some((type_name, raw_key)) if !type_name.is_empty() && !raw_key.is_empty() => {
            Ok((type_name.to_string(), raw_key.to_string()))
        }
        _ => Err(AppError::InvalidId(
            "Cannot decode the provided ID.".to_string(),
        )),
    }
}

/// Encode a (type name, raw key) pair into an opaque id.
pub fn encode_global_id(type_name: &str, raw_key: &str) -> String {
    STANDARD.encode(format!("{}:{}", type_name, raw_key))
}
