//! Base64 wrapping of poll API queries and responses.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde::de::DeserializeOwned;

use crate::errors::{parse_json, Result, StandingsError};

/// Encodes a query with the URL-safe alphabet, padding kept.
#[must_use]
pub fn encode(query: &str) -> String {
    URL_SAFE.encode(query.as_bytes())
}

/// Decodes a response body.
///
/// Both alphabets are accepted, characters outside the alphabet are
/// dropped and the padding is rebuilt. Invalid UTF-8 is replaced.
pub fn decode_text(body: &str) -> Result<String> {
    let mut cleaned: String = body
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();
    while cleaned.len() % 4 != 0 {
        cleaned.push('=');
    }
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| StandingsError::parse("poll api response", e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Decodes a response body into `T`.
pub fn decode<T: DeserializeOwned>(body: &str, context: &str) -> Result<T> {
    parse_json(&decode_text(body)?, context)
}
