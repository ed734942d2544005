//! Base64 payload helpers.
//!
//! Hosts that only receive a base64 string from their image codec can
//! estimate the encoded byte size from its length:
//! `bytes = ceil(len * 3 / 4) - padding`. This is exact for well-formed
//! standard base64, but it is still an estimate of the *file* size, so
//! codecs that know the real byte count should report it instead.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Encode bytes as standard (padded) base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Estimate the decoded byte length of a base64 payload.
///
/// Trailing whitespace is ignored; at most two `=` padding characters count.
pub fn estimate_base64_bytes(payload: &str) -> usize {
    let payload = payload.trim_end();
    let padding = payload
        .bytes()
        .rev()
        .take_while(|&b| b == b'=')
        .take(2)
        .count();

    (payload.len() * 3).div_ceil(4).saturating_sub(padding)
}


// ============================================================================
// Property-Based Tests
// ============================================================================
