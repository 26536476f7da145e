//! Text-safe transport encoding.
//!
//! File bytes cross the host transport as standard-alphabet base64 with
//! padding and no line wrapping. Decoding is strict: any character outside
//! the alphabet, bad padding or trailing bits is an error, never silently
//! dropped.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::BridgeError;

/// Encode raw bytes for the transport. Deterministic for equal input.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode transport text back into raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, BridgeError> {
    Ok(STANDARD.decode(text)?)
}
