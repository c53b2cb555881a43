/// Payload Codec - wire encoding for source, stdin and result channels
///
/// **Format:**
/// Standard base64 alphabet with padding, applied to the UTF-8 bytes of the text.
///
/// **Properties:**
/// - Lossless: `decode(&encode(s)) == s` for every string, including the empty one
/// - Pure: no I/O, no shared state
/// - Decoding ignores ASCII whitespace, since the execution backend wraps long
///   payloads across several lines
/// - Invalid input fails with `MalformedPayload`, never with a lower-level error

use crate::error::ClientError;
use base64::{engine::general_purpose, Engine as _};

pub fn encode(text: &str) -> String {
    general_purpose::STANDARD.encode(text.as_bytes())
}

pub fn decode(wire: &str) -> Result<String, ClientError> {
    let compact: String = wire.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ClientError::MalformedPayload(format!("invalid base64: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| ClientError::MalformedPayload(format!("decoded bytes are not UTF-8: {}", e)))
}
