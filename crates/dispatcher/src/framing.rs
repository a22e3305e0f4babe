//! Line-delimited bulk framing
//!
//! Each record becomes a two-line unit: an action header naming the target
//! index, then the record's compact JSON body.

use bytes::{BufMut, BytesMut};
use contracts::ContractError;

const HEADER_PREFIX: &[u8] = br#"{"create":{"_index":""#;
const HEADER_SUFFIX: &[u8] = b"\"}}\n";

/// Reject routing keys that cannot be embedded verbatim in the header line.
///
/// A quote or backslash would break out of the JSON string; control
/// characters (newlines included) would break the line framing.
pub fn validate_routing_key(key: &str) -> Result<(), ContractError> {
    if key.chars().any(|c| c == '"' || c == '\\' || c.is_control()) {
        return Err(ContractError::invalid_routing_key(key));
    }
    Ok(())
}

/// Exact size of the unit `append_unit` would write
pub fn unit_len(key: &str, body: &[u8]) -> usize {
    HEADER_PREFIX.len() + key.len() + HEADER_SUFFIX.len() + body.len() + 1
}

/// Append one framing unit. `key` must already be validated and `body`
/// must not contain a newline (compact `serde_json` output never does).
pub fn append_unit(buf: &mut BytesMut, key: &str, body: &[u8]) {
    buf.reserve(unit_len(key, body));
    buf.put_slice(HEADER_PREFIX);
    buf.put_slice(key.as_bytes());
    buf.put_slice(HEADER_SUFFIX);
    buf.put_slice(body);
    buf.put_u8(b'\n');
}

/// Routing key of a header line as yielded by `FlushedBatch::units`
pub fn header_routing_key(header: &[u8]) -> Option<&str> {
    let suffix = &HEADER_SUFFIX[..HEADER_SUFFIX.len() - 1];
    let key = header.strip_prefix(HEADER_PREFIX)?.strip_suffix(suffix)?;
    std::str::from_utf8(key).ok()
}
