//! Conversions for hex-encoded EVM words, as they appear in a debug trace.

use alloy_primitives::U256;
use hex::FromHexError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum UtilsError {
    #[error("Hex utils error {0}")]
    HexUtils(#[from] FromHexError),
    #[error("Unable to read {word} as a 256 bit word: {reason}")]
    InvalidWord { word: String, reason: String },
}

/// Converts bytes to 0x-prefixed hex string.
pub fn hex_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Converts 0x-prefixed hex string to bytes.
pub fn hex_decode<T: AsRef<str>>(string: T) -> Result<Vec<u8>, UtilsError> {
    Ok(hex::decode(strip_prefix(string.as_ref()))?)
}

/// Reads a hex word (e.g., "0x2710") as a big endian unsigned magnitude.
///
/// Digits without the 0x prefix are read as hex too. "0x" alone is zero.
pub fn decode_uint<T: AsRef<str>>(word: T) -> Result<U256, UtilsError> {
    let word = word.as_ref();
    let digits = strip_prefix(word);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| UtilsError::InvalidWord {
        word: word.to_string(),
        reason: e.to_string(),
    })
}

/// Reads a hex word as an offset or length.
///
/// Words too large for a usize saturate, so any window they describe is empty.
pub fn decode_usize<T: AsRef<str>>(word: T) -> Result<usize, UtilsError> {
    let value = decode_uint(word)?;
    let limbs = value.as_limbs();
    if limbs[1..].iter().any(|limb| *limb != 0) {
        return Ok(usize::MAX);
    }
    Ok(usize::try_from(limbs[0]).unwrap_or(usize::MAX))
}

/// Best effort UTF-8 reading of a hex payload (e.g., a revert message).
///
/// Revert payloads are often ABI encoded errors rather than text. Anything that is
/// not valid hex or valid UTF-8 results in an empty string.
pub fn decode_text<T: AsRef<str>>(payload: T) -> String {
    hex_decode(payload)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

/// Keeps the last 20 bytes of a stack word and pads to a full 0x-prefixed address.
pub fn word_to_address<T: AsRef<str>>(word: T) -> String {
    let digits = strip_prefix(word.as_ref());
    let low = match digits.len().checked_sub(40) {
        Some(start) => digits.get(start..).unwrap_or_default(),
        None => digits,
    };
    format!("0x{low:0>40}")
}

fn strip_prefix(string: &str) -> &str {
    string.strip_prefix("0x").unwrap_or(string)
}
