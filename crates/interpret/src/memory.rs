//! Reads byte ranges out of the memory snapshot attached to a trace step.
//!
//! The snapshot is a list of fixed width hex words (32 bytes each for geth). Offsets
//! come from the stack of the step and are trusted: a range past the end of the
//! snapshot is truncated rather than rejected.

/// Reads `byte_count` bytes starting at `byte_offset` as a 0x-prefixed hex string.
///
/// Only the words that overlap the range are visited.
pub fn read_bytes<T: AsRef<str>>(words: &[T], byte_offset: usize, byte_count: usize) -> String {
    let start = byte_offset.saturating_mul(2);
    let end = start.saturating_add(byte_count.saturating_mul(2));

    let mut data = String::with_capacity(end.saturating_sub(start).min(1 << 16) + 2);
    data.push_str("0x");

    let mut position = 0usize;
    for word in words {
        if position >= end {
            break;
        }
        let word = word.as_ref();
        let digits = word.strip_prefix("0x").unwrap_or(word);
        let word_end = position + digits.len();
        if word_end > start {
            let from = start.saturating_sub(position);
            let to = end.min(word_end) - position;
            data.push_str(digits.get(from..to).unwrap_or_default());
        }
        position = word_end;
    }
    data
}
