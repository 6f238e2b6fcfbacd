//! Token estimation.
//!
//! Provider limits are configured in chars; logs and budget checks report the
//! approximate token count using the common 4-chars-per-token heuristic.

use crate::chunker::char_len;

/// Approximate chars per token for English prose.
pub const CHARS_PER_TOKEN: f64 = 4.0;

/// Estimate tokens for a char count (rounded to nearest).
pub fn estimate_tokens_from_chars(chars: usize) -> usize {
    (chars as f64 / CHARS_PER_TOKEN).round() as usize
}

/// Estimate tokens for a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    estimate_tokens_from_chars(char_len(text))
}
