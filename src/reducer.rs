//! Head/tail content reduction.
//!
//! When a document needs more chunks than a provider will process, the middle
//! of the document is dropped: the first 70% of the budget comes from the
//! head, the remaining 30% from the tail, joined by [`ELISION_MARKER`].

use tracing::info;

use crate::chunker::char_len;

/// Marker inserted where content was removed.
pub const ELISION_MARKER: &str = "\n\n... [content reduced] ...\n\n";

/// Share of the budget taken from the start of the document.
pub const HEAD_RATIO: f64 = 0.7;

/// Stateless reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentReducer;

impl ContentReducer {
    /// Trim `text` to `target_size` chars of source content.
    ///
    /// The marker is not counted against `target_size`; use
    /// [`ContentReducer::budget_for`] to size a reduction that must fit a
    /// chunk budget including the marker.
    ///
    /// # Example
    ///
    /// ```
    /// use webnovel_summarizer::ContentReducer;
    ///
    /// let text = format!("{}{}", "a".repeat(100), "b".repeat(100));
    /// let reduced = ContentReducer::reduce(&text, 10);
    /// assert!(reduced.starts_with("aaaaaaa\n\n..."));
    /// assert!(reduced.ends_with("...\n\nbbb"));
    /// ```
    pub fn reduce(text: &str, target_size: usize) -> String {
        let len = char_len(text);
        if len <= target_size {
            return text.to_string();
        }

        let head_size = (target_size as f64 * HEAD_RATIO) as usize;
        let tail_size = target_size - head_size;

        info!(
            from_chars = len,
            to_chars = target_size,
            "Reducing content from {} to ~{} chars",
            len,
            target_size
        );

        let head: String = text.chars().take(head_size).collect();
        let tail: String = text.chars().skip(len - tail_size).collect();

        format!("{}{}{}", head, ELISION_MARKER, tail)
    }

    /// Source budget so that the reduced text, marker included, fits
    /// `chunk_size * max_chunks` chars.
    pub fn budget_for(chunk_size: usize, max_chunks: usize) -> usize {
        chunk_size
            .saturating_mul(max_chunks)
            .saturating_sub(char_len(ELISION_MARKER))
            .max(1)
    }
}
