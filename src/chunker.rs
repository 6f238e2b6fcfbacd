//! Boundary-aware text chunking.
//!
//! Oversized documents are cut into ordered pieces no longer than a target
//! size. Each cut prefers, in order:
//!
//! 1. the last paragraph break (`"\n\n"`) inside the window,
//! 2. the last sentence ending (`". "`, `"! "`, `"? "`, `"。"`, `"！"`, `"？"`),
//! 3. a hard cut at the target size.
//!
//! A natural break is only accepted when it starts beyond 60% of the target,
//! so every iteration consumes a large share of the window and the loop
//! always terminates. Sizes are counted in `char`s.
//!
//! The window ends exactly at the target. A two-char ending such as `". "`
//! whose space would be the first char past the target is not seen, so the
//! cut falls back to an earlier break or a hard cut. Chunks never exceed the
//! target either way.

use serde::{Deserialize, Serialize};

/// Paragraph separator preferred as a cut point.
pub const PARAGRAPH_BREAK: &str = "\n\n";

/// Sentence endings accepted as a fallback cut point.
pub const SENTENCE_ENDINGS: [&str; 6] = [". ", "! ", "? ", "。", "！", "？"];

/// Fraction of the target a natural break must exceed to be accepted.
pub const MIN_BREAK_RATIO: f64 = 0.6;

/// One ordered slice of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 1-based position in the document.
    pub index: usize,
    /// Trimmed chunk text.
    pub text: String,
    /// Length of `text` in chars.
    pub chars: usize,
}

impl Chunk {
    fn new(index: usize, text: &str) -> Self {
        Self {
            index,
            text: text.to_string(),
            chars: char_len(text),
        }
    }
}

/// Stateless splitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker;

impl Chunker {
    /// Split `text` into chunks of at most `target` chars at natural boundaries.
    ///
    /// # Example
    ///
    /// ```
    /// use webnovel_summarizer::Chunker;
    ///
    /// let text = format!("{}\n\n{}", "a".repeat(70), "b".repeat(70));
    /// let chunks = Chunker::split(&text, 100);
    /// assert_eq!(chunks.len(), 2);
    /// assert_eq!(chunks[0].text, "a".repeat(70));
    /// ```
    pub fn split(text: &str, target: usize) -> Vec<Chunk> {
        split_with(text, target, true)
    }

    /// Split `text` with hard cuts every `target` chars.
    ///
    /// Yields at most `ceil(len / target)` chunks.
    pub fn split_exact(text: &str, target: usize) -> Vec<Chunk> {
        split_with(text, target, false)
    }
}

/// Length of `text` in chars.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `n`-th char, or `None` when `text` has at most `n` chars.
fn byte_offset(text: &str, n: usize) -> Option<usize> {
    text.char_indices().nth(n).map(|(offset, _)| offset)
}

fn split_with(text: &str, target: usize, natural: bool) -> Vec<Chunk> {
    let target = target.max(1);
    let min_break = (target as f64 * MIN_BREAK_RATIO) as usize;

    let mut pieces: Vec<&str> = Vec::new();
    let mut remaining = text;

    if char_len(text) <= target {
        pieces.push(text);
    } else {
        while !remaining.is_empty() {
            let Some(limit) = byte_offset(remaining, target) else {
                pieces.push(remaining);
                break;
            };

            let window = &remaining[..limit];
            let cut = if natural {
                find_break(window, min_break).unwrap_or(limit)
            } else {
                limit
            };

            pieces.push(remaining[..cut].trim());
            remaining = remaining[cut..].trim();
        }
    }

    pieces
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .enumerate()
        .map(|(i, piece)| Chunk::new(i + 1, piece))
        .collect()
}

/// Byte offset just past the best natural break in `window`, if any.
fn find_break(window: &str, min_break: usize) -> Option<usize> {
    let beyond_min = |pos: usize| char_len(&window[..pos]) > min_break;

    if let Some(pos) = window.rfind(PARAGRAPH_BREAK) {
        if beyond_min(pos) {
            return Some(pos + PARAGRAPH_BREAK.len());
        }
    }

    SENTENCE_ENDINGS
        .iter()
        .filter_map(|ending| window.rfind(ending).map(|pos| (pos, pos + ending.len())))
        .max_by_key(|(pos, _)| *pos)
        .filter(|(pos, _)| beyond_min(*pos))
        .map(|(_, end)| end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = Chunker::split("A short chapter.", 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 1);
        assert_eq!(chunks[0].text, "A short chapter.");
        assert_eq!(chunks[0].chars, 16);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(Chunker::split("   \n\n  ", 100).is_empty());
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(70), "b".repeat(70));
        let chunks = Chunker::split(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "a".repeat(70));
        assert_eq!(chunks[1].text, "b".repeat(70));
        assert_eq!(chunks[1].index, 2);
    }

    #[test]
    fn test_early_paragraph_break_falls_back_to_sentence() {
        let text = format!(
            "{}\n\n{}. {}",
            "a".repeat(30),
            "b".repeat(40),
            "c".repeat(60)
        );
        let chunks = Chunker::split(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.ends_with("b."));
        assert_eq!(chunks[1].text, "c".repeat(60));
    }

    #[test]
    fn test_cjk_sentence_break() {
        for ending in ['。', '！', '？'] {
            let text = format!("{}{}{}", "甲".repeat(80), ending, "乙".repeat(50));
            let chunks = Chunker::split(&text, 100);
            assert_eq!(chunks.len(), 2, "ending {}", ending);
            assert!(chunks[0].text.ends_with(ending));
            assert_eq!(chunks[0].chars, 81);
            assert_eq!(chunks[1].text, "乙".repeat(50));
        }
    }

    #[test]
    fn test_ending_just_past_window_is_not_seen() {
        // '.' is char 100, its space char 101
        let text = format!("{}. {}", "a".repeat(99), "c".repeat(60));
        let chunks = Chunker::split(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, format!("{}.", "a".repeat(99)));
        assert_eq!(chunks[0].chars, 100);
        assert_eq!(chunks[1].text, "c".repeat(60));
    }

    #[test]
    fn test_hard_cut_without_breaks() {
        let text = "x".repeat(250);
        let chunks = Chunker::split(&text, 100);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.chars).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_multibyte_hard_cut_respects_char_boundaries() {
        let text = "é".repeat(150);
        let chunks = Chunker::split(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars, 100);
        assert_eq!(chunks[1].chars, 50);
    }

    #[test]
    fn test_chunks_reconstruct_document() {
        let text = "Lorem ipsum dolor sit amet. ".repeat(100)
            + "\n\nThe end! Or is it? "
            + &"More words follow here ".repeat(40);
        let chunks = Chunker::split(&text, 200);

        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(non_whitespace(&joined), non_whitespace(&text));

        for chunk in &chunks {
            assert!(!chunk.text.trim().is_empty());
            assert!(chunk.chars <= 200);
        }
    }

    #[test]
    fn test_chunk_count_bounds() {
        // Breaks right at the boundary: ceil(len/target) + 1
        let aligned = "abcdefghijklmnopqrstuvw. ".repeat(40);
        let len = char_len(&aligned);
        let chunks = Chunker::split(&aligned, 100);
        assert!(chunks.len() <= len.div_ceil(100) + 1);

        let no_breaks = "z".repeat(1234);
        let chunks = Chunker::split(&no_breaks, 100);
        assert!(chunks.len() <= 1234usize.div_ceil(100) + 1);

        // Breaks anywhere past 60%: every cut consumes more than 60 chars
        let prose = "Lorem ipsum dolor sit amet. ".repeat(100);
        let len = char_len(&prose);
        let chunks = Chunker::split(&prose, 100);
        assert!(chunks.len() <= len.div_ceil(60) + 1);
    }

    #[test]
    fn test_split_is_deterministic() {
        let text = "Sentence one. Sentence two! Sentence three? ".repeat(50);
        assert_eq!(Chunker::split(&text, 120), Chunker::split(&text, 120));
    }

    #[test]
    fn test_split_exact_ignores_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(70), "b".repeat(70));
        let chunks = Chunker::split_exact(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars, 100);
        assert!(chunks.len() <= char_len(&text).div_ceil(100));
    }

    #[test]
    fn test_zero_target_is_clamped() {
        let chunks = Chunker::split("abc", 0);
        assert_eq!(chunks.len(), 3);
    }
}
