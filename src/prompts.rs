//! Summary granularity and prompt templates.
//!
//! Every completion call is a system prompt plus one user prompt built from a
//! granularity template. Chunked calls prefix the prompt with a positional tag
//! such as `[Part 2 of 5]` or `[Final combined summary]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SummaryError;

/// Default system prompt sent with every request.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes webnovel chapters concisely and accurately.";

/// Source length above which the output budget is boosted.
pub const LARGE_SOURCE_CHARS: usize = 100_000;

/// Hard ceiling for `max_tokens`.
pub const MAX_OUTPUT_TOKENS_CEILING: u32 = 4096;

/// Requested summary detail level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    /// A handful of bullet points with key events only.
    Short,
    /// A few narrative paragraphs.
    #[default]
    Detailed,
    /// Scene-by-scene retelling.
    VeryDetailed,
}

impl SummaryType {
    /// Wire/config name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryType::Short => "short",
            SummaryType::Detailed => "detailed",
            SummaryType::VeryDetailed => "very_detailed",
        }
    }

    /// Human-readable label for display.
    pub fn description(&self) -> &'static str {
        match self {
            SummaryType::Short => "Short Summary (Key events only)",
            SummaryType::Detailed => "Detailed Summary (Full narrative)",
            SummaryType::VeryDetailed => "Very Detailed Summary (Complete reading experience)",
        }
    }

    /// Base output budget before any large-source boost.
    pub fn base_output_tokens(&self) -> u32 {
        match self {
            SummaryType::Short => 800,
            SummaryType::Detailed => 2000,
            SummaryType::VeryDetailed => 4000,
        }
    }

    /// Output budget for a call whose source content has `source_chars` chars.
    ///
    /// Sources above [`LARGE_SOURCE_CHARS`] get 50% more room, capped at
    /// [`MAX_OUTPUT_TOKENS_CEILING`].
    pub fn max_output_tokens(&self, source_chars: usize) -> u32 {
        let base = self.base_output_tokens();
        if source_chars > LARGE_SOURCE_CHARS {
            (base + base / 2).min(MAX_OUTPUT_TOKENS_CEILING)
        } else {
            base
        }
    }

    /// Build the user prompt for `content`.
    pub fn prompt(&self, content: &str) -> String {
        match self {
            SummaryType::Short => short_prompt(content),
            SummaryType::Detailed => detailed_prompt(content),
            SummaryType::VeryDetailed => very_detailed_prompt(content),
        }
    }
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryType {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "short" => Ok(SummaryType::Short),
            "detailed" => Ok(SummaryType::Detailed),
            "very_detailed" | "verydetailed" => Ok(SummaryType::VeryDetailed),
            other => Err(SummaryError::InvalidRequest(format!(
                "Unknown summary type '{}'",
                other
            ))),
        }
    }
}

/// Prefix a prompt with a positional tag.
pub fn tagged(tag: &str, prompt: String) -> String {
    format!("[{}]\n\n{}", tag, prompt)
}

/// Tag for the `index`-th (1-based) of `total` chunks.
pub fn part_tag(index: usize, total: usize) -> String {
    format!("Part {} of {}", index, total)
}

/// Tag for the combination call.
pub const FINAL_TAG: &str = "Final combined summary";

fn short_prompt(content: &str) -> String {
    format!(
        "You carefully summarize light novels and web novels. Summarize this chapter in 3-5 bullet points.\n\
         Cover only the key events and major plot developments.\n\n\
         Rules:\n\
         - Past tense, third person\n\
         - One or two short sentences per bullet\n\
         - Keep names, terms and honorifics exactly as written\n\
         - Never add details that are not in the text\n\n\
         Content:\n{}\n\n\
         Summary (3-5 bullet points):",
        content
    )
}

fn detailed_prompt(content: &str) -> String {
    format!(
        "Write a detailed narrative summary of this light novel / web novel chapter that keeps the feel of reading it.\n\n\
         Include:\n\
         - Key events in order, with scene transitions\n\
         - Character actions, decisions and emotional reactions\n\
         - Important dialogue, paraphrased or quoted when it matters\n\
         - Plot developments, revelations and relationship dynamics\n\n\
         Style:\n\
         - Past tense; keep first person if the original uses it\n\
         - Match the story's tone and pacing\n\
         - 2-4 substantial paragraphs\n\n\
         Keep names, honorifics (-san, -kun, -sama, -sensei), skill names and cultivation or magic terms unchanged.\n\
         Never invent scenes, characters or dialogue.\n\n\
         Content:\n{}\n\n\
         Detailed Summary:",
        content
    )
}

fn very_detailed_prompt(content: &str) -> String {
    format!(
        "Write a comprehensive, immersive summary of this light novel / web novel chapter.\n\
         A reader of your summary should feel they experienced the chapter firsthand.\n\n\
         Narrative: follow the chapter scene by scene, including transitions and setting changes, and keep its pacing.\n\
         Characters: thoughts, internal monologue, changing emotions, decisions and their motives, body language.\n\
         Dialogue: quote or closely paraphrase key lines; keep each character's voice.\n\
         Details: names of characters, places, techniques and items in their original spelling; worldbuilding; \
         blow-by-blow action; sensory detail; tension and mystery.\n\
         Plot: major and minor points in order, revelations, foreshadowing, cliffhangers.\n\n\
         Light novel specifics: preserve honorifics, untranslated names, skill and spell names, cultivation realms, \
         game terms (Level, Stats, HP, Guild), titles (Young Master, Sect Leader) and sound effects (\"Hmph!\").\n\n\
         Fidelity: never invent scenes, characters, dialogue or motives. Use cautious phrasing when the text is ambiguous. \
         Quote verbatim only what appears in the source.\n\n\
         Length: 6-10 detailed paragraphs organized by scene.\n\n\
         Content:\n{}\n\n\
         Very Detailed Chapter Summary:",
        content
    )
}
