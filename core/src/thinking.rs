//! Thinking/answer content splitting
//!
//! Models running in thinking mode wrap their intermediate reasoning in one
//! of several marker conventions. The splitter holds an ordered list of
//! open/close marker pairs as data; the first pattern that matches the
//! accumulated text wins, the span between its markers becomes the thinking
//! segment and the rest of the text becomes the answer.
//!
//! A marker can straddle chunk boundaries during streaming, so the split is
//! recomputed over the full accumulated text after every chunk instead of
//! being tracked incrementally. The recompute is O(n) per chunk, which is
//! fine for chat-sized messages.

use regex::{escape, Regex, RegexBuilder};

use crate::error::{Result, ThemisError};

/// One open/close marker convention
#[derive(Debug, Clone)]
pub struct MarkerPattern {
    regex: Regex,
}

impl MarkerPattern {
    /// Build a pattern from literal open and close markers
    pub fn new(open: &str, close: &str, case_insensitive: bool) -> Result<Self> {
        let pattern = format!("{}(.*?){}", escape(open), escape(close));
        let regex = RegexBuilder::new(&pattern)
            .dot_matches_new_line(true)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| ThemisError::Configuration {
                message: format!("invalid marker pattern {:?}..{:?}: {}", open, close, e),
            })?;
        Ok(MarkerPattern { regex })
    }
}

/// Result of splitting accumulated text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitContent {
    /// Intermediate reasoning, empty when no marker matched
    pub thinking: String,
    /// Final answer text with the matched span removed
    pub answer: String,
}

/// Ordered marker-pattern list applied to accumulated text
#[derive(Debug, Clone)]
pub struct ThinkingSplitter {
    patterns: Vec<MarkerPattern>,
}

impl ThinkingSplitter {
    /// Build a splitter from an explicit pattern list
    pub fn new(patterns: Vec<MarkerPattern>) -> Self {
        ThinkingSplitter { patterns }
    }

    /// Split `content` into thinking and answer.
    ///
    /// Pure function of the full text: safe to re-run after every chunk,
    /// and idempotent for a given accumulation state.
    pub fn split(&self, content: &str) -> SplitContent {
        for pattern in &self.patterns {
            if let Some(caps) = pattern.regex.captures(content) {
                let matched = caps.get(0).expect("group 0 always present");
                let thinking = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let mut answer = String::with_capacity(content.len() - matched.len());
                answer.push_str(&content[..matched.start()]);
                answer.push_str(&content[matched.end()..]);
                return SplitContent {
                    thinking: thinking.trim().to_string(),
                    answer: answer.trim().to_string(),
                };
            }
        }

        SplitContent {
            thinking: String::new(),
            answer: content.to_string(),
        }
    }
}

impl Default for ThinkingSplitter {
    /// The marker conventions observed from the upstream models, most
    /// specific first
    fn default() -> Self {
        let patterns = vec![
            MarkerPattern::new("<thinking>", "</thinking>", true),
            MarkerPattern::new("【思考】", "【/思考】", false),
            MarkerPattern::new("**思考过程：**", "**回答：**", false),
            MarkerPattern::new("思考：", "回答：", false),
        ];
        ThinkingSplitter::new(
            patterns
                .into_iter()
                .collect::<Result<Vec<_>>>()
                .expect("default marker patterns are valid"),
        )
    }
}
