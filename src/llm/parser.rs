//! Statement extraction from free-text model replies.
//!
//! 1. Strip hidden reasoning (`<think>...</think>` and similar pairs).
//! 2. Take the first `SELECT`/`INSERT`/`UPDATE`/`DELETE` up to the next `;`.
//! 3. Otherwise fall back to the whole cleaned reply, marked low-confidence.
//!
//! Never fails: a missing statement is a normal outcome.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static REASONING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<think>.*?</think>|<thinking>.*?</thinking>|<reasoning>.*?</reasoning>")
        .unwrap()
});

static STATEMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\b(?:SELECT|INSERT|UPDATE|DELETE)\b.*?;").unwrap());

/// How much the extracted text can be trusted to be a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionConfidence {
    /// Starts with a statement verb and ends at a terminator
    Bounded,
    /// No bounded statement found; text is the cleaned reply
    LowConfidence,
}

/// Result of parsing one model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedStatement {
    sql: String,
    confidence: ExtractionConfidence,
}

impl ExtractedStatement {
    /// Extracted text (a statement, or the fallback text).
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Extraction confidence.
    pub fn confidence(&self) -> ExtractionConfidence {
        self.confidence
    }

    /// Whether a bounded statement was found.
    pub fn is_bounded(&self) -> bool {
        self.confidence == ExtractionConfidence::Bounded
    }

    /// Take the text.
    pub fn into_sql(self) -> String {
        self.sql
    }
}

/// Extracts exactly one statement from a raw reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    /// Parse a raw reply.
    pub fn parse(reply: &str) -> ExtractedStatement {
        let cleaned = strip_reasoning(reply);

        match STATEMENT_REGEX.find(&cleaned) {
            Some(m) => ExtractedStatement {
                sql: m.as_str().trim().to_string(),
                confidence: ExtractionConfidence::Bounded,
            },
            None => ExtractedStatement {
                sql: cleaned.trim().to_string(),
                confidence: ExtractionConfidence::LowConfidence,
            },
        }
    }
}

/// Remove every reasoning block, repeating until none remain.
///
/// A single pass can splice a new pair together (`<thi<think>x</think>nk>`),
/// so removal runs to a fixed point.
pub fn strip_reasoning(reply: &str) -> String {
    let mut text = reply.to_string();
    while REASONING_REGEX.is_match(&text) {
        text = REASONING_REGEX.replace_all(&text, "").into_owned();
    }
    text
}
