//! Parsing of `label,score` completion text.
//!
//! Parsing is all-or-nothing per chunk: one bad line means the provider
//! drifted from the format and none of the chunk's lines can be trusted.

use crate::types::{Sentiment, SentimentResult};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("expected {expected} result lines, got {actual}")]
    LineCount { expected: usize, actual: usize },

    #[error("line {line}: expected 'label,score', got {content:?}")]
    Malformed { line: usize, content: String },

    #[error("line {line}: unknown sentiment label {label:?}")]
    UnknownLabel { line: usize, label: String },

    #[error("line {line}: invalid confidence score {score:?}")]
    InvalidScore { line: usize, score: String },
}

/// Parses the provider reply for a chunk of `expected_count` reviews.
///
/// Each line is `<anything> <label>,<score>`: the label is the last
/// whitespace-separated token before the comma (so `1. positive,0.9` works)
/// and the score must be a number in `[0, 1]`.
pub fn parse_response(
    raw_text: &str,
    expected_count: usize,
) -> Result<Vec<SentimentResult>, ParseError> {
    let trimmed = raw_text.trim();
    let lines: Vec<&str> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.lines().collect()
    };

    if lines.len() != expected_count {
        return Err(ParseError::LineCount {
            expected: expected_count,
            actual: lines.len(),
        });
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(idx, line)| parse_line(idx + 1, line))
        .collect()
}

fn parse_line(line_no: usize, line: &str) -> Result<SentimentResult, ParseError> {
    let malformed = || ParseError::Malformed {
        line: line_no,
        content: line.to_string(),
    };

    let mut segments = line.split(',');
    let (Some(label_segment), Some(score_segment), None) =
        (segments.next(), segments.next(), segments.next())
    else {
        return Err(malformed());
    };

    let label_token = label_segment.split_whitespace().last().ok_or_else(malformed)?;
    let label = label_token
        .parse::<Sentiment>()
        .map_err(|_| ParseError::UnknownLabel {
            line: line_no,
            label: label_token.to_lowercase(),
        })?;

    let score_text = score_segment.trim();
    let confidence = score_text
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && (0.0..=1.0).contains(s))
        .ok_or_else(|| ParseError::InvalidScore {
            line: line_no,
            score: score_text.to_string(),
        })?;

    Ok(SentimentResult::new(label, confidence))
}
