//! Token counting for request budgeting.
//!
//! Counts only drive chunk sizing; a mismatch with the provider's own
//! tokenizer leads to over- or under-filled requests, never to wrong labels.

use std::fmt;
use std::str::FromStr;

use tiktoken_rs::CoreBPE;

/// Counts tokens in a piece of text under one encoding.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Name of the encoding, used in logs.
    fn name(&self) -> &str;
}

/// Encodings the service knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Cl100kBase,
    O200kBase,
    Heuristic,
}

impl FromStr for Encoding {
    type Err = TokenizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cl100k_base" => Ok(Self::Cl100kBase),
            "o200k_base" => Ok(Self::O200kBase),
            "heuristic" => Ok(Self::Heuristic),
            other => Err(TokenizerError::UnknownEncoding(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    #[error("Unknown token encoding: {0}")]
    UnknownEncoding(String),

    #[error("Failed to load BPE tables for {encoding}: {reason}")]
    Load { encoding: String, reason: String },
}

/// BPE tokenizer backed by `tiktoken-rs`.
pub struct BpeTokenCounter {
    bpe: CoreBPE,
    name: &'static str,
}

impl BpeTokenCounter {
    /// `cl100k_base`, the encoding of gpt-3.5-turbo / gpt-4.
    pub fn cl100k() -> Result<Self, TokenizerError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| TokenizerError::Load {
            encoding: "cl100k_base".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            bpe,
            name: "cl100k_base",
        })
    }

    pub fn o200k() -> Result<Self, TokenizerError> {
        let bpe = tiktoken_rs::o200k_base().map_err(|e| TokenizerError::Load {
            encoding: "o200k_base".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            bpe,
            name: "o200k_base",
        })
    }
}

impl TokenCounter for BpeTokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn name(&self) -> &str {
        self.name
    }
}

impl fmt::Debug for BpeTokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpeTokenCounter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Dependency-free estimate: the larger of chars/4 and words*1.3.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

pub fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    let char_count = text.chars().count();

    let char_based = (char_count as f64 / 4.0).ceil() as usize;
    let word_based = (word_count as f64 * 1.3).ceil() as usize;

    char_based.max(word_based)
}

/// Builds the counter for a configured encoding name.
pub fn counter_for(encoding: Encoding) -> Result<Box<dyn TokenCounter>, TokenizerError> {
    Ok(match encoding {
        Encoding::Cl100kBase => Box::new(BpeTokenCounter::cl100k()?),
        Encoding::O200kBase => Box::new(BpeTokenCounter::o200k()?),
        Encoding::Heuristic => Box::new(HeuristicTokenCounter),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_empty() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_estimate_tokens_takes_larger_estimate() {
        // 8 words -> 10.4 -> 11 beats 15 chars -> 4
        assert_eq!(estimate_tokens("a b c d e f g h"), 11);
        assert_eq!(estimate_tokens("abcdefghijklmnop"), 4);
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("cl100k_base".parse::<Encoding>().unwrap(), Encoding::Cl100kBase);
        assert_eq!("heuristic".parse::<Encoding>().unwrap(), Encoding::Heuristic);
        assert!(matches!(
            "gpt2".parse::<Encoding>(),
            Err(TokenizerError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_bpe_counter_counts_words() {
        let counter = BpeTokenCounter::cl100k().unwrap();
        assert_eq!(counter.count(""), 0);
        let count = counter.count("Great product!");
        assert!((2..=5).contains(&count), "got {count}");
        assert_eq!(counter.name(), "cl100k_base");
    }
}
