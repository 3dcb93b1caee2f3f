//! # Sentiment Analysis
//!
//! Turns an ordered list of reviews into a bounded sequence of completion
//! requests, parses the replies and aggregates the labels.
//!
//! reviews -> [`chunker`] -> [`prompts`] -> [`llm`] -> [`parser`], each chunk
//! under [`retry`] -> [`aggregator`]. [`pipeline::SentimentAnalyzer`] wires
//! the stages together.

pub mod aggregator;
pub mod chunker;
pub mod llm;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod retry;
pub mod telemetry;
pub mod tokenizer;
pub mod types;

pub use aggregator::{Aggregate, Aggregator, Proportions, ScoredReview, SentimentCounts, TopReviews, aggregate};
pub use chunker::{Chunk, chunk_reviews};
pub use llm::{ErrorKind, LlmClient, LlmError};
pub use parser::{ParseError, parse_response};
pub use pipeline::{AnalysisReport, AnalyzerConfig, SentimentAnalyzer};
pub use prompts::PromptTemplate;
pub use provider::OpenAiCompatibleClient;
pub use retry::{ChunkError, ChunkOutcome, RetryPolicy, RetryState, run_with_retry};
pub use tokenizer::{
    BpeTokenCounter, Encoding, HeuristicTokenCounter, TokenCounter, TokenizerError, counter_for,
};
pub use types::{Sentiment, SentimentResult};
