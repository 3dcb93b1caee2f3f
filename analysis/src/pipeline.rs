use std::sync::Arc;
use std::time::Duration;

use config::Config;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::{Aggregate, Aggregator, aggregate};
use crate::chunker::{Chunk, chunk_reviews};
use crate::llm::{LlmClient, LlmError};
use crate::parser::parse_response;
use crate::prompts::PromptTemplate;
use crate::retry::{ChunkError, ChunkOutcome, RetryPolicy, run_with_retry};
use crate::telemetry::{AnalysisTimer, Telemetry};
use crate::tokenizer::{Encoding, TokenCounter, TokenizerError, counter_for};
use crate::types::SentimentResult;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub max_tokens: usize,
    pub reserved_tokens: usize,
    pub include_top_reviews: bool,
    pub top_n: usize,
    /// Upper bound on one provider call, enforced on top of the client's own.
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 32768,
            reserved_tokens: 2000,
            include_top_reviews: true,
            top_n: 3,
            call_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_config(config: &Config) -> Self {
        let analysis = &config.analysis;
        Self {
            max_tokens: analysis.max_tokens,
            reserved_tokens: analysis.reserved_tokens,
            include_top_reviews: analysis.include_top_reviews,
            top_n: analysis.top_n,
            call_timeout: Duration::from_secs(config.provider.request_timeout_secs),
            retry: RetryPolicy::from_config(analysis),
        }
    }
}

/// Result of analysing one batch of reviews.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub aggregate: Aggregate,
    /// One entry per input review, `None` where its chunk failed.
    pub results: Vec<Option<SentimentResult>>,
    pub chunks_total: usize,
    pub chunks_failed: usize,
}

impl AnalysisReport {
    pub fn total_reviews(&self) -> usize {
        self.results.len()
    }

    pub fn analyzed_reviews(&self) -> usize {
        self.aggregate.total_valid()
    }

    /// True when at least one chunk contributed no results.
    pub fn is_partial(&self) -> bool {
        self.chunks_failed > 0
    }
}

/// Chunks reviews, classifies each chunk through the provider and
/// aggregates the results.
///
/// Chunks are processed one at a time so results line up with the input
/// without re-stitching.
pub struct SentimentAnalyzer<C: LlmClient + ?Sized> {
    client: Arc<C>,
    counter: Arc<dyn TokenCounter>,
    config: AnalyzerConfig,
    prompts: PromptTemplate,
}

impl<C: LlmClient + ?Sized> SentimentAnalyzer<C> {
    pub fn new(client: Arc<C>, counter: Arc<dyn TokenCounter>, config: AnalyzerConfig) -> Self {
        Self {
            client,
            counter,
            config,
            prompts: PromptTemplate::default(),
        }
    }

    pub fn from_config(client: Arc<C>, config: &Config) -> Result<Self, TokenizerError> {
        let encoding: Encoding = config.analysis.encoding.parse()?;
        let counter: Arc<dyn TokenCounter> = Arc::from(counter_for(encoding)?);
        Ok(Self::new(client, counter, AnalyzerConfig::from_config(config)))
    }

    pub fn with_prompts(mut self, prompts: PromptTemplate) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    #[instrument(skip_all, fields(reviews = reviews.len(), model = %self.client.model()))]
    pub async fn analyze<S: AsRef<str> + Sync>(&self, reviews: &[S]) -> AnalysisReport {
        if reviews.is_empty() {
            debug!("No reviews to analyze");
            return AnalysisReport {
                aggregate: Aggregator::new(self.config.include_top_reviews, self.config.top_n)
                    .finish(),
                ..Default::default()
            };
        }

        let timer = AnalysisTimer::new();
        let chunks = chunk_reviews(
            reviews,
            self.counter.as_ref(),
            self.config.max_tokens,
            self.config.reserved_tokens,
        );
        info!(
            chunks = chunks.len(),
            encoding = self.counter.name(),
            "Split reviews into chunks"
        );

        let mut results: Vec<Option<SentimentResult>> = Vec::with_capacity(reviews.len());
        let mut chunks_failed = 0;

        for (index, chunk) in chunks.iter().enumerate() {
            match self.analyze_chunk(index, chunk).await.into_results() {
                Some(chunk_results) => {
                    Telemetry::record_chunk("succeeded");
                    results.extend(chunk_results.into_iter().map(Some));
                }
                None => {
                    Telemetry::record_chunk("failed");
                    chunks_failed += 1;
                    results.extend(std::iter::repeat_n(None, chunk.len()));
                }
            }
        }

        let report = AnalysisReport {
            aggregate: aggregate(
                reviews,
                &results,
                self.config.include_top_reviews,
                self.config.top_n,
            ),
            results,
            chunks_total: chunks.len(),
            chunks_failed,
        };

        Telemetry::record_reviews(report.total_reviews(), report.analyzed_reviews());
        timer.finish();

        if report.is_partial() {
            warn!(
                chunks_failed,
                analyzed = report.analyzed_reviews(),
                total = report.total_reviews(),
                "Analysis completed with failed chunks"
            );
        } else {
            info!(analyzed = report.analyzed_reviews(), "Analysis completed");
        }

        report
    }

    #[instrument(skip_all, fields(chunk = index, offset = chunk.offset, size = chunk.len(), tokens = chunk.token_count))]
    async fn analyze_chunk<S: AsRef<str> + Sync>(
        &self,
        index: usize,
        chunk: &Chunk<'_, S>,
    ) -> ChunkOutcome {
        let prompt = self.prompts.format(chunk.reviews);
        let prompt = prompt.as_str();
        let expected = chunk.len();

        run_with_retry(&self.config.retry, move |_| self.attempt_chunk(prompt, expected)).await
    }

    async fn attempt_chunk(
        &self,
        prompt: &str,
        expected: usize,
    ) -> Result<Vec<SentimentResult>, ChunkError> {
        let raw = tokio::time::timeout(self.config.call_timeout, self.client.complete(prompt))
            .await
            .map_err(|_| LlmError::Timeout(self.config.call_timeout.as_secs()))??;

        Ok(parse_response(&raw, expected)?)
    }
}
