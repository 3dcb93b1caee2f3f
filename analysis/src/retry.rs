//! Bounded retry with exponential backoff for a single chunk.

use std::future::Future;
use std::time::Duration;

use config::AnalysisConfig;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, error, info, warn};

use crate::llm::{ErrorKind, LlmError};
use crate::parser::ParseError;
use crate::telemetry::Telemetry;
use crate::types::SentimentResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delays between attempts: `base, 2*base, 4*base, ...` capped at
    /// `max_delay`, with millisecond resolution.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> + use<> {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let max_delay = self.max_delay;
        // ExponentialBackoff yields factor * 2^(n+1); always even, so halving is exact.
        ExponentialBackoff::from_millis(2)
            .factor(base_ms)
            .map(move |delay| (delay / 2).min(max_delay))
    }

    fn delay_for(&self, computed: Duration, err: &ChunkError) -> Duration {
        let hinted = err
            .retry_after_secs()
            .map(Duration::from_secs)
            .unwrap_or_default();
        computed.max(hinted).min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    BackingOff,
    Succeeded,
    Failed,
}

/// Why a single attempt at a chunk failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChunkError {
    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("unparseable provider response: {0}")]
    Parse(#[from] ParseError),
}

impl ChunkError {
    /// A malformed reply is treated as permanent: resending the same prompt
    /// is not expected to fix format drift.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChunkError::Provider(err) => err.kind(),
            ChunkError::Parse(_) => ErrorKind::Permanent,
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ChunkError::Provider(err) => err.retry_after_secs(),
            ChunkError::Parse(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    Succeeded {
        results: Vec<SentimentResult>,
        attempts: u32,
    },
    Failed {
        attempts: u32,
        reason: ChunkError,
    },
}

impl ChunkOutcome {
    /// Results of a successful chunk, empty when the chunk failed.
    pub fn results(&self) -> &[SentimentResult] {
        match self {
            ChunkOutcome::Succeeded { results, .. } => results,
            ChunkOutcome::Failed { .. } => &[],
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ChunkOutcome::Succeeded { attempts, .. } | ChunkOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChunkOutcome::Succeeded { .. })
    }

    pub fn into_results(self) -> Option<Vec<SentimentResult>> {
        match self {
            ChunkOutcome::Succeeded { results, .. } => Some(results),
            ChunkOutcome::Failed { .. } => None,
        }
    }
}

/// Runs `attempt_fn` until it succeeds, fails permanently or the attempt
/// budget is spent. Never returns an error; failure is a
/// [`ChunkOutcome::Failed`].
///
/// Rate-limited and transient failures sleep for the next backoff delay
/// before retrying. No sleep happens after the final attempt.
pub async fn run_with_retry<F, Fut>(policy: &RetryPolicy, mut attempt_fn: F) -> ChunkOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<SentimentResult>, ChunkError>>,
{
    let max_attempts = policy.max_retries.max(1);
    let mut delays = policy.backoff();
    let mut attempt = 0u32;
    let mut state = RetryState::Attempting;

    loop {
        attempt += 1;
        debug!(attempt, ?state, "Attempting chunk");

        let err = match attempt_fn(attempt).await {
            Ok(results) => {
                state = RetryState::Succeeded;
                debug!(attempt, ?state, "Chunk attempt succeeded");
                return ChunkOutcome::Succeeded {
                    results,
                    attempts: attempt,
                };
            }
            Err(err) => err,
        };

        let kind = err.kind();
        Telemetry::record_chunk_error(kind.as_str());
        warn!(
            attempt,
            max_attempts,
            kind = kind.as_str(),
            error = %err,
            "Chunk attempt failed"
        );

        if kind == ErrorKind::Permanent || attempt >= max_attempts {
            state = RetryState::Failed;
            error!(
                attempts = attempt,
                ?state,
                kind = kind.as_str(),
                error = %err,
                "Giving up on chunk"
            );
            return ChunkOutcome::Failed {
                attempts: attempt,
                reason: err,
            };
        }

        state = RetryState::BackingOff;
        let computed = delays.next().unwrap_or(policy.max_delay);
        let delay = policy.delay_for(computed, &err);
        Telemetry::record_retry(kind.as_str());
        info!(
            attempt,
            ?state,
            delay_ms = delay.as_millis() as u64,
            kind = kind.as_str(),
            "Backing off before retrying chunk"
        );
        tokio::time::sleep(delay).await;
        state = RetryState::Attempting;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;
    use crate::types::Sentiment;

    fn rate_limited() -> ChunkError {
        LlmError::from_status(429, "Rate limit reached".to_string(), None).into()
    }

    fn ok_results() -> Vec<SentimentResult> {
        vec![SentimentResult::new(Sentiment::Positive, 0.9)]
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let delays: Vec<Duration> = RetryPolicy::default().backoff().take(4).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[test]
    fn test_backoff_keeps_odd_and_tiny_bases_exact() {
        let odd = RetryPolicy {
            base_delay: Duration::from_millis(1001),
            ..RetryPolicy::default()
        };
        let delays: Vec<Duration> = odd.backoff().take(3).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1001),
                Duration::from_millis(2002),
                Duration::from_millis(4004)
            ]
        );

        let tiny = RetryPolicy {
            base_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let delays: Vec<Duration> = tiny.backoff().take(3).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1),
                Duration::from_millis(2),
                Duration::from_millis(4)
            ]
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
        };
        let delays: Vec<Duration> = policy.backoff().take(4).collect();
        assert_eq!(delays[2], Duration::from_millis(3000));
        assert_eq!(delays[3], Duration::from_millis(3000));
    }

    #[test]
    fn test_retry_after_hint_is_honoured_but_capped() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        };
        let hinted: ChunkError =
            LlmError::from_status(429, "slow down".to_string(), Some(5)).into();
        assert_eq!(
            policy.delay_for(Duration::from_secs(1), &hinted),
            Duration::from_secs(5)
        );

        let huge: ChunkError =
            LlmError::from_status(429, "slow down".to_string(), Some(600)).into();
        assert_eq!(
            policy.delay_for(Duration::from_secs(1), &huge),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_parse_errors_are_permanent() {
        let err: ChunkError = ParseError::LineCount {
            expected: 3,
            actual: 2,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_twice_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let outcome = run_with_retry(&RetryPolicy::default(), |_| {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(rate_limited())
                } else {
                    Ok(ok_results())
                }
            }
        })
        .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_failed_without_final_sleep() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let outcome = run_with_retry(&RetryPolicy::default(), |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(rate_limited())
            }
        })
        .await;

        assert!(!outcome.is_success());
        assert!(outcome.results().is_empty());
        assert_eq!(outcome.attempts(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // 1 + 2 + 4 + 8
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let outcome = run_with_retry(&RetryPolicy::default(), |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::from_status(401, "invalid api key".to_string(), None).into())
            }
        })
        .await;

        assert_eq!(outcome.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(matches!(
            outcome,
            ChunkOutcome::Failed {
                reason: ChunkError::Provider(LlmError::Api { status: 401, .. }),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let outcome = run_with_retry(&RetryPolicy::default(), |attempt| async move {
            if attempt == 1 {
                Err(LlmError::Timeout(30).into())
            } else {
                Ok(ok_results())
            }
        })
        .await;

        assert_eq!(outcome.attempts(), 2);
        assert_eq!(outcome.into_results(), Some(ok_results()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_still_attempts_once() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..Default::default()
        };
        let outcome = run_with_retry(&policy, |_| async { Err(rate_limited()) }).await;
        assert_eq!(outcome.attempts(), 1);
    }
}
