use analysis::{
    AnalyzerConfig, LlmClient, LlmError, RetryPolicy, Sentiment, SentimentAnalyzer,
    SentimentResult, TokenCounter,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

struct ScriptedLlmClient {
    call_count: AtomicU32,
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            call_count: AtomicU32::new(0),
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Provider that never answers in time.
struct StallingLlmClient {
    call_count: AtomicU32,
}

#[async_trait::async_trait]
impl LlmClient for StallingLlmClient {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok("positive,0.9".to_string())
    }

    fn model(&self) -> &str {
        "stalling"
    }
}

struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn name(&self) -> &str {
        "words"
    }
}

fn analyzer<C: LlmClient>(client: Arc<C>, config: AnalyzerConfig) -> SentimentAnalyzer<C> {
    SentimentAnalyzer::new(client, Arc::new(WordCounter), config)
}

fn rate_limited() -> Result<String, LlmError> {
    Err(LlmError::from_status(
        429,
        "Rate limit reached for model".to_string(),
        None,
    ))
}

const REVIEWS: [&str; 3] = ["Great product!", "Terrible service", "It was okay"];

#[tokio::test]
async fn test_three_reviews_one_chunk() {
    let client = Arc::new(ScriptedLlmClient::new(vec![Ok(
        "1. positive,0.95\n2. negative,0.88\n3. neutral,0.5".to_string(),
    )]));

    let report = analyzer(client.clone(), AnalyzerConfig::default())
        .analyze(&REVIEWS)
        .await;

    assert_eq!(client.calls(), 1);
    assert!(!report.is_partial());
    assert_eq!(report.chunks_total, 1);
    assert_eq!(report.analyzed_reviews(), 3);

    let proportions = report.aggregate.proportions;
    assert_eq!(proportions.positive, 0.33);
    assert_eq!(proportions.negative, 0.33);
    assert_eq!(proportions.neutral, 0.33);

    let top = report.aggregate.top.unwrap();
    assert_eq!(top.texts(Sentiment::Positive), vec!["Great product!"]);
    assert_eq!(top.texts(Sentiment::Negative), vec!["Terrible service"]);
    assert_eq!(top.texts(Sentiment::Neutral), vec!["It was okay"]);

    let prompt = &client.prompts()[0];
    assert!(prompt.contains("1. Great product!\n2. Terrible service\n3. It was okay\n"));
    assert!(prompt.ends_with("Results:"));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_twice_then_success() {
    let client = Arc::new(ScriptedLlmClient::new(vec![
        rate_limited(),
        rate_limited(),
        Ok("positive,0.95\nnegative,0.88\nneutral,0.5".to_string()),
    ]));
    let start = Instant::now();

    let report = analyzer(client.clone(), AnalyzerConfig::default())
        .analyze(&REVIEWS)
        .await;

    assert_eq!(client.calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
    assert!(!report.is_partial());
    assert_eq!(report.analyzed_reviews(), 3);
}

#[tokio::test]
async fn test_wrong_line_count_excludes_chunk() {
    let client = Arc::new(ScriptedLlmClient::new(vec![Ok(
        "1. positive,0.95\n2. negative,0.88".to_string(),
    )]));

    let report = analyzer(client.clone(), AnalyzerConfig::default())
        .analyze(&REVIEWS)
        .await;

    // Parse failures are not retried.
    assert_eq!(client.calls(), 1);
    assert!(report.is_partial());
    assert_eq!(report.total_reviews(), 3);
    assert_eq!(report.analyzed_reviews(), 0);
    assert!(report.results.iter().all(Option::is_none));
}

#[tokio::test(start_paused = true)]
async fn test_all_chunks_fail_gives_zero_aggregate() {
    let client = Arc::new(ScriptedLlmClient::new(Vec::new()));
    let config = AnalyzerConfig {
        max_tokens: 4,
        reserved_tokens: 0,
        ..Default::default()
    };

    let report = analyzer(client.clone(), config).analyze(&REVIEWS).await;

    assert_eq!(report.chunks_total, 2);
    assert_eq!(report.chunks_failed, 2);
    assert!(!report.aggregate.is_available());
    assert_eq!(report.aggregate.proportions.positive, 0.0);
    assert_eq!(report.aggregate.proportions.negative, 0.0);
    assert_eq!(report.aggregate.proportions.neutral, 0.0);
    let top = report.aggregate.top.unwrap();
    for label in Sentiment::ALL {
        assert!(top.get(label).is_empty());
    }
}

#[tokio::test]
async fn test_failed_first_chunk_keeps_later_results_aligned() {
    // Budget of 4 words: ["Great product!", "Terrible service"] then ["It was okay"].
    let client = Arc::new(ScriptedLlmClient::new(vec![
        Err(LlmError::from_status(400, "bad request".to_string(), None)),
        Ok("3. neutral,0.5".to_string()),
    ]));
    let config = AnalyzerConfig {
        max_tokens: 4,
        reserved_tokens: 0,
        ..Default::default()
    };

    let report = analyzer(client.clone(), config).analyze(&REVIEWS).await;

    assert_eq!(client.calls(), 2);
    assert_eq!(report.chunks_failed, 1);
    assert_eq!(
        report.results,
        vec![
            None,
            None,
            Some(SentimentResult::new(Sentiment::Neutral, 0.5))
        ]
    );
    let top = report.aggregate.top.unwrap();
    assert_eq!(top.texts(Sentiment::Neutral), vec!["It was okay"]);
    assert!(top.get(Sentiment::Positive).is_empty());
    assert_eq!(report.aggregate.proportions.neutral, 1.0);
}

#[tokio::test]
async fn test_empty_input_does_not_call_provider() {
    let client = Arc::new(ScriptedLlmClient::new(Vec::new()));
    let reviews: Vec<String> = Vec::new();

    let report = analyzer(client.clone(), AnalyzerConfig::default())
        .analyze(&reviews)
        .await;

    assert_eq!(client.calls(), 0);
    assert_eq!(report.chunks_total, 0);
    assert!(!report.is_partial());
    assert!(!report.aggregate.is_available());
}

#[tokio::test]
async fn test_top_reviews_disabled() {
    let client = Arc::new(ScriptedLlmClient::new(vec![Ok(
        "positive,0.95\nnegative,0.88\nneutral,0.5".to_string(),
    )]));
    let config = AnalyzerConfig {
        include_top_reviews: false,
        ..Default::default()
    };

    let report = analyzer(client, config).analyze(&REVIEWS).await;

    assert!(report.aggregate.top.is_none());
    assert_eq!(report.aggregate.counts.total(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_hung_call_times_out_and_is_retried() {
    let client = Arc::new(StallingLlmClient {
        call_count: AtomicU32::new(0),
    });
    let config = AnalyzerConfig {
        call_timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(1),
        },
        ..Default::default()
    };
    let start = Instant::now();

    let report = analyzer(client.clone(), config)
        .analyze(&["Great product!"])
        .await;

    assert_eq!(client.call_count.load(Ordering::SeqCst), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(6));
    assert_eq!(report.analyzed_reviews(), 1);
}
