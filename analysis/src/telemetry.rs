use metrics::{counter, histogram};
use std::time::Instant;

pub struct Telemetry;

impl Telemetry {
    pub fn record_chunk(status: &'static str) {
        counter!("sentiment_chunks_total", "status" => status).increment(1);
    }

    pub fn record_chunk_error(kind: &'static str) {
        counter!("sentiment_chunk_errors_total", "kind" => kind).increment(1);
    }

    pub fn record_retry(kind: &'static str) {
        counter!("sentiment_retries_total", "kind" => kind).increment(1);
    }

    pub fn record_reviews(submitted: usize, analyzed: usize) {
        counter!("sentiment_reviews_submitted_total").increment(submitted as u64);
        counter!("sentiment_reviews_analyzed_total").increment(analyzed as u64);
    }

    pub fn record_latency(duration_ms: f64) {
        histogram!("sentiment_analysis_duration_ms").record(duration_ms);
    }
}

pub struct AnalysisTimer {
    start: Instant,
}

impl AnalysisTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed().as_millis() as f64;
        Telemetry::record_latency(duration);
    }
}

impl Default for AnalysisTimer {
    fn default() -> Self {
        Self::new()
    }
}
