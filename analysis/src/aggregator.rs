//! Folds per-review results into counts, proportions and top-N examples.

use serde::Serialize;

use crate::types::{Sentiment, SentimentResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentCounts {
    pub fn get(&self, label: Sentiment) -> usize {
        match label {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    fn increment(&mut self, label: Sentiment) {
        match label {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Share of each label among valid results, rounded to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Proportions {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl Proportions {
    fn from_counts(counts: &SentimentCounts) -> Self {
        let total = counts.total();
        if total == 0 {
            return Self::default();
        }
        let share = |n: usize| round2(n as f64 / total as f64);
        Self {
            positive: share(counts.positive),
            negative: share(counts.negative),
            neutral: share(counts.neutral),
        }
    }

    pub fn get(&self, label: Sentiment) -> f64 {
        match label {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredReview {
    pub text: String,
    pub confidence: f64,
}

/// Highest-confidence reviews per label, each list sorted descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopReviews {
    pub positive: Vec<ScoredReview>,
    pub negative: Vec<ScoredReview>,
    pub neutral: Vec<ScoredReview>,
}

impl TopReviews {
    pub fn get(&self, label: Sentiment) -> &[ScoredReview] {
        match label {
            Sentiment::Positive => &self.positive,
            Sentiment::Negative => &self.negative,
            Sentiment::Neutral => &self.neutral,
        }
    }

    fn get_mut(&mut self, label: Sentiment) -> &mut Vec<ScoredReview> {
        match label {
            Sentiment::Positive => &mut self.positive,
            Sentiment::Negative => &mut self.negative,
            Sentiment::Neutral => &mut self.neutral,
        }
    }

    /// Texts only, in rank order.
    pub fn texts(&self, label: Sentiment) -> Vec<String> {
        self.get(label).iter().map(|r| r.text.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub counts: SentimentCounts,
    pub proportions: Proportions,
    /// `None` when top-N collection is disabled.
    pub top: Option<TopReviews>,
}

impl Aggregate {
    pub fn total_valid(&self) -> usize {
        self.counts.total()
    }

    /// A zero-total aggregate carries no information and must not be read
    /// as "all neutral".
    pub fn is_available(&self) -> bool {
        self.total_valid() > 0
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    top_n: usize,
    counts: SentimentCounts,
    top: Option<TopReviews>,
}

impl Aggregator {
    pub fn new(include_top_reviews: bool, top_n: usize) -> Self {
        Self {
            top_n,
            counts: SentimentCounts::default(),
            top: include_top_reviews.then(TopReviews::default),
        }
    }

    pub fn push(&mut self, review: &str, result: &SentimentResult) {
        self.counts.increment(result.label);

        let Some(top) = self.top.as_mut() else {
            return;
        };
        let entries = top.get_mut(result.label);
        let candidate = ScoredReview {
            text: review.to_string(),
            confidence: result.confidence,
        };

        if entries.len() < self.top_n {
            entries.push(candidate);
            return;
        }

        let weakest = entries
            .iter()
            .map(|e| e.confidence)
            .fold(f64::INFINITY, f64::min);
        if result.confidence > weakest {
            entries.push(candidate);
            sort_descending(entries);
            entries.truncate(self.top_n);
        }
    }

    pub fn finish(self) -> Aggregate {
        let top = self.top.map(|mut top| {
            for label in Sentiment::ALL {
                sort_descending(top.get_mut(label));
            }
            top
        });

        Aggregate {
            proportions: Proportions::from_counts(&self.counts),
            counts: self.counts,
            top,
        }
    }
}

/// Stable, so equal scores keep arrival order.
fn sort_descending(entries: &mut [ScoredReview]) {
    entries.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

/// Pairs reviews positionally with their results, skipping reviews that
/// have none.
pub fn aggregate<S: AsRef<str>>(
    reviews: &[S],
    results: &[Option<SentimentResult>],
    include_top_reviews: bool,
    top_n: usize,
) -> Aggregate {
    let mut aggregator = Aggregator::new(include_top_reviews, top_n);
    for (review, result) in reviews.iter().zip(results) {
        if let Some(result) = result {
            aggregator.push(review.as_ref(), result);
        }
    }
    aggregator.finish()
}
