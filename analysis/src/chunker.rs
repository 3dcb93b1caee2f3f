//! Greedy token-budget chunking of an ordered review list.

use tracing::debug;

use crate::tokenizer::TokenCounter;

/// A contiguous run of reviews sent to the provider as one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a, S> {
    /// Position of the first review of this chunk in the input.
    pub offset: usize,
    pub reviews: &'a [S],
    pub token_count: usize,
}

impl<S> Chunk<'_, S> {
    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

/// Effective per-request budget for review text.
pub fn review_budget(max_tokens: usize, reserved_tokens: usize) -> usize {
    max_tokens.saturating_sub(reserved_tokens)
}

/// Partitions `reviews` into ordered chunks whose token totals stay within
/// `max_tokens - reserved_tokens`.
///
/// The first review of a chunk is always admitted, so a review that alone
/// exceeds the budget forms its own chunk rather than being split or dropped.
pub fn chunk_reviews<'a, S: AsRef<str>>(
    reviews: &'a [S],
    counter: &dyn TokenCounter,
    max_tokens: usize,
    reserved_tokens: usize,
) -> Vec<Chunk<'a, S>> {
    let budget = review_budget(max_tokens, reserved_tokens);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut running = 0usize;

    for (idx, review) in reviews.iter().enumerate() {
        let tokens = counter.count(review.as_ref());

        if idx > start && running + tokens > budget {
            chunks.push(Chunk {
                offset: start,
                reviews: &reviews[start..idx],
                token_count: running,
            });
            start = idx;
            running = 0;
        }

        if idx == start && tokens > budget {
            debug!(
                review_index = idx,
                tokens, budget, "Review exceeds chunk budget on its own"
            );
        }
        running += tokens;
    }

    if start < reviews.len() {
        chunks.push(Chunk {
            offset: start,
            reviews: &reviews[start..],
            token_count: running,
        });
    }

    chunks
}
