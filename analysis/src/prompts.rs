use std::fmt::Write;

/// Instruction template for a chunk of reviews.
///
/// The reply contract is one `label,score` line per review, in input order;
/// [`crate::parser::parse_response`] enforces it.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub instruction: String,
    pub results_marker: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            instruction: CLASSIFY_INSTRUCTION.to_string(),
            results_marker: RESULTS_MARKER.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Renders the instruction, the reviews numbered from 1 and the results
    /// marker.
    pub fn format<S: AsRef<str>>(&self, reviews: &[S]) -> String {
        let mut prompt = String::with_capacity(
            self.instruction.len() + reviews.iter().map(|r| r.as_ref().len() + 8).sum::<usize>(),
        );

        prompt.push_str(&self.instruction);
        prompt.push_str("\n\nReviews:\n");
        for (idx, review) in reviews.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", idx + 1, single_line(review.as_ref()));
        }
        prompt.push('\n');
        prompt.push_str(&self.results_marker);

        prompt
    }
}

/// Collapses embedded line breaks so every review occupies exactly one
/// numbered line.
fn single_line(review: &str) -> String {
    review.split_whitespace().collect::<Vec<_>>().join(" ")
}

const CLASSIFY_INSTRUCTION: &str = "\
Analyze the sentiment of each of the following reviews and classify each as positive, negative, \
or neutral. Also provide a confidence score between 0 and 1 for each. Return the results in the \
format: 'classification,score' for each review, separated by newlines.";

const RESULTS_MARKER: &str = "Results:";
