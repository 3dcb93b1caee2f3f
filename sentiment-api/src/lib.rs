//! # Sentiment API
//!
//! HTTP front end for the review sentiment analyzer.
//!
//! ## Endpoints
//!
//! - `POST /analyze_batch` - JSON `{ "reviews": [...] }`
//! - `POST /analyze_file` - multipart upload of a `.csv` or `.xlsx` file
//! - `GET /health` - Health check endpoint
//! - `GET /metrics` - Prometheus metrics endpoint

pub mod error;
pub mod handlers;
pub mod ingest;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use server::SentimentServer;
pub use state::AppState;
