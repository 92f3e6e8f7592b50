pub mod catalog;
pub mod client;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod pool;
pub mod retry;
pub mod sources;
pub mod token;
pub mod types;

pub use client::{build_http_client, ApiClient, Endpoints};
pub use error::ApiError;
pub use pipeline::{run_batch, BatchOptions, BatchReport};
pub use pool::{run_bounded, PoolOptions, PoolOutcome};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use token::{AccessToken, Credentials, TokenProvider};
