//! Common utilities shared across modules

pub mod retry;

pub use retry::{with_retry, RetryConfig};
