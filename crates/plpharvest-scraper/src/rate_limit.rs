//! Bounded retry with exponential backoff for the listing API.
//!
//! Throttling (429), transport failures and 5xx responses are retried.
//! Everything else fails on the first attempt; the caller then degrades to
//! the next extraction strategy.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Runs `operation`, retrying transient failures up to `max_retries` times.
///
/// The delay before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)`
/// seconds; a server-supplied `Retry-After` wins when it is longer. The
/// last error is returned once retries run out.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !is_retriable(&err) || attempt >= max_retries => return Err(err),
            Err(err) => err,
        };

        let mut delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        if let ScraperError::RateLimited {
            retry_after_secs, ..
        } = &err
        {
            delay_secs = delay_secs.max(*retry_after_secs);
        }
        tracing::warn!(
            attempt = attempt + 1,
            max_retries,
            delay_secs,
            error = %err,
            "listing api request failed, retrying"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
