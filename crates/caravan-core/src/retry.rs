use std::future::Future;

use tracing::warn;

use crate::error::PlatformError;
use crate::platform::ChannelId;
use crate::settings::RetryPolicy;

/// Run a platform call, retrying rate-limited and transient failures with
/// exponential backoff. A `retry_after` hint from the platform replaces the
/// computed delay. Permanent failures are returned immediately.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    channel: ChannelId,
    action: &'static str,
    mut call: F,
) -> Result<T, PlatformError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlatformError>>,
{
    let mut retries = 0;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && retries < policy.max_retries => {
                retries += 1;
                let backoff = match &error {
                    PlatformError::RateLimited {
                        retry_after: Some(delay),
                    } => *delay,
                    _ => policy.backoff(retries),
                };
                warn!(
                    channel = %channel,
                    action = action,
                    retry = retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %error,
                    "Platform call failed, backing off"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(error) => return Err(error),
        }
    }
}
