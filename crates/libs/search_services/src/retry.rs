use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Run `op`, retrying up to `max_retries` times with linear backoff while
/// `is_transient` holds. Permanent errors surface immediately.
///
/// Callers rely on the retried operation being idempotent; nothing in the
/// session state is mutated before the underlying call succeeds.
pub async fn with_retries<T, E, F, Fut>(
    op_name: &str,
    max_retries: u32,
    retry_delay: Duration,
    is_transient: fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut retries = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) && retries < max_retries => {
                retries += 1;
                info!(
                    "Retrying {} after transient failure (attempt {}/{}): {}",
                    op_name, retries, max_retries, e
                );
                tokio::time::sleep(retry_delay * retries).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retries(
            "op",
            3,
            Duration::from_millis(10),
            |_| true,
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(7)
                }
            },
        )
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_surface_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retries(
            "op",
            3,
            Duration::from_millis(1),
            |_| false,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("permanent".to_string())
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
