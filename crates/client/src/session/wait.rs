//! Bounded polling readiness primitive.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Poll `predicate` every `interval` until it returns `true` or `timeout`
/// elapses. The predicate is always evaluated at least once.
///
/// Returns whether the predicate was satisfied.
pub async fn wait_until<F, Fut>(timeout: Duration, interval: Duration, mut predicate: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if predicate().await {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
