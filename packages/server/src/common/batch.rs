//! Pacing for long-running batch commands.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Waits `delay` before the next batch item.
///
/// Returns `false` when the token was cancelled, either before or during
/// the wait, so the caller stops before starting another item.
pub async fn pause_between_items(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_token_stops_the_batch() {
        let cancel = CancellationToken::new();
        assert!(pause_between_items(Duration::ZERO, &cancel).await);

        cancel.cancel();
        assert!(!pause_between_items(Duration::from_secs(60), &cancel).await);
    }
}
