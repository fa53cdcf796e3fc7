use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Collapses bursts of values (keystroke-driven search) into the last one.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    latest: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: AtomicU64::new(0),
        }
    }

    /// Wait out the delay; resolves to `Some(value)` only if no newer value
    /// was submitted in the meantime.
    pub async fn settle<T>(&self, value: T) -> Option<T> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        (self.latest.load(Ordering::SeqCst) == ticket).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn only_the_last_value_in_a_burst_settles() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let (first, second, third) = tokio::join!(
            debouncer.settle("c"),
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                debouncer.settle("cs").await
            },
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                debouncer.settle("css").await
            },
        );
        assert_eq!(first, None);
        assert_eq!(second, None);
        assert_eq!(third, Some("css"));
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_values_all_settle() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        assert_eq!(debouncer.settle(1).await, Some(1));
        assert_eq!(debouncer.settle(2).await, Some(2));
    }
}
