//! Event debouncing
//!
//! A single save can produce several filesystem events. The debouncer
//! collects events until the source has been quiet for the configured
//! interval, then hands the whole batch over as one trigger and starts
//! collecting again. Events arriving while the consumer is busy wait in
//! the input channel, so nothing is dropped between batches.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

/// Quiet interval used when none is configured
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_millis(300);

/// Collapses bursts of events into single batches
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    quiet: Duration,
}

impl Debouncer {
    /// Create a debouncer with the given quiet interval
    pub fn new(quiet: Duration) -> Self {
        Self { quiet }
    }

    /// The quiet interval
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Run the debouncer on its own task
    pub fn spawn<T: Send + 'static>(
        self,
        events: mpsc::UnboundedReceiver<T>,
        batches: mpsc::Sender<Vec<T>>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(events, batches))
    }

    /// Forward one batch per burst until either side closes.
    ///
    /// A burst cut short by the source closing is still delivered.
    pub async fn run<T>(self, mut events: mpsc::UnboundedReceiver<T>, batches: mpsc::Sender<Vec<T>>) {
        while let Some(first) = events.recv().await {
            let mut batch = vec![first];

            let closed = loop {
                match timeout(self.quiet, events.recv()).await {
                    Ok(Some(event)) => batch.push(event),
                    Ok(None) => break true,
                    Err(_) => break false,
                }
            };

            debug!("Debounced {} events into one trigger", batch.len());
            if batches.send(batch).await.is_err() || closed {
                break;
            }
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn start() -> (mpsc::UnboundedSender<u32>, mpsc::Receiver<Vec<u32>>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (batch_tx, batch_rx) = mpsc::channel(1);
        Debouncer::default().spawn(event_rx, batch_tx);
        (event_tx, batch_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_trigger() {
        let (events, mut batches) = start();

        for i in 0..5 {
            events.send(i).unwrap();
            sleep(Duration::from_millis(50)).await;
        }

        assert_eq!(batches.recv().await, Some(vec![0, 1, 2, 3, 4]));
        assert!(timeout(Duration::from_secs(2), batches.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_events_trigger_separately() {
        let (events, mut batches) = start();

        for i in 0..3 {
            events.send(i).unwrap();
            sleep(DEFAULT_QUIET_INTERVAL + Duration::from_millis(100)).await;
        }

        assert_eq!(batches.recv().await, Some(vec![0]));
        assert_eq!(batches.recv().await, Some(vec![1]));
        assert_eq!(batches.recv().await, Some(vec![2]));
    }

    #[tokio::test(start_paused = true)]
    async fn events_during_slow_consumer_are_kept() {
        let (events, mut batches) = start();

        events.send(1).unwrap();
        let first = batches.recv().await;

        // Consumer busy: two bursts arrive before it reads again
        events.send(2).unwrap();
        sleep(Duration::from_secs(1)).await;
        events.send(3).unwrap();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(first, Some(vec![1]));
        assert_eq!(batches.recv().await, Some(vec![2]));
        assert_eq!(batches.recv().await, Some(vec![3]));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_source_flushes_pending_burst() {
        let (events, mut batches) = start();

        events.send(7).unwrap();
        events.send(8).unwrap();
        drop(events);

        assert_eq!(batches.recv().await, Some(vec![7, 8]));
        assert_eq!(batches.recv().await, None);
    }
}
