use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::models::QueueEntry;

/// FIFO of decoded units shared by one producer and one consumer.
///
/// The consumer waits on a notification that is raised on every push, so there is
/// no polling interval; cancellation wakes it through the token.
pub struct PlaybackQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    pushed: Notify,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            pushed: Notify::new(),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<QueueEntry>> {
        // Entries are plain data; a panic elsewhere cannot leave them half-written
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an entry and wake the waiting consumer
    pub fn push(&self, entry: QueueEntry) {
        self.entries().push_back(entry);
        // Stores a permit if the consumer is not waiting yet
        self.pushed.notify_one();
    }

    /// Remove the head without waiting
    pub fn pop(&self) -> Option<QueueEntry> {
        self.entries().pop_front()
    }

    /// Wait for the next entry. Returns None once the token is cancelled and
    /// nothing is left; entries pushed before cancellation are still returned.
    pub async fn pop_blocking(&self, token: &CancellationToken) -> Option<QueueEntry> {
        loop {
            if let Some(entry) = self.pop() {
                return Some(entry);
            }
            if token.is_cancelled() {
                return None;
            }

            tokio::select! {
                _ = self.pushed.notified() => {}
                _ = token.cancelled() => {}
            }
        }
    }

    /// Drop everything still queued
    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Unit ids in queue order
    pub fn unit_ids(&self) -> Vec<u32> {
        self.entries().iter().map(|entry| entry.unit_id).collect()
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DecodedAudio;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready};

    fn entry(unit_id: u32) -> QueueEntry {
        QueueEntry::new(DecodedAudio::new(vec![0.0; 4], 24_000, 1), unit_id)
    }

    #[test]
    fn test_fifo_order() {
        let queue = PlaybackQueue::new();
        queue.push(entry(1));
        queue.push(entry(2));
        queue.push(entry(3));

        assert_eq!(queue.unit_ids(), vec![1, 2, 3]);
        assert_eq!(queue.pop().map(|e| e.unit_id), Some(1));
        assert_eq!(queue.pop().map(|e| e.unit_id), Some(2));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear() {
        let queue = PlaybackQueue::new();
        queue.push(entry(1));
        queue.push(entry(2));
        queue.clear();

        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[tokio::test]
    async fn test_pop_blocking_returns_queued_entry_immediately() {
        let queue = PlaybackQueue::new();
        let token = CancellationToken::new();
        queue.push(entry(7));

        assert_eq!(queue.pop_blocking(&token).await.map(|e| e.unit_id), Some(7));
    }

    #[tokio::test]
    async fn test_pop_blocking_drains_before_reporting_cancel() {
        let queue = PlaybackQueue::new();
        let token = CancellationToken::new();
        queue.push(entry(1));
        queue.push(entry(2));
        token.cancel();

        assert_eq!(queue.pop_blocking(&token).await.map(|e| e.unit_id), Some(1));
        assert_eq!(queue.pop_blocking(&token).await.map(|e| e.unit_id), Some(2));
        assert!(queue.pop_blocking(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_pop_blocking_waits_for_push() {
        let queue = PlaybackQueue::new();
        let token = CancellationToken::new();

        let mut pop = tokio_test::task::spawn(queue.pop_blocking(&token));
        assert_pending!(pop.poll());

        queue.push(entry(4));
        assert!(pop.is_woken());
        let popped = assert_ready!(pop.poll());
        assert_eq!(popped.map(|e| e.unit_id), Some(4));
    }

    #[tokio::test]
    async fn test_pop_blocking_wakes_on_cancel() {
        let queue = PlaybackQueue::new();
        let token = CancellationToken::new();

        let mut pop = tokio_test::task::spawn(queue.pop_blocking(&token));
        assert_pending!(pop.poll());

        token.cancel();
        assert!(pop.is_woken());
        assert!(assert_ready!(pop.poll()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_consumer_task_receives_entries_across_tasks() {
        let queue = Arc::new(PlaybackQueue::new());
        let token = CancellationToken::new();

        let consumer = {
            let queue = Arc::clone(&queue);
            let token = token.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(entry) = queue.pop_blocking(&token).await {
                    seen.push(entry.unit_id);
                }
                seen
            })
        };

        for unit_id in 1..=3 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            queue.push(entry(unit_id));
        }
        token.cancel();

        assert_eq!(consumer.await.unwrap(), vec![1, 2, 3]);
    }
}
