//! Bounded event channel between the read loop and the consumer
//!
//! Single producer (the connection manager), single consumer (the client
//! handle). Capacity is fixed at construction; what happens when it is
//! reached is decided by the [`OverflowPolicy`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use media_listener_protocol::Event;
use media_listener_utils::{ClientError, Result};

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 256;

/// Behaviour of [`EventSender::push`] on a full channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued event; the producer never waits
    #[default]
    DropOldest,
    /// Wait until the consumer frees a slot
    Block,
}

/// Result of a successful push
#[derive(Debug, PartialEq)]
pub enum PushOutcome {
    Queued,
    /// Queued after evicting this event from the head
    Evicted(Event),
}

struct Queue {
    events: VecDeque<Event>,
    closed: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    capacity: usize,
    policy: OverflowPolicy,
    /// Signalled when an event is queued or the channel closes
    not_empty: Notify,
    /// Signalled when an event is taken or the channel closes
    not_full: Notify,
    dropped: AtomicU64,
}

impl Shared {
    fn close(&self) {
        let was_closed = std::mem::replace(&mut self.queue.lock().closed, true);
        if !was_closed {
            self.not_empty.notify_one();
            self.not_full.notify_one();
        }
    }
}

/// Create a channel holding at most `capacity` events (minimum 1)
pub fn event_channel(capacity: usize, policy: OverflowPolicy) -> (EventSender, EventReceiver) {
    let capacity = capacity.max(1);
    let shared = Arc::new(Shared {
        queue: Mutex::new(Queue {
            events: VecDeque::with_capacity(capacity),
            closed: false,
        }),
        capacity,
        policy,
        not_empty: Notify::new(),
        not_full: Notify::new(),
        dropped: AtomicU64::new(0),
    });

    (
        EventSender {
            shared: Arc::clone(&shared),
        },
        EventReceiver { shared },
    )
}

/// Producer half, owned by the connection manager
pub struct EventSender {
    shared: Arc<Shared>,
}

impl EventSender {
    /// Queue an event, applying the overflow policy when full
    ///
    /// Returns [`ClientError::ChannelClosed`] once either half has closed
    /// the channel.
    pub async fn push(&mut self, event: Event) -> Result<PushOutcome> {
        loop {
            {
                let mut queue = self.shared.queue.lock();
                if queue.closed {
                    return Err(ClientError::ChannelClosed);
                }

                if queue.events.len() < self.shared.capacity {
                    queue.events.push_back(event);
                    drop(queue);
                    self.shared.not_empty.notify_one();
                    return Ok(PushOutcome::Queued);
                }

                if self.shared.policy == OverflowPolicy::DropOldest {
                    let evicted = queue.events.pop_front();
                    queue.events.push_back(event);
                    drop(queue);
                    self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    self.shared.not_empty.notify_one();
                    return Ok(evicted.map_or(PushOutcome::Queued, PushOutcome::Evicted));
                }
            }

            self.shared.not_full.notified().await;
        }
    }

    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.queue.lock().closed
    }

    pub fn len(&self) -> usize {
        self.shared.queue.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for EventSender {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Consumer half
///
/// After the channel closes, events already queued are still returned;
/// `None` marks the end of the stream.
pub struct EventReceiver {
    shared: Arc<Shared>,
}

impl EventReceiver {
    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            {
                let mut queue = self.shared.queue.lock();
                if let Some(event) = queue.events.pop_front() {
                    drop(queue);
                    self.shared.not_full.notify_one();
                    return Some(event);
                }
                if queue.closed {
                    return None;
                }
            }

            self.shared.not_empty.notified().await;
        }
    }

    /// Take the next event if one is queued
    pub fn try_recv(&mut self) -> Option<Event> {
        let event = self.shared.queue.lock().events.pop_front();
        if event.is_some() {
            self.shared.not_full.notify_one();
        }
        event
    }

    /// Borrow the receiver as a [`Stream`] of events
    pub fn stream(&mut self) -> impl Stream<Item = Event> + '_ {
        futures::stream::unfold(self, |rx| async move {
            let event = rx.recv().await?;
            Some((event, rx))
        })
    }

    /// Convert the receiver into an owned [`Stream`] of events
    pub fn into_stream(self) -> impl Stream<Item = Event> {
        futures::stream::unfold(self, |mut rx| async move {
            let event = rx.recv().await?;
            Some((event, rx))
        })
    }

    pub fn close(&self) {
        self.shared.close();
    }

    /// Handle that can close the channel from another task
    pub(crate) fn closer(&self) -> ChannelCloser {
        ChannelCloser {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.queue.lock().closed
    }

    pub fn len(&self) -> usize {
        self.shared.queue.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.shared.policy
    }

    /// Number of events evicted under [`OverflowPolicy::DropOldest`]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for EventReceiver {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Cloneable close switch for the channel
#[derive(Clone)]
pub(crate) struct ChannelCloser {
    shared: Arc<Shared>,
}

impl ChannelCloser {
    pub(crate) fn close(&self) {
        self.shared.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use media_listener_protocol::Timestamp;
    use serde_json::Map;
    use std::time::Duration;

    fn event(n: usize) -> Event {
        Event::from_fields(format!("e{}", n), Timestamp::Text("T".into()), Map::new())
    }

    // ==================== Basic Tests ====================

    #[tokio::test]
    async fn test_push_recv_fifo() {
        let (mut tx, mut rx) = event_channel(8, OverflowPolicy::DropOldest);
        for n in 0..5 {
            assert_eq!(tx.push(event(n)).await.unwrap(), PushOutcome::Queued);
        }
        for n in 0..5 {
            assert_eq!(rx.recv().await.unwrap(), event(n));
        }
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_capacity_minimum_one() {
        let (_tx, rx) = event_channel(0, OverflowPolicy::Block);
        assert_eq!(rx.capacity(), 1);
        assert_eq!(rx.policy(), OverflowPolicy::Block);
    }

    #[test]
    fn test_default_policy() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::DropOldest);
    }

    // ==================== DropOldest Tests ====================

    #[tokio::test]
    async fn test_drop_oldest_evicts_head() {
        let (mut tx, mut rx) = event_channel(3, OverflowPolicy::DropOldest);
        for n in 0..3 {
            tx.push(event(n)).await.unwrap();
        }

        let outcome = tx.push(event(3)).await.unwrap();
        assert_eq!(outcome, PushOutcome::Evicted(event(0)));
        assert_eq!(rx.len(), 3);
        assert_eq!(rx.dropped(), 1);

        let received: Vec<Event> = (0..3).filter_map(|_| rx.try_recv()).collect();
        assert_eq!(received, vec![event(1), event(2), event(3)]);
    }

    #[tokio::test]
    async fn test_drop_oldest_never_exceeds_capacity() {
        let (mut tx, rx) = event_channel(4, OverflowPolicy::DropOldest);
        for n in 0..100 {
            tx.push(event(n)).await.unwrap();
            assert!(rx.len() <= 4);
        }
        assert_eq!(rx.len(), 4);
        assert_eq!(rx.dropped(), 96);
    }

    // ==================== Block Tests ====================

    #[tokio::test]
    async fn test_block_waits_for_pull() {
        let (mut tx, mut rx) = event_channel(2, OverflowPolicy::Block);
        tx.push(event(0)).await.unwrap();
        tx.push(event(1)).await.unwrap();

        let producer = tokio::spawn(async move {
            let outcome = tx.push(event(2)).await.unwrap();
            (tx, outcome)
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!producer.is_finished());
        assert_eq!(rx.len(), 2);

        assert_eq!(rx.recv().await.unwrap(), event(0));
        let (_tx, outcome) = producer.await.unwrap();
        assert_eq!(outcome, PushOutcome::Queued);
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.dropped(), 0);

        assert_eq!(rx.recv().await.unwrap(), event(1));
        assert_eq!(rx.recv().await.unwrap(), event(2));
    }

    #[tokio::test]
    async fn test_block_preserves_every_event() {
        let (mut tx, rx) = event_channel(3, OverflowPolicy::Block);

        let producer = tokio::spawn(async move {
            for n in 0..50 {
                tx.push(event(n)).await.unwrap();
            }
        });

        let received: Vec<Event> = rx.into_stream().take(50).collect().await;
        producer.await.unwrap();
        assert_eq!(received, (0..50).map(event).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_block_push_fails_when_closed_while_waiting() {
        let (mut tx, rx) = event_channel(1, OverflowPolicy::Block);
        tx.push(event(0)).await.unwrap();

        let producer = tokio::spawn(async move { tx.push(event(1)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        rx.close();

        let result = producer.await.unwrap();
        assert!(matches!(result, Err(ClientError::ChannelClosed)));
    }

    // ==================== Close Tests ====================

    #[tokio::test]
    async fn test_recv_drains_then_ends_after_close() {
        let (mut tx, mut rx) = event_channel(4, OverflowPolicy::DropOldest);
        tx.push(event(0)).await.unwrap();
        tx.push(event(1)).await.unwrap();
        tx.close();

        assert_eq!(rx.recv().await, Some(event(0)));
        assert_eq!(rx.recv().await, Some(event(1)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_push_after_close() {
        let (mut tx, rx) = event_channel(4, OverflowPolicy::DropOldest);
        rx.close();
        assert!(tx.is_closed());
        assert!(matches!(
            tx.push(event(0)).await,
            Err(ClientError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_receiver_drop_closes() {
        let (mut tx, rx) = event_channel(4, OverflowPolicy::DropOldest);
        drop(rx);
        assert!(matches!(
            tx.push(event(0)).await,
            Err(ClientError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_sender_drop_wakes_receiver() {
        let (tx, mut rx) = event_channel(4, OverflowPolicy::DropOldest);

        let consumer = tokio::spawn(async move { rx.recv().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(tx);

        assert_eq!(consumer.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_closer_from_other_task() {
        let (_tx, mut rx) = event_channel(4, OverflowPolicy::DropOldest);
        let closer = rx.closer();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            closer.close();
        });

        assert_eq!(rx.recv().await, None);
        assert!(rx.is_closed());
    }

    #[tokio::test]
    async fn test_borrowed_stream() {
        let (mut tx, mut rx) = event_channel(4, OverflowPolicy::DropOldest);
        tx.push(event(7)).await.unwrap();
        tx.close();

        let received: Vec<Event> = rx.stream().collect().await;
        assert_eq!(received, vec![event(7)]);
        assert!(rx.is_empty());
    }
}
