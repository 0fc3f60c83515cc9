//! A single topic's bounded, drop-oldest ring buffer with broadcast replay.
//!
//! `async-channel` gives every message to exactly one consumer, which doesn't
//! fit a topic that several independent subscribers (the HTTP status stream,
//! a CLI watcher, a test) all need to replay from their own cursor. Instead
//! each topic keeps its own bounded ring and wakes waiters with
//! `event-listener`, the same notification primitive the teacher's tool
//! request broker layers over `async_channel`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use event_listener::Event;
use parking_lot::Mutex;

use crate::message::BusMessage;

struct RingBuffer {
    items: Mutex<VecDeque<BusMessage>>,
    capacity: usize,
    next_seq: AtomicU64,
    dropped: AtomicU64,
    notify: Event,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            next_seq: AtomicU64::new(1),
            dropped: AtomicU64::new(0),
            notify: Event::new(),
        }
    }

    fn publish(&self, mut message: BusMessage) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        message.seq = seq;
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            items.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        items.push_back(message);
        drop(items);
        self.notify.notify(usize::MAX);
    }

    fn next_after(&self, cursor: u64) -> Option<BusMessage> {
        self.items.lock().iter().find(|m| m.seq > cursor).cloned()
    }
}

/// A topic's publishing handle, shared by every publisher for a
/// `(mission, topic)` pair.
#[derive(Clone)]
pub(crate) struct TopicChannel {
    ring: std::sync::Arc<RingBuffer>,
}

impl TopicChannel {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { ring: std::sync::Arc::new(RingBuffer::new(capacity)) }
    }

    pub(crate) fn publish(&self, message: BusMessage) {
        self.ring.publish(message);
    }

    /// Number of messages dropped from the front of the ring since creation.
    pub(crate) fn dropped_count(&self) -> u64 {
        self.ring.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn subscribe_from(&self, cursor: u64) -> Subscription {
        Subscription {
            ring: std::sync::Arc::clone(&self.ring),
            cursor,
        }
    }
}

/// A single subscriber's cursor into a topic's ring buffer.
pub struct Subscription {
    ring: std::sync::Arc<RingBuffer>,
    cursor: u64,
}

impl Subscription {
    /// Waits for and returns the next message after this subscription's
    /// cursor, advancing the cursor. Returns `None` only if the bus itself is
    /// torn down (never happens in normal operation; kept for API symmetry
    /// with a `Stream`-like shutdown path).
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            let listener = self.ring.notify.listen();
            if let Some(message) = self.ring.next_after(self.cursor) {
                self.cursor = message.seq;
                return Some(message);
            }
            listener.await;
        }
    }

    /// How many messages were evicted from the ring before this subscriber's
    /// cursor could reach them. A non-zero value means history was lost.
    #[must_use]
    pub fn dropped_before_cursor(&self) -> u64 {
        self.ring.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use maestro_core::MissionId;

    use super::*;
    use crate::topic::Topic;

    fn msg(mission_id: MissionId) -> BusMessage {
        BusMessage { mission_id, topic: Topic::Logs, seq: 0, payload: serde_json::json!({}) }
    }

    #[tokio::test]
    async fn subscriber_receives_messages_in_order() {
        let channel = TopicChannel::new(4);
        let mission_id = MissionId::new();
        channel.publish(msg(mission_id));
        channel.publish(msg(mission_id));

        let mut sub = channel.subscribe_from(0);
        let first = sub.recv().await.unwrap();
        let second = sub.recv().await.unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
    }

    #[tokio::test]
    async fn full_ring_drops_oldest() {
        let channel = TopicChannel::new(2);
        let mission_id = MissionId::new();
        for _ in 0..5 {
            channel.publish(msg(mission_id));
        }
        assert_eq!(channel.dropped_count(), 3);

        let mut sub = channel.subscribe_from(0);
        let first = sub.recv().await.unwrap();
        assert_eq!(first.seq, 4);
    }
}
