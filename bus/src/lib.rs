//! # maestro-bus
//!
//! In-process pub/sub for mission progress: one bounded, drop-oldest ring
//! buffer per `(mission_id, topic)` pair, created lazily. Agents publish
//! structured updates as they work; anything watching a mission (a status
//! endpoint, a CLI, a test) subscribes and replays from wherever its cursor
//! last left off.
//!
//! This is strictly in-process broadcast, not a durable log — `maestro-bus`
//! never touches disk. Anything that must survive a process restart belongs
//! in `maestro-context` or `maestro-persistence` instead.

mod channel;
mod message;
mod topic;

use std::collections::HashMap;

use maestro_core::MissionId;
use parking_lot::RwLock;
use serde::Serialize;

pub use channel::Subscription;
pub use message::BusMessage;
pub use topic::Topic;

use channel::TopicChannel;

/// Ring-buffer capacity applied to every topic unless overridden.
pub const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// The mission event bus: a registry of per-`(mission, topic)` ring buffers.
pub struct EventBus {
    capacity: usize,
    channels: RwLock<HashMap<(MissionId, Topic), TopicChannel>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("topics", &self.channels.read().len()).finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus whose topics each hold up to `capacity` messages before
    /// dropping the oldest.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, channels: RwLock::new(HashMap::new()) }
    }

    fn channel_for(&self, mission_id: MissionId, topic: Topic) -> TopicChannel {
        if let Some(channel) = self.channels.read().get(&(mission_id, topic)) {
            return channel.clone();
        }
        let mut channels = self.channels.write();
        channels.entry((mission_id, topic)).or_insert_with(|| TopicChannel::new(self.capacity)).clone()
    }

    /// Publishes `payload` on `topic` for `mission_id`. Serialization failure
    /// is logged and the message is dropped — a malformed event must never
    /// abort the mission that produced it.
    pub fn publish(&self, mission_id: MissionId, topic: Topic, payload: &impl Serialize) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(%mission_id, ?topic, error = %err, "failed to serialize bus payload, dropping");
                return;
            }
        };
        let message = BusMessage { mission_id, topic, seq: 0, payload };
        self.channel_for(mission_id, topic).publish(message);
    }

    /// Subscribes to `topic` for `mission_id`, replaying nothing already
    /// published (start from "now"). Use [`EventBus::subscribe_from`] to
    /// resume a prior cursor.
    #[must_use]
    pub fn subscribe(&self, mission_id: MissionId, topic: Topic) -> Subscription {
        self.channel_for(mission_id, topic).subscribe_from(0)
    }

    /// Subscribes to `topic` for `mission_id`, replaying everything after
    /// `cursor` that the ring buffer still holds.
    #[must_use]
    pub fn subscribe_from(&self, mission_id: MissionId, topic: Topic, cursor: u64) -> Subscription {
        self.channel_for(mission_id, topic).subscribe_from(cursor)
    }

    /// Drops every ring buffer belonging to `mission_id`, e.g. once a mission
    /// is archived and nothing will subscribe to it again.
    pub fn forget_mission(&self, mission_id: MissionId) {
        self.channels.write().retain(|(id, _), _| *id != mission_id);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn publish_then_subscribe_from_zero_sees_it() {
        let bus = EventBus::new(16);
        let mission_id = MissionId::new();
        bus.publish(mission_id, Topic::Logs, &json!({"line": "started"}));

        let mut sub = bus.subscribe_from(mission_id, Topic::Logs, 0);
        let message = sub.recv().await.unwrap();
        assert_eq!(message.payload, json!({"line": "started"}));
    }

    #[tokio::test]
    async fn subscribe_without_cursor_only_sees_future_messages() {
        let bus = EventBus::new(16);
        let mission_id = MissionId::new();
        bus.publish(mission_id, Topic::Status, &json!({"state": "planning"}));

        let mut sub = bus.subscribe(mission_id, Topic::Status);
        bus.publish(mission_id, Topic::Status, &json!({"state": "running"}));

        let message = sub.recv().await.unwrap();
        assert_eq!(message.payload, json!({"state": "running"}));
    }

    #[tokio::test]
    async fn topics_are_isolated_per_mission() {
        let bus = EventBus::new(16);
        let mission_a = MissionId::new();
        let mission_b = MissionId::new();
        bus.publish(mission_a, Topic::Logs, &json!({"line": "a"}));

        let mut sub_b = bus.subscribe_from(mission_b, Topic::Logs, 0);
        bus.publish(mission_b, Topic::Logs, &json!({"line": "b"}));
        let message = sub_b.recv().await.unwrap();
        assert_eq!(message.payload, json!({"line": "b"}));
    }

    #[test]
    fn forget_mission_drops_its_channels() {
        let bus = EventBus::new(16);
        let mission_id = MissionId::new();
        bus.publish(mission_id, Topic::Logs, &json!({}));
        assert_eq!(bus.channels.read().len(), 1);
        bus.forget_mission(mission_id);
        assert_eq!(bus.channels.read().len(), 0);
    }
}
