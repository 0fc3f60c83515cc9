//! The envelope carried over every topic.

use maestro_core::MissionId;
use serde::{Deserialize, Serialize};

use crate::topic::Topic;

/// One published event, with its position in the topic's ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    /// Mission this event belongs to.
    pub mission_id: MissionId,
    /// Topic this event was published on.
    pub topic: Topic,
    /// Monotonically increasing position within the topic (per mission).
    /// Subscribers use this to resume after a gap; a jump greater than one
    /// means the ring buffer dropped messages before they could be read.
    pub seq: u64,
    /// Event payload, shaped by whichever agent published it.
    pub payload: serde_json::Value,
}
