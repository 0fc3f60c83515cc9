//! Opaque, ULID-backed identifiers.
//!
//! Every entity the engine tracks (missions, sections, notes, goals, thoughts,
//! report versions, outline-history rows) gets its own newtype so that the
//! compiler — not a naming convention — stops a `NoteId` from being passed
//! where a `SectionId` is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generates a fresh, time-sortable identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Ulid::from_str(s)?))
            }
        }

        impl schemars::JsonSchema for $name {
            fn schema_name() -> std::borrow::Cow<'static, str> {
                std::borrow::Cow::Borrowed(stringify!($name))
            }

            fn json_schema(
                generator: &mut schemars::SchemaGenerator,
            ) -> schemars::Schema {
                <String as schemars::JsonSchema>::json_schema(generator)
            }
        }
    };
}

opaque_id!(MissionId, "Identifies a single user research mission.");
opaque_id!(SectionId, "Identifies a node in an outline tree.");
opaque_id!(NoteId, "Identifies an atomic, cited claim extracted by a Researcher.");
opaque_id!(GoalId, "Identifies an entry in a mission's goal pad.");
opaque_id!(ThoughtId, "Identifies an entry in a mission's thought pad.");
opaque_id!(OutlineHistoryId, "Identifies an append-only outline snapshot row.");
opaque_id!(ReportVersionId, "Identifies a rendered report version.");
opaque_id!(LogId, "Identifies a single append-only log entry.");
opaque_id!(ChunkId, "Identifies a chunk of ingested document text.");
opaque_id!(DocId, "Identifies a source document owned by the ingestion collaborator.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let id = MissionId::new();
        let printed = id.to_string();
        let parsed: MissionId = printed.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_ids_are_distinct() {
        assert_ne!(MissionId::new(), MissionId::new());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = NoteId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
