//! # maestro-persistence
//!
//! A Postgres-backed [`ContextWriter`](maestro_context::ContextWriter) for
//! mission state, plus the read-side queries the root facade uses to serve
//! history (logs, notes, outline revisions, report versions) back to users.
//!
//! Mutations flow in through [`PersistenceGateway::write_batch`], called by
//! `maestro-context`'s write-behind flush; reads go straight through the
//! `list_*`/`get_*` methods. [`PersistenceGateway::load_mission_state`]
//! rebuilds a mission's full in-memory state from history, for restoring a
//! paused or interrupted mission after a process restart.

pub mod error;
pub mod gateway;
pub mod pagination;
pub mod rows;

pub use error::{PersistenceError, Result};
pub use gateway::PersistenceGateway;
pub use pagination::Pagination;
pub use rows::MissionRecord;
