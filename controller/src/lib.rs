//! # maestro-controller
//!
//! Drives a mission through its lifecycle state machine
//! (`pending → planning → running → {paused, stopped, failed, completed}`),
//! fanning out Planner/Researcher/Reflector/Writer calls within a
//! `max_concurrent_requests` bound and checking a cooperative cancellation
//! flag at every phase boundary.

pub mod controller;
pub mod error;
pub mod request;

pub use controller::MissionController;
pub use error::{ControllerError, Result};
pub use request::{build_settings, CreateMissionRequest};
