//! # maestro-agents
//!
//! The five agent roles that drive a mission: [`planner::Planner`] builds
//! and revises the outline, [`researcher::Researcher`] runs search cycles
//! per section, [`reflector::Reflector`] judges sufficiency and grows the
//! outline, [`writer::Writer`] renders cited markdown, and
//! [`messenger::Messenger`] is the only agent that talks to the user
//! directly.
//!
//! Every agent prompt is an Askama template under `templates/`, versioned
//! with a `PROMPT_VERSION` constant logged on each invocation so a prompt
//! change is visible in a mission's log stream. A malformed artefact from
//! the model isn't a hard failure: [`validate::validate_with_repair`] feeds
//! the validator's complaint back to the model for up to two repair
//! attempts before giving up on the step.

pub mod error;
pub mod messenger;
pub mod planner;
pub mod reflector;
pub mod researcher;
pub mod validate;
pub mod writer;

pub use error::{AgentError, Result};
pub use messenger::{DefaultMessenger, InFlightReply, Messenger, NormalizedRequest};
pub use planner::{DefaultPlanner, Planner};
pub use reflector::{DefaultReflector, ReflectionOutcome, Reflector};
pub use researcher::{DefaultResearcher, ResearchCycleOutcome, Researcher};
pub use writer::{citation_key, DefaultWriter, Writer};
