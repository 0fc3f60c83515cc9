//! Process-level configuration, layered through the `config` crate: defaults,
//! an optional `maestro.toml`, then `MAESTRO__*` environment overrides.

use serde::Deserialize;

use crate::error::Result;

fn default_max_concurrent_requests() -> u32 {
    8
}

fn default_bus_topic_capacity() -> usize {
    maestro_bus::DEFAULT_TOPIC_CAPACITY
}

/// Engine-wide settings, as distinct from a single mission's
/// [`maestro_core::MissionSettings`]: how many capability calls the whole
/// process may have in flight at once, where the relational store lives, and
/// how wide each bus topic's replay buffer is.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Postgres connection string. `None` runs the engine in-memory only,
    /// with no write-behind persistence or restart recovery.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Process-wide cap on concurrently in-flight Researcher/Writer calls,
    /// shared across every mission the engine is running.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: u32,

    /// Ring-buffer capacity applied to every `(mission, topic)` bus channel.
    #[serde(default = "default_bus_topic_capacity")]
    pub bus_topic_capacity: usize,
}

impl EngineConfig {
    /// Loads configuration from (in increasing precedence) built-in
    /// defaults, an optional `maestro.toml` in the working directory, and
    /// `MAESTRO__*` environment variables (e.g. `MAESTRO__DATABASE_URL`).
    pub fn load() -> Result<Self> {
        let built = config::Config::builder()
            .set_default("max_concurrent_requests", i64::from(default_max_concurrent_requests()))?
            .set_default("bus_topic_capacity", default_bus_topic_capacity() as i64)?
            .add_source(config::File::with_name("maestro").required(false))
            .add_source(config::Environment::with_prefix("MAESTRO").separator("__"))
            .build()?;
        Ok(built.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_falls_back_to_defaults_without_a_config_file() {
        let config = EngineConfig::load().expect("defaults alone must be a valid config");
        assert_eq!(config.max_concurrent_requests, 8);
        assert!(config.database_url.is_none());
    }
}
