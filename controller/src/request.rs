//! Inputs accepted by [`crate::MissionController::create_mission`].

use maestro_core::MissionSettings;

/// A request to start a brand-new mission.
#[derive(Debug, Clone)]
pub struct CreateMissionRequest {
    /// The user's (already normalized) research request.
    pub query: String,
    /// Id of the user who owns this mission.
    pub user_id: String,
    /// Per-field overrides layered onto [`MissionSettings::default`].
    pub settings_overrides: Option<serde_json::Value>,
}

/// Builds a mission's frozen settings by merging `overrides` onto the
/// engine's defaults, field by field. Overrides with an unknown key or the
/// wrong shape for a known key are logged and dropped rather than rejecting
/// the whole mission.
#[must_use]
pub fn build_settings(overrides: Option<&serde_json::Value>) -> MissionSettings {
    let Some(overrides) = overrides else {
        return MissionSettings::default();
    };
    let mut base = serde_json::to_value(MissionSettings::default()).expect("MissionSettings always serializes");
    let serde_json::Value::Object(overrides) = overrides else {
        tracing::warn!("settings_overrides was not a JSON object, ignoring");
        return MissionSettings::default();
    };
    let serde_json::Value::Object(base_map) = &mut base else {
        unreachable!("MissionSettings serializes to a JSON object");
    };
    for (key, value) in overrides {
        if base_map.contains_key(key) {
            base_map.insert(key.clone(), value.clone());
        } else {
            tracing::warn!(%key, "unknown mission setting override, ignoring");
        }
    }
    match serde_json::from_value(base) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(%err, "settings overrides produced an invalid MissionSettings, falling back to defaults");
            MissionSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_overrides_yields_defaults() {
        let settings = build_settings(None);
        assert_eq!(settings.max_concurrent_requests, MissionSettings::default().max_concurrent_requests);
    }

    #[test]
    fn overrides_known_field() {
        let settings = build_settings(Some(&serde_json::json!({"max_concurrent_requests": 8})));
        assert_eq!(settings.max_concurrent_requests, 8);
    }

    #[test]
    fn unknown_field_is_ignored_not_fatal() {
        let settings = build_settings(Some(&serde_json::json!({"not_a_real_field": 8})));
        assert_eq!(settings.max_concurrent_requests, MissionSettings::default().max_concurrent_requests);
    }
}
