use std::collections::HashMap;

use serde::Serialize;

pub const MAINTENANCE_MODE: &str = "maintenance_mode";
pub const MAINTENANCE_MESSAGE: &str = "maintenance_message";

pub const DEFAULT_MAINTENANCE_MESSAGE: &str = "Service is under maintenance";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceStatus {
    pub enabled: bool,
    pub message: String,
}

impl MaintenanceStatus {
    /// Build from raw `app_settings` rows. `"1"` and `"true"` mean enabled.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let enabled = settings
            .get(MAINTENANCE_MODE)
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);
        let message = settings.get(MAINTENANCE_MESSAGE).cloned().unwrap_or_default();
        MaintenanceStatus { enabled, message }
    }

    pub fn mode_value(&self) -> &'static str {
        if self.enabled {
            "1"
        } else {
            "0"
        }
    }

    pub fn display_message(&self) -> &str {
        if self.message.is_empty() {
            DEFAULT_MAINTENANCE_MESSAGE
        } else {
            &self.message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enabled_values() {
        let mut settings = HashMap::new();
        settings.insert(MAINTENANCE_MODE.to_string(), "true".to_string());
        assert!(MaintenanceStatus::from_settings(&settings).enabled);

        settings.insert(MAINTENANCE_MODE.to_string(), "0".to_string());
        settings.insert(MAINTENANCE_MESSAGE.to_string(), "back at 5".to_string());
        let status = MaintenanceStatus::from_settings(&settings);
        assert!(!status.enabled);
        assert_eq!(status.display_message(), "back at 5");
    }

    #[test]
    fn missing_rows_mean_disabled() {
        let status = MaintenanceStatus::from_settings(&HashMap::new());
        assert_eq!(status, MaintenanceStatus::default());
        assert_eq!(status.display_message(), DEFAULT_MAINTENANCE_MESSAGE);
    }
}
