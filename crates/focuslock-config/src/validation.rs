//! Configuration validation

use crate::schema::RawConfig;
use focuslock_util::AppId;
use std::collections::HashSet;
use thiserror::Error;

/// Minimum number of digits in the parent PIN
pub const MIN_PIN_LENGTH: usize = 4;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid app id in {field}: '{value}'")]
    InvalidAppId { field: &'static str, value: String },

    #[error("Duplicate locked app: {0}")]
    DuplicateLockedApp(String),

    #[error("The service's own app id '{0}' cannot be locked")]
    SelfAppLocked(String),

    #[error("Invalid PIN: {0}")]
    InvalidPin(String),
}

/// Validate a raw configuration, collecting every problem
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for app in &config.locked_apps {
        if !AppId::new(app.as_str()).is_well_formed() {
            errors.push(ValidationError::InvalidAppId {
                field: "locked_apps",
                value: app.clone(),
            });
        }
        if !seen.insert(app.as_str()) {
            errors.push(ValidationError::DuplicateLockedApp(app.clone()));
        }
    }

    if let Some(self_app) = &config.service.self_app_id {
        if !AppId::new(self_app.as_str()).is_well_formed() {
            errors.push(ValidationError::InvalidAppId {
                field: "service.self_app_id",
                value: self_app.clone(),
            });
        }
        if seen.contains(self_app.as_str()) {
            errors.push(ValidationError::SelfAppLocked(self_app.clone()));
        }
    }

    if let Some(pin) = &config.parent.pin {
        errors.extend(validate_pin(pin));
    }

    errors
}

fn validate_pin(pin: &str) -> Option<ValidationError> {
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Some(ValidationError::InvalidPin("must contain only digits".into()));
    }
    if pin.len() < MIN_PIN_LENGTH {
        return Some(ValidationError::InvalidPin(format!(
            "must be at least {} digits",
            MIN_PIN_LENGTH
        )));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawParentConfig, RawServiceConfig};

    fn raw(locked: &[&str]) -> RawConfig {
        RawConfig {
            config_version: 1,
            locked_apps: locked.iter().map(|s| s.to_string()).collect(),
            service: RawServiceConfig::default(),
            parent: RawParentConfig::default(),
        }
    }

    #[test]
    fn accepts_clean_config() {
        assert!(validate_config(&raw(&["com.example.game", "com.example.video"])).is_empty());
    }

    #[test]
    fn rejects_duplicates_and_bad_ids() {
        let errors = validate_config(&raw(&["com.example.game", "com.example.game", "bad id", ""]));
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateLockedApp(id) if id == "com.example.game")));
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidAppId { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn rejects_locking_self() {
        let mut config = raw(&["com.focuslock2"]);
        config.service.self_app_id = Some("com.focuslock2".into());

        let errors = validate_config(&config);
        assert!(matches!(errors.as_slice(), [ValidationError::SelfAppLocked(_)]));
    }

    #[test]
    fn pin_rules() {
        assert!(validate_pin("0000").is_none());
        assert!(validate_pin("123456").is_none());
        assert!(validate_pin("123").is_some());
        assert!(validate_pin("12a4").is_some());
    }
}
