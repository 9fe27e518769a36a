// Logger configuration
use serde::{Deserialize, Serialize};

use crate::redactor::RedactionConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub redaction_enabled: bool,
    pub hash_for_correlation: bool,
    /// Upper bound on characters of free text (e.g. a transcript) in one log line.
    pub preview_chars: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            hash_for_correlation: true,
            preview_chars: 80,
        }
    }
}

impl LoggerConfig {
    /// Load from `LOG_REDACTION`, `LOG_REDACTION_HASH` and `LOG_PREVIEW_CHARS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redaction_enabled: env_flag("LOG_REDACTION").unwrap_or(defaults.redaction_enabled),
            hash_for_correlation: env_flag("LOG_REDACTION_HASH")
                .unwrap_or(defaults.hash_for_correlation),
            preview_chars: std::env::var("LOG_PREVIEW_CHARS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.preview_chars),
        }
    }

    pub fn redaction_config(&self) -> RedactionConfig {
        if !self.redaction_enabled {
            return RedactionConfig::disabled();
        }
        RedactionConfig {
            hash_for_correlation: self.hash_for_correlation,
            preview_chars: self.preview_chars,
            ..RedactionConfig::default()
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_logger_config_turns_off_every_pattern() {
        let config = LoggerConfig {
            redaction_enabled: false,
            ..Default::default()
        };
        let redaction = config.redaction_config();
        assert!(!redaction.redact_emails);
        assert!(!redaction.redact_mrns);
    }
}
