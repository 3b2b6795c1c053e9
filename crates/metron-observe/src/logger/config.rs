use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use super::{LoggerFormat, LoggerLevel};

/// Logger settings, usually loaded from the binary's config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directives, e.g. `"metron_core=debug,info"`.
    pub level: LoggerLevel,
    /// Print the event target (module path).
    pub with_targets: bool,
    /// Allow ANSI colors; only honored when stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: LoggerLevel::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Resolve colors against the current stdout. Call at install time, not at parse time.
    pub fn should_use_color(&self) -> bool {
        self.use_color && self.format == LoggerFormat::Text && std::io::stdout().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = LoggerConfig::default();
        assert_eq!(cfg.format, LoggerFormat::Text);
        assert_eq!(cfg.level.as_str(), "info");
        assert!(cfg.with_targets);
        assert!(cfg.use_color);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: LoggerConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level, LoggerLevel::default());
        assert!(cfg.with_targets);
    }

    #[test]
    fn json_never_uses_color() {
        let cfg = LoggerConfig {
            format: LoggerFormat::Json,
            use_color: true,
            ..Default::default()
        };
        assert!(!cfg.should_use_color());
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = LoggerConfig {
            format: LoggerFormat::Json,
            level: "metron_core=debug,warn".parse().unwrap(),
            with_targets: false,
            use_color: false,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(serde_json::from_str::<LoggerConfig>(&json).unwrap(), cfg);
    }

    #[test]
    fn invalid_level_fails_the_whole_config() {
        let err = serde_json::from_str::<LoggerConfig>(r#"{"level":"metron=shout"}"#);
        assert!(err.is_err());
    }
}
