use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use super::LoggerError;

const DEFAULT_LEVEL: &str = "info";

/// Validated `EnvFilter` directive string, e.g. `"metron_core=debug,info"`.
///
/// Validation happens on construction, so a bad filter in a config file fails at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    /// # Examples
    /// ```
    /// use metron_observe::LoggerLevel;
    ///
    /// let lvl = LoggerLevel::new("metron_core=trace,warn").unwrap();
    /// assert_eq!(lvl.as_str(), "metron_core=trace,warn");
    /// assert!(LoggerLevel::new("metron_core=loud").is_err());
    /// ```
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the filter; falls back to `info` if the directive somehow stopped parsing.
    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.0).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self(DEFAULT_LEVEL.to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        EnvFilter::try_new(&s)
            .map(|_| Self(s.clone()))
            .map_err(|e| LoggerError::InvalidLevel(format!("{s}: {e}")))
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_levels_and_directives() {
        for lvl in ["trace", "debug", "info", "warn", "error", "metron_core::adapter=debug,info"] {
            assert!(lvl.parse::<LoggerLevel>().is_ok(), "{lvl} should parse");
        }
    }

    #[test]
    fn rejects_unknown_levels() {
        for lvl in ["metron_core=chatty", "a=info,b=nope"] {
            assert!(
                matches!(LoggerLevel::from_str(lvl), Err(LoggerError::InvalidLevel(_))),
                "{lvl} should be rejected"
            );
        }
    }

    #[test]
    fn default_is_info() {
        assert_eq!(LoggerLevel::default().as_str(), "info");
        let _ = LoggerLevel::default().to_env_filter();
    }

    #[test]
    fn serde_validates_on_load() {
        let lvl: LoggerLevel = serde_json::from_str(r#""metron_core=trace,info""#).unwrap();
        assert_eq!(serde_json::to_string(&lvl).unwrap(), r#""metron_core=trace,info""#);
        assert!(serde_json::from_str::<LoggerLevel>(r#""x=bogus""#).is_err());
    }
}
