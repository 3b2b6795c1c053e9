mod config;
pub use config::LoggerConfig;

mod error;
pub use error::{LoggerError, LoggerResult};

mod format;
pub use format::LoggerFormat;

mod level;
pub use level::LoggerLevel;

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Returns [`LoggerError::AlreadyInitialized`] if any global subscriber is already set, so tests
/// and embedding applications can call it unconditionally.
///
/// # Examples
/// ```rust
/// use metron_observe::{LoggerConfig, LoggerError, init_logger};
///
/// let cfg = LoggerConfig::default();
/// init_logger(&cfg).unwrap();
/// assert!(matches!(init_logger(&cfg), Err(LoggerError::AlreadyInitialized)));
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter();
    let registry = tracing_subscriber::registry().with(filter);

    match cfg.format {
        LoggerFormat::Text => install(
            registry.with(
                fmt::layer()
                    .with_ansi(cfg.should_use_color())
                    .with_target(cfg.with_targets),
            ),
        ),
        LoggerFormat::Json => install(
            registry.with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(cfg.with_targets)
                    .with_current_span(false),
            ),
        ),
    }
}

fn install<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
