use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::warn;

use metron_model::{Buckets, DEFAULT_BUCKETS, InstrumentDescriptor, ModelError};

use crate::{error::MetricError, label::sanitize_name, registry::MetricRegistry};

/// Decides whether an instrument is observed.
pub type InstrumentFilter = Arc<dyn Fn(&InstrumentDescriptor) -> bool + Send + Sync>;
/// Maps an instrument to its export family name.
pub type NameResolver = Arc<dyn Fn(&InstrumentDescriptor) -> String + Send + Sync>;
/// Maps a histogram instrument to its bucket upper bounds.
pub type BucketResolver = Arc<dyn Fn(&InstrumentDescriptor) -> Vec<f64> + Send + Sync>;
/// Maps an instrument to its help text.
pub type HelpResolver = Arc<dyn Fn(&InstrumentDescriptor) -> Option<String> + Send + Sync>;
/// Receives every dropped measurement and rejected binding.
pub type ErrorHandler = Arc<dyn Fn(&InstrumentDescriptor, &MetricError) + Send + Sync>;

/// Default export name: `<meter>_<instrument>`, both parts sanitized.
///
/// # Examples
/// ```
/// use metron_core::adapter::default_metric_name;
/// use metron_model::{InstrumentDescriptor, InstrumentId, InstrumentKind, NumberKind};
///
/// let d = InstrumentDescriptor {
///     id: InstrumentId(0),
///     meter: "test".into(),
///     name: "int_counter".into(),
///     kind: InstrumentKind::Counter,
///     number: NumberKind::I64,
///     unit: None,
///     description: None,
/// };
/// assert_eq!(default_metric_name(&d), "test_int_counter");
/// ```
pub fn default_metric_name(instrument: &InstrumentDescriptor) -> String {
    format!(
        "{}_{}",
        sanitize_name(&instrument.meter),
        sanitize_name(&instrument.name)
    )
}

/// Adapter configuration fixed at start time.
///
/// Every resolver has a default, so `AdapterOptions::new(registry)` observes all instruments with
/// `<meter>_<instrument>` names, standard buckets and descriptions as help text.
#[derive(Clone)]
pub struct AdapterOptions {
    registry: Arc<MetricRegistry>,
    pub(crate) filter: InstrumentFilter,
    pub(crate) name: NameResolver,
    pub(crate) buckets: BucketResolver,
    pub(crate) help: HelpResolver,
    pub(crate) on_error: ErrorHandler,
}

impl AdapterOptions {
    /// Options targeting `registry` with default resolvers.
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self {
            registry,
            filter: Arc::new(|_| true),
            name: Arc::new(default_metric_name),
            buckets: Arc::new(|_| DEFAULT_BUCKETS.to_vec()),
            help: Arc::new(|d| d.description.clone()),
            on_error: Arc::new(log_error),
        }
    }

    /// Build options from a serialized [`AdapterConfig`].
    ///
    /// Buckets are validated here so a bad config fails at startup rather than per instrument.
    pub fn from_config(config: &AdapterConfig, registry: Arc<MetricRegistry>) -> Result<Self, ModelError> {
        let buckets = Buckets::new(config.buckets.clone())?;
        let mut options = Self::new(registry)
            .with_bucket_resolver(move |_| buckets.to_vec());

        if !config.meters.is_empty() {
            let meters = config.meters.clone();
            options = options.with_filter(move |d| meters.iter().any(|m| *m == d.meter));
        }
        if let Some(prefix) = config.name_prefix.as_deref().filter(|p| !p.is_empty()) {
            let prefix = sanitize_name(prefix);
            options = options.with_name_resolver(move |d| format!("{prefix}_{}", default_metric_name(d)));
        }
        if !config.include_help {
            options = options.with_help_resolver(|_| None);
        }
        Ok(options)
    }

    /// Target registry.
    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Only instruments for which `filter` returns `true` are observed. Evaluated once per instrument.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&InstrumentDescriptor) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(filter);
        self
    }

    pub fn with_name_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&InstrumentDescriptor) -> String + Send + Sync + 'static,
    {
        self.name = Arc::new(resolver);
        self
    }

    /// Bucket bounds for histogram instruments; resolved once per instrument.
    pub fn with_bucket_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&InstrumentDescriptor) -> Vec<f64> + Send + Sync + 'static,
    {
        self.buckets = Arc::new(resolver);
        self
    }

    pub fn with_help_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&InstrumentDescriptor) -> Option<String> + Send + Sync + 'static,
    {
        self.help = Arc::new(resolver);
        self
    }

    /// Replace the default handler, which logs a warning.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&InstrumentDescriptor, &MetricError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(handler);
        self
    }
}

impl fmt::Debug for AdapterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterOptions")
            .field("registry", &self.registry)
            .field("filter", &"<fn>")
            .field("name", &"<fn>")
            .field("buckets", &"<fn>")
            .field("help", &"<fn>")
            .field("on_error", &"<fn>")
            .finish()
    }
}

fn log_error(instrument: &InstrumentDescriptor, err: &MetricError) {
    warn!(
        meter = %instrument.meter,
        instrument = %instrument.name,
        kind = err.as_label(),
        "measurement dropped: {err}"
    );
}

/// Serializable subset of [`AdapterOptions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Meter names to observe; empty observes every meter.
    pub meters: Vec<String>,
    /// Extra namespace prepended to every export name.
    pub name_prefix: Option<String>,
    /// Histogram upper bounds used for every histogram instrument.
    pub buckets: Vec<f64>,
    /// Whether instrument descriptions are exported as help text.
    pub include_help: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            meters: Vec::new(),
            name_prefix: None,
            buckets: DEFAULT_BUCKETS.to_vec(),
            include_help: true,
        }
    }
}
