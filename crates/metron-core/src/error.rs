use thiserror::Error;

use metron_model::{MetricKind, ModelError, Number};

/// Failure to record a single measurement.
///
/// Every variant means the measurement was dropped and the store is unchanged for that series.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("metric '{name}' is registered as {existing}, cannot record it as {requested}")]
    KindConflict {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },

    #[error("{update} does not apply to {kind} metric '{name}'")]
    UnsupportedUpdate {
        name: String,
        kind: MetricKind,
        update: &'static str,
    },

    #[error("counter '{name}' is monotonic, rejected increment {value}")]
    NegativeIncrement { name: String, value: Number },

    #[error("non-finite value for '{name}': {value}")]
    NonFinite { name: String, value: Number },

    #[error("value of '{name}' overflows after adding {value}")]
    Overflow { name: String, value: Number },

    #[error("metric '{name}' accumulates integers, cannot add {value}")]
    IncompatibleValue { name: String, value: Number },

    #[error("label '{label}' is reserved on histogram '{name}'")]
    ReservedLabel { name: String, label: &'static str },

    #[error("export name '{name}' is not a valid metric name")]
    InvalidName { name: String },

    #[error("invalid histogram buckets for '{name}': {source}")]
    Buckets {
        name: String,
        #[source]
        source: ModelError,
    },
}

impl MetricError {
    /// Short machine-friendly tag for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            MetricError::KindConflict { .. } => "kind_conflict",
            MetricError::UnsupportedUpdate { .. } => "unsupported_update",
            MetricError::NegativeIncrement { .. } => "negative_increment",
            MetricError::NonFinite { .. } => "non_finite",
            MetricError::Overflow { .. } => "overflow",
            MetricError::IncompatibleValue { .. } => "incompatible_value",
            MetricError::ReservedLabel { .. } => "reserved_label",
            MetricError::InvalidName { .. } => "invalid_name",
            MetricError::Buckets { .. } => "invalid_buckets",
        }
    }
}

/// Failure of a collection pass.
///
/// Output written before the failure must be discarded by the caller.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("collection cancelled")]
    Cancelled,

    #[error("serializer error: {0}")]
    Serialize(#[from] std::io::Error),
}
