use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("histogram buckets must not be empty")]
    EmptyBuckets,

    #[error("histogram bucket bound is not finite: {0}")]
    NonFiniteBucket(f64),

    #[error("histogram buckets must be strictly increasing: {prev} >= {next}")]
    UnsortedBuckets { prev: f64, next: f64 },

    #[error("unknown metric kind: {0}")]
    UnknownMetricKind(String),

    #[error("unknown instrument kind: {0}")]
    UnknownInstrumentKind(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
