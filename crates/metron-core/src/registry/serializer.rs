use std::{fmt, io};

use async_trait::async_trait;
use metron_model::{MetricKind, Number};

use crate::{label::CanonicalLabel, store::Exemplar};

/// Sample suffix appended to the family name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointSuffix {
    /// Counter and gauge samples.
    None,
    Bucket,
    Sum,
    Count,
}

impl PointSuffix {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointSuffix::None => "",
            PointSuffix::Bucket => "_bucket",
            PointSuffix::Sum => "_sum",
            PointSuffix::Count => "_count",
        }
    }
}

impl fmt::Display for PointSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sample handed to a [`MetricsSerializer`].
///
/// `labels` are the series labels only. For bucket points `flattened` already carries the trailing
/// `le` pair and `upper_bound` holds its numeric value.
#[derive(Debug, Clone, Copy)]
pub struct DataPoint<'a> {
    /// Full sample name, e.g. `http_latency_bucket`.
    pub name: &'a str,
    pub family: &'a str,
    pub suffix: PointSuffix,
    pub labels: &'a CanonicalLabel,
    pub flattened: &'a str,
    pub upper_bound: Option<f64>,
    pub value: Number,
    pub exemplar: Option<&'a Exemplar>,
}

/// Output sink of a collection pass.
///
/// Calls arrive in order: for each family one declaration followed by its points, then a single
/// `write_end` and `flush`. Any error aborts the pass.
#[async_trait]
pub trait MetricsSerializer: Send {
    async fn write_family_declaration(
        &mut self,
        name: &str,
        kind: MetricKind,
        help: Option<&str>,
    ) -> io::Result<()>;

    async fn write_data_point(&mut self, point: &DataPoint<'_>) -> io::Result<()>;

    /// Terminate the output (e.g. an `# EOF` marker). Defaults to nothing.
    async fn write_end(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()>;
}
