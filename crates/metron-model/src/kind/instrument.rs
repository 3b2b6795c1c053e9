use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{NumberKind, error::ModelError, kind::MetricKind};

/// Process-unique identity of a published instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(pub u64);

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instrument-{}", self.0)
    }
}

/// Kind of instrument as declared by instrumentation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Monotonic increments pushed by the caller.
    Counter,
    /// Signed increments pushed by the caller.
    UpDownCounter,
    /// Distribution of recorded values.
    Histogram,
    /// Cumulative total reported by a callback at collection time.
    ObservableCounter,
    /// Cumulative signed total reported by a callback at collection time.
    ObservableUpDownCounter,
    /// Current value reported by a callback at collection time.
    ObservableGauge,
}

impl InstrumentKind {
    /// Metric family kind this instrument is exported as.
    #[inline]
    pub fn metric_kind(&self) -> MetricKind {
        match self {
            InstrumentKind::Counter | InstrumentKind::ObservableCounter => MetricKind::Counter,
            InstrumentKind::UpDownCounter
            | InstrumentKind::ObservableUpDownCounter
            | InstrumentKind::ObservableGauge => MetricKind::Gauge,
            InstrumentKind::Histogram => MetricKind::Histogram,
        }
    }

    /// Returns `true` for callback-driven instruments.
    #[inline]
    pub fn is_observable(&self) -> bool {
        matches!(
            self,
            InstrumentKind::ObservableCounter
                | InstrumentKind::ObservableUpDownCounter
                | InstrumentKind::ObservableGauge
        )
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::UpDownCounter => "up_down_counter",
            InstrumentKind::Histogram => "histogram",
            InstrumentKind::ObservableCounter => "observable_counter",
            InstrumentKind::ObservableUpDownCounter => "observable_up_down_counter",
            InstrumentKind::ObservableGauge => "observable_gauge",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentKind {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        match norm.as_str() {
            "counter" => Ok(Self::Counter),
            "up_down_counter" => Ok(Self::UpDownCounter),
            "histogram" => Ok(Self::Histogram),
            "observable_counter" => Ok(Self::ObservableCounter),
            "observable_up_down_counter" => Ok(Self::ObservableUpDownCounter),
            "observable_gauge" => Ok(Self::ObservableGauge),
            _ => Err(ModelError::UnknownInstrumentKind(s.to_string())),
        }
    }
}

/// Static description of an instrument, shared with every listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentDescriptor {
    /// Identity assigned when the instrument was published.
    pub id: InstrumentId,
    /// Name of the meter that created the instrument.
    pub meter: String,
    /// Declared instrument name.
    pub name: String,
    /// Instrument kind.
    pub kind: InstrumentKind,
    /// Numeric family of reported values.
    pub number: NumberKind,
    /// Declared unit, if any.
    pub unit: Option<String>,
    /// Declared description, if any.
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_metric_kind() {
        assert_eq!(InstrumentKind::Counter.metric_kind(), MetricKind::Counter);
        assert_eq!(
            InstrumentKind::ObservableCounter.metric_kind(),
            MetricKind::Counter
        );
        assert_eq!(InstrumentKind::UpDownCounter.metric_kind(), MetricKind::Gauge);
        assert_eq!(InstrumentKind::ObservableGauge.metric_kind(), MetricKind::Gauge);
        assert_eq!(InstrumentKind::Histogram.metric_kind(), MetricKind::Histogram);
    }

    #[test]
    fn observable_flag() {
        assert!(InstrumentKind::ObservableGauge.is_observable());
        assert!(!InstrumentKind::Histogram.is_observable());
    }

    #[test]
    fn parses_dashes_and_case() {
        assert_eq!(
            "Up-Down-Counter".parse::<InstrumentKind>().unwrap(),
            InstrumentKind::UpDownCounter
        );
        assert!("timer".parse::<InstrumentKind>().is_err());
    }

    #[test]
    fn id_display() {
        assert_eq!(InstrumentId(7).to_string(), "instrument-7");
    }
}
