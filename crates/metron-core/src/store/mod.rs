//! Metric series store.
//!
//! The store owns every accumulator. Families live in a [`DashMap`] keyed by export name and each
//! family keeps its own `DashMap` of series keyed by flattened labels. Producers writing the same
//! series only contend on that series' atomics.
mod atomic;

mod series;
pub(crate) use series::Family;

mod snapshot;
pub use snapshot::{BucketSnapshot, FamilySnapshot, HistogramSnapshot, SeriesSnapshot, SeriesValue, StoreSnapshot};

use std::sync::Arc;

use dashmap::DashMap;
use metron_model::{Buckets, MetricKind, Number};
use tracing::{debug, trace};

use crate::{error::MetricError, label::CanonicalLabel};

/// Label name carrying the bucket bound on histogram lines.
pub const BUCKET_LABEL: &str = "le";

/// Export-side description of a metric family.
///
/// The first write for a name registers the family; later specs with the same name must agree on `kind`.
/// `help` and `buckets` of later specs are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySpec {
    /// Export name, e.g. `test_int_counter`.
    pub name: String,
    /// Family kind.
    pub kind: MetricKind,
    /// Optional help text.
    pub help: Option<String>,
    /// Histogram upper bounds; [`Buckets::default`] when absent.
    pub buckets: Option<Buckets>,
}

impl FamilySpec {
    pub fn new(name: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            kind,
            help: None,
            buckets: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_buckets(mut self, buckets: Buckets) -> Self {
        self.buckets = Some(buckets);
        self
    }
}

/// Change applied to one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Update {
    /// Add a non-negative amount to a counter.
    Increment(Number),
    /// Add a signed amount to a gauge.
    Adjust(Number),
    /// Replace a gauge value.
    Set(Number),
    /// Move a counter forward to a cumulative total; lower totals are ignored.
    Advance(Number),
    /// Record one histogram observation.
    Observe(Number),
}

impl Update {
    /// Carried value.
    #[inline]
    pub fn value(&self) -> Number {
        match *self {
            Update::Increment(v)
            | Update::Adjust(v)
            | Update::Set(v)
            | Update::Advance(v)
            | Update::Observe(v) => v,
        }
    }

    /// Family kind this update applies to.
    #[inline]
    pub fn metric_kind(&self) -> MetricKind {
        match self {
            Update::Increment(_) | Update::Advance(_) => MetricKind::Counter,
            Update::Adjust(_) | Update::Set(_) => MetricKind::Gauge,
            Update::Observe(_) => MetricKind::Histogram,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Update::Increment(_) => "increment",
            Update::Adjust(_) => "adjust",
            Update::Set(_) => "set",
            Update::Advance(_) => "advance",
            Update::Observe(_) => "observe",
        }
    }
}

/// Sample measurement attached to a series point.
#[derive(Debug, Clone, PartialEq)]
pub struct Exemplar {
    /// Canonicalized exemplar labels (e.g. `trace_id`).
    pub labels: CanonicalLabel,
    /// Measured value.
    pub value: Number,
}

/// Concurrent map from `(family, canonical label)` to accumulator.
pub struct Store {
    families: DashMap<String, Arc<Family>>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            families: DashMap::new(),
        }
    }

    /// Apply `update` to the series identified by `family` and `labels`, creating both on first use.
    ///
    /// Validation happens before anything is registered, so a rejected first measurement leaves no empty family behind.
    pub fn upsert(
        &self,
        family: &FamilySpec,
        labels: &CanonicalLabel,
        update: Update,
        exemplar: Option<Exemplar>,
    ) -> Result<(), MetricError> {
        validate(&family.name, family.kind, labels, update)?;
        let family = self.family(family)?;
        apply(&family, labels, update, exemplar)
    }

    /// Same as [`Store::upsert`] for a family already resolved through [`Store::family`].
    pub(crate) fn upsert_resolved(
        family: &Family,
        labels: &CanonicalLabel,
        update: Update,
        exemplar: Option<Exemplar>,
    ) -> Result<(), MetricError> {
        validate(&family.name, family.kind, labels, update)?;
        apply(family, labels, update, exemplar)
    }

    /// Number of distinct series.
    pub fn series_count(&self) -> usize {
        self.families.iter().map(|f| f.value().series_count()).sum()
    }

    /// Number of registered families.
    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    /// Get or register the family for `spec`; the first registered kind wins.
    pub(crate) fn family(&self, spec: &FamilySpec) -> Result<Arc<Family>, MetricError> {
        let existing = self.families.get(&spec.name).map(|f| Arc::clone(f.value()));
        let family = match existing {
            Some(f) => f,
            None => self
                .families
                .entry(spec.name.clone())
                .or_insert_with(|| {
                    debug!(family = %spec.name, kind = %spec.kind, "metric family registered");
                    Arc::new(Family::from_spec(spec))
                })
                .value()
                .clone(),
        };

        if family.kind != spec.kind {
            return Err(MetricError::KindConflict {
                name: spec.name.clone(),
                existing: family.kind,
                requested: spec.kind,
            });
        }
        Ok(family)
    }

    /// Clone the family handles; no map lock is held once this returns.
    pub(crate) fn family_handles(&self) -> Vec<Arc<Family>> {
        self.families.iter().map(|f| Arc::clone(f.value())).collect()
    }
}

fn validate(
    name: &str,
    kind: MetricKind,
    labels: &CanonicalLabel,
    update: Update,
) -> Result<(), MetricError> {
    let value = update.value();
    if !value.is_finite() {
        return Err(MetricError::NonFinite {
            name: name.to_string(),
            value,
        });
    }
    if update.metric_kind() != kind {
        return Err(MetricError::UnsupportedUpdate {
            name: name.to_string(),
            kind,
            update: update.as_str(),
        });
    }
    if kind == MetricKind::Counter && value.is_negative() {
        return Err(MetricError::NegativeIncrement {
            name: name.to_string(),
            value,
        });
    }
    if kind == MetricKind::Histogram && labels.contains(BUCKET_LABEL) {
        return Err(MetricError::ReservedLabel {
            name: name.to_string(),
            label: BUCKET_LABEL,
        });
    }
    Ok(())
}

fn apply(
    family: &Family,
    labels: &CanonicalLabel,
    update: Update,
    exemplar: Option<Exemplar>,
) -> Result<(), MetricError> {
    let series = family.series(labels, update.value().kind());
    trace!(family = %family.name, labels = %series.flattened(), update = update.as_str(), "upsert");
    series.apply(family, update, exemplar)
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("families", &self.family_count())
            .field("series", &self.series_count())
            .finish()
    }
}
