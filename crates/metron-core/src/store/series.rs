use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicI64, Ordering},
};

use dashmap::DashMap;
use metron_model::{Buckets, MetricKind, Number, NumberKind};

use super::{Exemplar, FamilySpec, Update, atomic::AtomicF64};
use crate::{error::MetricError, label::CanonicalLabel};

/// Registered family and its series, keyed by flattened label text.
///
/// Name, kind, help and buckets are fixed by the first write.
#[derive(Debug)]
pub(crate) struct Family {
    pub(crate) name: String,
    pub(crate) kind: MetricKind,
    pub(crate) help: Option<String>,
    pub(crate) buckets: Buckets,
    series: DashMap<String, Arc<Series>>,
}

impl Family {
    pub(crate) fn from_spec(spec: &FamilySpec) -> Self {
        Self {
            name: spec.name.clone(),
            kind: spec.kind,
            help: spec.help.clone(),
            buckets: spec.buckets.clone().unwrap_or_default(),
            series: DashMap::new(),
        }
    }

    /// Get or create the series for `labels`.
    pub(crate) fn series(&self, labels: &CanonicalLabel, number: NumberKind) -> Arc<Series> {
        let flattened = labels.flatten();
        let existing = self.series.get(&flattened).map(|s| Arc::clone(s.value()));
        if let Some(series) = existing {
            return series;
        }
        self.series
            .entry(flattened.clone())
            .or_insert_with(|| Arc::new(Series::new(self, labels.clone(), flattened, number)))
            .value()
            .clone()
    }

    #[inline]
    pub(crate) fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Clone the series handles; no map lock is held once this returns.
    pub(crate) fn series_handles(&self) -> Vec<Arc<Series>> {
        self.series.iter().map(|s| Arc::clone(s.value())).collect()
    }
}

/// One family restricted to one canonical label set.
#[derive(Debug)]
pub(crate) struct Series {
    labels: CanonicalLabel,
    flattened: String,
    acc: Accumulator,
}

#[derive(Debug)]
enum Accumulator {
    Scalar {
        sum: Scalar,
        exemplar: Mutex<Option<Exemplar>>,
    },
    Histogram(Mutex<HistogramState>),
}

#[derive(Debug)]
enum Scalar {
    Int(AtomicI64),
    Float(AtomicF64),
}

#[derive(Debug, Clone)]
pub(crate) struct HistogramState {
    pub(crate) bounds: Buckets,
    /// Cumulative count per bound.
    pub(crate) counts: Vec<u64>,
    /// Total observations, i.e. the `+Inf` bucket.
    pub(crate) count: u64,
    pub(crate) sum: f64,
    /// Last exemplar per bucket, `+Inf` last.
    pub(crate) exemplars: Vec<Option<Exemplar>>,
}

/// Point-in-time read of a series accumulator.
pub(crate) enum Reading {
    Scalar(Number, Option<Exemplar>),
    Histogram(HistogramState),
}

impl Series {
    pub(crate) fn new(
        family: &Family,
        labels: CanonicalLabel,
        flattened: String,
        number: NumberKind,
    ) -> Self {
        let acc = match family.kind {
            MetricKind::Histogram => {
                let bounds = family.buckets.clone();
                Accumulator::Histogram(Mutex::new(HistogramState {
                    counts: vec![0; bounds.len()],
                    count: 0,
                    sum: 0.0,
                    exemplars: vec![None; bounds.len() + 1],
                    bounds,
                }))
            }
            MetricKind::Counter | MetricKind::Gauge => Accumulator::Scalar {
                sum: match number {
                    NumberKind::I64 => Scalar::Int(AtomicI64::new(0)),
                    NumberKind::F64 => Scalar::Float(AtomicF64::new(0.0)),
                },
                exemplar: Mutex::new(None),
            },
        };
        Self {
            labels,
            flattened,
            acc,
        }
    }

    #[inline]
    pub(crate) fn labels(&self) -> &CanonicalLabel {
        &self.labels
    }

    #[inline]
    pub(crate) fn flattened(&self) -> &str {
        &self.flattened
    }

    pub(crate) fn apply(
        &self,
        family: &Family,
        update: Update,
        exemplar: Option<Exemplar>,
    ) -> Result<(), MetricError> {
        match (&self.acc, update) {
            (Accumulator::Histogram(state), Update::Observe(value)) => lock(state)
                .observe(value.as_f64(), exemplar)
                .map_err(|_| MetricError::Overflow {
                    name: family.name.clone(),
                    value,
                }),
            (Accumulator::Scalar { sum, exemplar: slot }, update)
                if !matches!(update, Update::Observe(_)) =>
            {
                sum.apply(&family.name, update)?;
                if let Some(exemplar) = exemplar {
                    *lock(slot) = Some(exemplar);
                }
                Ok(())
            }
            (_, update) => Err(MetricError::UnsupportedUpdate {
                name: family.name.clone(),
                kind: family.kind,
                update: update.as_str(),
            }),
        }
    }

    pub(crate) fn read(&self) -> Reading {
        match &self.acc {
            Accumulator::Scalar { sum, exemplar } => Reading::Scalar(sum.load(), lock(exemplar).clone()),
            Accumulator::Histogram(state) => Reading::Histogram(lock(state).clone()),
        }
    }
}

impl Scalar {
    fn apply(&self, name: &str, update: Update) -> Result<(), MetricError> {
        let value = update.value();
        let overflow = || MetricError::Overflow {
            name: name.to_string(),
            value,
        };

        match self {
            Scalar::Int(cell) => {
                let v = to_i64(name, value)?;
                match update {
                    Update::Increment(_) | Update::Adjust(_) => cell
                        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| cur.checked_add(v))
                        .map(drop)
                        .map_err(|_| overflow()),
                    Update::Set(_) => {
                        cell.store(v, Ordering::Release);
                        Ok(())
                    }
                    Update::Advance(_) => {
                        cell.fetch_max(v, Ordering::AcqRel);
                        Ok(())
                    }
                    Update::Observe(_) => Ok(()),
                }
            }
            Scalar::Float(cell) => {
                let v = value.as_f64();
                match update {
                    Update::Increment(_) | Update::Adjust(_) => cell
                        .fetch_update(|cur| Some(cur + v).filter(|n| n.is_finite()))
                        .map(drop)
                        .map_err(|_| overflow()),
                    Update::Set(_) => {
                        cell.store(v);
                        Ok(())
                    }
                    Update::Advance(_) => {
                        let _ = cell.fetch_update(|cur| (v > cur).then_some(v));
                        Ok(())
                    }
                    Update::Observe(_) => Ok(()),
                }
            }
        }
    }

    fn load(&self) -> Number {
        match self {
            Scalar::Int(cell) => Number::I64(cell.load(Ordering::Acquire)),
            Scalar::Float(cell) => Number::F64(cell.load()),
        }
    }
}

/// Observation would push the histogram sum out of the finite range.
#[derive(Debug)]
struct SumOverflow;

impl HistogramState {
    /// Nothing changes when the new sum is not finite.
    fn observe(&mut self, v: f64, exemplar: Option<Exemplar>) -> Result<(), SumOverflow> {
        let sum = self.sum + v;
        if !sum.is_finite() {
            return Err(SumOverflow);
        }

        let mut first = self.bounds.len();
        for (i, (bound, count)) in self.bounds.iter().zip(self.counts.iter_mut()).enumerate() {
            if *bound >= v {
                *count += 1;
                first = first.min(i);
            }
        }
        self.count += 1;
        self.sum = sum;
        if let Some(exemplar) = exemplar {
            self.exemplars[first] = Some(exemplar);
        }
        Ok(())
    }
}

/// Integer series take integral floats only.
fn to_i64(name: &str, value: Number) -> Result<i64, MetricError> {
    match value {
        Number::I64(v) => Ok(v),
        Number::F64(v) if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 => {
            Ok(v as i64)
        }
        Number::F64(_) => Err(MetricError::IncompatibleValue {
            name: name.to_string(),
            value,
        }),
    }
}

#[inline]
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
