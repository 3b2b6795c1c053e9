use metron_model::{MetricKind, Number};

use super::{
    Exemplar, Store,
    series::{Reading, Series},
};
use crate::label::CanonicalLabel;

/// Immutable view of the whole store, sufficient for one serialization pass.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    /// Families ordered by name. Families without series are omitted.
    pub families: Vec<FamilySnapshot>,
}

impl StoreSnapshot {
    /// Find a family by export name.
    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct FamilySnapshot {
    pub name: String,
    pub kind: MetricKind,
    pub help: Option<String>,
    /// Series ordered by flattened label text.
    pub series: Vec<SeriesSnapshot>,
}

#[derive(Debug, Clone)]
pub struct SeriesSnapshot {
    pub labels: CanonicalLabel,
    pub flattened: String,
    pub value: SeriesValue,
}

#[derive(Debug, Clone)]
pub enum SeriesValue {
    /// Counter or gauge value with its latest exemplar.
    Scalar {
        value: Number,
        exemplar: Option<Exemplar>,
    },
    Histogram(HistogramSnapshot),
}

impl SeriesValue {
    /// Counter or gauge value; `None` for histograms.
    pub fn as_scalar(&self) -> Option<Number> {
        match self {
            SeriesValue::Scalar { value, .. } => Some(*value),
            SeriesValue::Histogram(_) => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&HistogramSnapshot> {
        match self {
            SeriesValue::Scalar { .. } => None,
            SeriesValue::Histogram(h) => Some(h),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistogramSnapshot {
    /// Cumulative buckets; the last one is always `+Inf`.
    pub buckets: Vec<BucketSnapshot>,
    pub count: u64,
    pub sum: f64,
}

#[derive(Debug, Clone)]
pub struct BucketSnapshot {
    pub upper_bound: f64,
    pub cumulative_count: u64,
    pub exemplar: Option<Exemplar>,
}

impl Store {
    /// Take a point-in-time view of every family and series.
    ///
    /// Map locks are held only while the handles are cloned; accumulators are read afterwards,
    /// so writers keep going during the read. Each series is read atomically, the snapshot as a whole is not linearizable.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut families = self.family_handles();
        families.sort_by(|a, b| a.name.cmp(&b.name));

        let families = families
            .into_iter()
            .filter_map(|family| {
                let mut series = family.series_handles();
                if series.is_empty() {
                    return None;
                }
                series.sort_by(|a, b| a.flattened().cmp(b.flattened()));
                Some(FamilySnapshot {
                    name: family.name.clone(),
                    kind: family.kind,
                    help: family.help.clone(),
                    series: series.iter().map(|s| snapshot_series(s)).collect(),
                })
            })
            .collect();

        StoreSnapshot { families }
    }
}

fn snapshot_series(series: &Series) -> SeriesSnapshot {
    let value = match series.read() {
        Reading::Scalar(value, exemplar) => SeriesValue::Scalar { value, exemplar },
        Reading::Histogram(state) => {
            let mut buckets: Vec<BucketSnapshot> = state
                .bounds
                .iter()
                .zip(state.counts.iter())
                .zip(state.exemplars.iter())
                .map(|((bound, count), exemplar)| BucketSnapshot {
                    upper_bound: *bound,
                    cumulative_count: *count,
                    exemplar: exemplar.clone(),
                })
                .collect();
            buckets.push(BucketSnapshot {
                upper_bound: f64::INFINITY,
                cumulative_count: state.count,
                exemplar: state.exemplars.last().cloned().flatten(),
            });
            SeriesValue::Histogram(HistogramSnapshot {
                buckets,
                count: state.count,
                sum: state.sum,
            })
        }
    };

    SeriesSnapshot {
        labels: series.labels().clone(),
        flattened: series.flattened().to_string(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        label::canonicalize,
        store::{FamilySpec, Update},
    };
    use metron_model::{Attribute, Buckets};

    #[test]
    fn families_and_series_are_sorted() {
        let store = Store::new();
        let b = FamilySpec::new("b_total", MetricKind::Counter);
        let a = FamilySpec::new("a_total", MetricKind::Counter);
        for v in ["z", "m", "a"] {
            let l = canonicalize(&[Attribute::new("k", v)]);
            store.upsert(&b, &l, Update::Increment(Number::I64(1)), None).unwrap();
        }
        store
            .upsert(&a, &CanonicalLabel::new(), Update::Increment(Number::I64(1)), None)
            .unwrap();

        let snap = store.snapshot();
        let names: Vec<_> = snap.families.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a_total", "b_total"]);

        let labels: Vec<_> = snap.families[1]
            .series
            .iter()
            .map(|s| s.flattened.as_str())
            .collect();
        assert_eq!(labels, [r#"k="a""#, r#"k="m""#, r#"k="z""#]);
    }

    #[test]
    fn histogram_snapshot_ends_with_inf() {
        let store = Store::new();
        let spec = FamilySpec::new("test_histogram", MetricKind::Histogram)
            .with_buckets(Buckets::new(vec![1.0, 2.0, 3.0, 4.0]).unwrap());
        for v in [1.0, 3.5, 100.0] {
            store
                .upsert(&spec, &CanonicalLabel::new(), Update::Observe(Number::F64(v)), None)
                .unwrap();
        }

        let snap = store.snapshot();
        let h = snap.families[0].series[0].value.as_histogram().unwrap();
        let counts: Vec<_> = h.buckets.iter().map(|b| b.cumulative_count).collect();
        assert_eq!(counts, [1, 1, 1, 2, 3]);
        assert_eq!(h.buckets.last().unwrap().upper_bound, f64::INFINITY);
        assert_eq!(h.count, 3);
        assert!((h.sum - 104.5).abs() < 1e-12);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let store = Store::new();
        let spec = FamilySpec::new("c", MetricKind::Counter);
        let l = CanonicalLabel::new();
        store.upsert(&spec, &l, Update::Increment(Number::I64(1)), None).unwrap();

        let snap = store.snapshot();
        store.upsert(&spec, &l, Update::Increment(Number::I64(1)), None).unwrap();

        assert_eq!(snap.families[0].series[0].value.as_scalar(), Some(Number::I64(1)));
        assert_eq!(
            store.snapshot().families[0].series[0].value.as_scalar(),
            Some(Number::I64(2))
        );
    }

    #[test]
    fn exemplar_is_kept_on_scalar() {
        let store = Store::new();
        let spec = FamilySpec::new("c", MetricKind::Counter);
        let ex = Exemplar {
            labels: canonicalize(&[Attribute::new("trace_id", "abc")]),
            value: Number::I64(1),
        };
        store
            .upsert(&spec, &CanonicalLabel::new(), Update::Increment(Number::I64(1)), Some(ex.clone()))
            .unwrap();

        let snap = store.snapshot();
        match &snap.families[0].series[0].value {
            SeriesValue::Scalar { exemplar, .. } => assert_eq!(exemplar.as_ref(), Some(&ex)),
            other => panic!("unexpected value {other:?}"),
        }
    }
}
