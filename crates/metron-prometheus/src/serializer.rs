use std::io;

use async_trait::async_trait;
use prometheus::proto::{
    Bucket, Counter, Gauge, Histogram, LabelPair, Metric, MetricFamily, MetricType,
};
use protobuf::{EnumOrUnknown, MessageField};

use metron_core::{DataPoint, MetricsSerializer, PointSuffix, label::CanonicalLabel};
use metron_model::MetricKind;

/// [`MetricsSerializer`] that assembles prometheus protobuf families.
///
/// The prometheus text model has no exemplars, so exemplars are dropped here.
/// Histogram `+Inf` buckets are dropped too: encoders derive them from the sample count.
#[derive(Debug, Default)]
pub struct ProtoSerializer {
    families: Vec<MetricFamily>,
    pending: Option<PendingHistogram>,
}

#[derive(Debug)]
struct PendingHistogram {
    labels: CanonicalLabel,
    histogram: Histogram,
}

impl ProtoSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Families written so far, in declaration order.
    pub fn into_families(self) -> Vec<MetricFamily> {
        self.families
    }

    fn current(&mut self, point: &DataPoint<'_>) -> io::Result<&mut MetricFamily> {
        match self.families.last_mut() {
            Some(f) if f.name() == point.family => Ok(f),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("data point '{}' written before its family declaration", point.name),
            )),
        }
    }

    fn histogram_for(&mut self, labels: &CanonicalLabel) -> &mut Histogram {
        let stale = self.pending.as_ref().is_some_and(|p| p.labels != *labels);
        if stale {
            self.pending = None;
        }
        &mut self
            .pending
            .get_or_insert_with(|| PendingHistogram {
                labels: labels.clone(),
                histogram: Histogram::default(),
            })
            .histogram
    }
}

#[async_trait]
impl MetricsSerializer for ProtoSerializer {
    async fn write_family_declaration(
        &mut self,
        name: &str,
        kind: MetricKind,
        help: Option<&str>,
    ) -> io::Result<()> {
        self.pending = None;

        let mut family = MetricFamily::default();
        family.name = Some(name.to_string());
        // The text encoder always prints a HELP line; keep it empty rather than absent.
        family.help = Some(help.unwrap_or_default().to_string());
        family.type_ = Some(EnumOrUnknown::new(metric_type(kind)));
        self.families.push(family);
        Ok(())
    }

    async fn write_data_point(&mut self, point: &DataPoint<'_>) -> io::Result<()> {
        let value = point.value.as_f64();
        match point.suffix {
            PointSuffix::None => {
                let family = self.current(point)?;
                let mut metric = metric_with_labels(point.labels);
                if family.type_() == MetricType::COUNTER {
                    let mut counter = Counter::default();
                    counter.value = Some(value);
                    metric.counter = MessageField::some(counter);
                } else {
                    let mut gauge = Gauge::default();
                    gauge.value = Some(value);
                    metric.gauge = MessageField::some(gauge);
                }
                family.metric.push(metric);
            }
            PointSuffix::Bucket => {
                self.current(point)?;
                let upper_bound = point.upper_bound.unwrap_or(f64::INFINITY);
                if upper_bound.is_finite() {
                    let mut bucket = Bucket::default();
                    bucket.upper_bound = Some(upper_bound);
                    bucket.cumulative_count = Some(count(value));
                    self.histogram_for(point.labels).bucket.push(bucket);
                }
            }
            PointSuffix::Sum => {
                self.current(point)?;
                self.histogram_for(point.labels).sample_sum = Some(value);
            }
            PointSuffix::Count => {
                self.current(point)?;
                self.histogram_for(point.labels).sample_count = Some(count(value));

                // `_count` is the last point of a histogram series.
                if let Some(done) = self.pending.take() {
                    let mut metric = metric_with_labels(&done.labels);
                    metric.histogram = MessageField::some(done.histogram);
                    self.current(point)?.metric.push(metric);
                }
            }
        }
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn metric_type(kind: MetricKind) -> MetricType {
    match kind {
        MetricKind::Counter => MetricType::COUNTER,
        MetricKind::Gauge => MetricType::GAUGE,
        MetricKind::Histogram => MetricType::HISTOGRAM,
    }
}

fn metric_with_labels(labels: &CanonicalLabel) -> Metric {
    let mut metric = Metric::default();
    metric.label = labels
        .iter()
        .map(|(name, value)| {
            let mut pair = LabelPair::default();
            pair.name = Some(name.to_string());
            pair.value = Some(value.to_string());
            pair
        })
        .collect();
    metric
}

#[inline]
fn count(v: f64) -> u64 {
    if v.is_sign_negative() { 0 } else { v as u64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use metron_core::{
        MetricRegistry,
        label::canonicalize,
        store::{FamilySpec, Update},
    };
    use metron_model::{Attribute, Buckets, Number};
    use tokio_util::sync::CancellationToken;

    async fn collect(registry: &MetricRegistry) -> Vec<MetricFamily> {
        let mut out = ProtoSerializer::new();
        registry
            .collect_and_serialize(&mut out, &CancellationToken::new())
            .await
            .unwrap();
        out.into_families()
    }

    #[tokio::test]
    async fn builds_counter_and_gauge_families() {
        let registry = Arc::new(MetricRegistry::new());
        let labels = canonicalize(&[Attribute::new("host", "a")]);
        registry
            .store()
            .upsert(
                &FamilySpec::new("jobs", MetricKind::Counter).with_help("jobs run"),
                &labels,
                Update::Increment(Number::I64(4)),
                None,
            )
            .unwrap();
        registry
            .store()
            .upsert(
                &FamilySpec::new("queue", MetricKind::Gauge),
                &labels,
                Update::Set(Number::F64(2.5)),
                None,
            )
            .unwrap();

        let families = collect(&registry).await;
        assert_eq!(families.len(), 2);

        let jobs = &families[0];
        assert_eq!(jobs.name(), "jobs");
        assert_eq!(jobs.help(), "jobs run");
        assert_eq!(jobs.type_(), MetricType::COUNTER);
        assert_eq!(jobs.metric[0].counter.value(), 4.0);
        assert_eq!(jobs.metric[0].label[0].name(), "host");
        assert_eq!(jobs.metric[0].label[0].value(), "a");

        let queue = &families[1];
        assert_eq!(queue.type_(), MetricType::GAUGE);
        assert_eq!(queue.metric[0].gauge.value(), 2.5);
    }

    #[tokio::test]
    async fn builds_one_histogram_per_series() {
        let registry = MetricRegistry::new();
        let spec = FamilySpec::new("latency", MetricKind::Histogram)
            .with_buckets(Buckets::new(vec![1.0, 2.0]).unwrap());
        for (route, v) in [("a", 0.5), ("a", 3.0), ("b", 1.5)] {
            registry
                .store()
                .upsert(
                    &spec,
                    &canonicalize(&[Attribute::new("route", route)]),
                    Update::Observe(Number::F64(v)),
                    None,
                )
                .unwrap();
        }

        let families = collect(&registry).await;
        let latency = &families[0];
        assert_eq!(latency.type_(), MetricType::HISTOGRAM);
        assert_eq!(latency.metric.len(), 2);

        let a = &latency.metric[0].histogram;
        assert_eq!(a.sample_count(), 2);
        assert_eq!(a.sample_sum(), 3.5);
        let bounds: Vec<(f64, u64)> = a
            .bucket
            .iter()
            .map(|b| (b.upper_bound(), b.cumulative_count()))
            .collect();
        assert_eq!(bounds, [(1.0, 1), (2.0, 1)]);

        let b = &latency.metric[1];
        assert_eq!(b.label[0].value(), "b");
        assert_eq!(b.histogram.sample_count(), 1);
    }

    #[tokio::test]
    async fn point_without_declaration_is_an_error() {
        let mut out = ProtoSerializer::new();
        let labels = CanonicalLabel::new();
        let point = DataPoint {
            name: "orphan",
            family: "orphan",
            suffix: PointSuffix::None,
            labels: &labels,
            flattened: "",
            upper_bound: None,
            value: Number::I64(1),
            exemplar: None,
        };
        let err = out.write_data_point(&point).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
