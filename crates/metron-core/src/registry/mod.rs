//! Pull side: the registry owns the store and drives collection passes.
mod serializer;
pub use serializer::{DataPoint, MetricsSerializer, PointSuffix};

use std::{
    fmt, io,
    future::Future,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use metron_model::Number;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    error::CollectError,
    store::{
        BUCKET_LABEL, FamilySnapshot, HistogramSnapshot, SeriesSnapshot, SeriesValue, Store,
        StoreSnapshot,
    },
};

/// Callback run at the start of every collection pass.
pub type BeforeCollect = Arc<dyn Fn() + Send + Sync>;

/// Identity of a registered before-collect hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Metric registry: shared store plus collection hooks.
pub struct MetricRegistry {
    store: Arc<Store>,
    hooks: RwLock<Vec<(HookId, BeforeCollect)>>,
    next_hook: AtomicU64,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::with_store(Arc::new(Store::new()))
    }

    /// Registry over an existing store, e.g. one shared with another registry.
    pub fn with_store(store: Arc<Store>) -> Self {
        Self {
            store,
            hooks: RwLock::new(Vec::new()),
            next_hook: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Register a callback run before every snapshot.
    pub fn add_before_collect(&self, hook: BeforeCollect) -> HookId {
        let id = HookId(self.next_hook.fetch_add(1, Ordering::Relaxed));
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, hook));
        id
    }

    /// Returns `false` if the hook was already removed.
    pub fn remove_before_collect(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        let before = hooks.len();
        hooks.retain(|(h, _)| *h != id);
        hooks.len() != before
    }

    /// Run hooks and take a consistent-per-series snapshot of the store.
    pub fn snapshot(&self) -> StoreSnapshot {
        let hooks: Vec<BeforeCollect> = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for hook in hooks {
            hook();
        }
        self.store.snapshot()
    }

    /// Run one collection pass into `serializer`.
    ///
    /// On error the serializer output is incomplete and should be discarded.
    pub async fn collect_and_serialize(
        &self,
        serializer: &mut dyn MetricsSerializer,
        cancel: &CancellationToken,
    ) -> Result<(), CollectError> {
        if cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }

        let snapshot = self.snapshot();
        debug!(families = snapshot.families.len(), "collection started");

        for family in &snapshot.families {
            guarded(
                cancel,
                serializer.write_family_declaration(&family.name, family.kind, family.help.as_deref()),
            )
            .await?;
            for series in &family.series {
                match &series.value {
                    SeriesValue::Scalar { value, exemplar } => {
                        let point = DataPoint {
                            name: &family.name,
                            family: &family.name,
                            suffix: PointSuffix::None,
                            labels: &series.labels,
                            flattened: &series.flattened,
                            upper_bound: None,
                            value: *value,
                            exemplar: exemplar.as_ref(),
                        };
                        guarded(cancel, serializer.write_data_point(&point)).await?;
                    }
                    SeriesValue::Histogram(h) => {
                        write_histogram(serializer, cancel, family, series, h).await?;
                    }
                }
            }
            trace!(family = %family.name, series = family.series.len(), "family written");
        }

        guarded(cancel, serializer.write_end()).await?;
        guarded(cancel, serializer.flush()).await?;
        debug!("collection finished");
        Ok(())
    }
}

async fn write_histogram(
    serializer: &mut dyn MetricsSerializer,
    cancel: &CancellationToken,
    family: &FamilySnapshot,
    series: &SeriesSnapshot,
    h: &HistogramSnapshot,
) -> Result<(), CollectError> {
    let bucket_name = format!("{}{}", family.name, PointSuffix::Bucket);
    for bucket in &h.buckets {
        let bound = Number::F64(bucket.upper_bound).to_string();
        let flattened = series.labels.flatten_with(BUCKET_LABEL, &bound);
        let point = DataPoint {
            name: &bucket_name,
            family: &family.name,
            suffix: PointSuffix::Bucket,
            labels: &series.labels,
            flattened: &flattened,
            upper_bound: Some(bucket.upper_bound),
            value: Number::I64(count(bucket.cumulative_count)),
            exemplar: bucket.exemplar.as_ref(),
        };
        guarded(cancel, serializer.write_data_point(&point)).await?;
    }

    let sum_name = format!("{}{}", family.name, PointSuffix::Sum);
    let sum = DataPoint {
        name: &sum_name,
        family: &family.name,
        suffix: PointSuffix::Sum,
        labels: &series.labels,
        flattened: &series.flattened,
        upper_bound: None,
        value: Number::F64(h.sum),
        exemplar: None,
    };
    guarded(cancel, serializer.write_data_point(&sum)).await?;

    let count_name = format!("{}{}", family.name, PointSuffix::Count);
    let total = DataPoint {
        name: &count_name,
        family: &family.name,
        suffix: PointSuffix::Count,
        labels: &series.labels,
        flattened: &series.flattened,
        upper_bound: None,
        value: Number::I64(count(h.count)),
        exemplar: None,
    };
    guarded(cancel, serializer.write_data_point(&total)).await
}

#[inline]
fn count(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Race a serializer call against cancellation.
async fn guarded<F>(cancel: &CancellationToken, fut: F) -> Result<(), CollectError>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CollectError::Cancelled),
        res = fut => res.map_err(CollectError::from),
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("MetricRegistry")
            .field("store", &self.store)
            .field("hooks", &hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        label::canonicalize,
        store::{FamilySpec, Update},
    };
    use async_trait::async_trait;
    use metron_model::{Attribute, Buckets, MetricKind};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Capture {
        lines: Vec<String>,
        ended: bool,
        flushed: bool,
    }

    #[async_trait]
    impl MetricsSerializer for Capture {
        async fn write_family_declaration(
            &mut self,
            name: &str,
            kind: MetricKind,
            help: Option<&str>,
        ) -> io::Result<()> {
            self.lines
                .push(format!("# {name} {kind} {}", help.unwrap_or("-")));
            Ok(())
        }

        async fn write_data_point(&mut self, point: &DataPoint<'_>) -> io::Result<()> {
            self.lines
                .push(format!("{}{{{}}} {}", point.name, point.flattened, point.value));
            Ok(())
        }

        async fn write_end(&mut self) -> io::Result<()> {
            self.ended = true;
            Ok(())
        }

        async fn flush(&mut self) -> io::Result<()> {
            self.flushed = true;
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl MetricsSerializer for Broken {
        async fn write_family_declaration(
            &mut self,
            _name: &str,
            _kind: MetricKind,
            _help: Option<&str>,
        ) -> io::Result<()> {
            Ok(())
        }

        async fn write_data_point(&mut self, _point: &DataPoint<'_>) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
        }

        async fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Blocks forever on the first data point.
    struct Stalled {
        started: Arc<Notify>,
        points: usize,
        flushed: bool,
    }

    #[async_trait]
    impl MetricsSerializer for Stalled {
        async fn write_family_declaration(
            &mut self,
            _name: &str,
            _kind: MetricKind,
            _help: Option<&str>,
        ) -> io::Result<()> {
            Ok(())
        }

        async fn write_data_point(&mut self, _point: &DataPoint<'_>) -> io::Result<()> {
            self.points += 1;
            self.started.notify_one();
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn flush(&mut self) -> io::Result<()> {
            self.flushed = true;
            Ok(())
        }
    }

    fn seeded() -> MetricRegistry {
        let registry = MetricRegistry::new();
        let store = registry.store();
        let labels = canonicalize(&[Attribute::new("path", "/a")]);

        store
            .upsert(
                &FamilySpec::new("requests", MetricKind::Counter).with_help("total requests"),
                &labels,
                Update::Increment(Number::I64(3)),
                None,
            )
            .unwrap();
        let latency = FamilySpec::new("latency", MetricKind::Histogram)
            .with_buckets(Buckets::new(vec![1.0, 2.0]).unwrap());
        for v in [0.5, 1.5, 9.0] {
            store
                .upsert(&latency, &labels, Update::Observe(Number::F64(v)), None)
                .unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn collect_writes_families_in_order() {
        let registry = seeded();
        let mut out = Capture::default();
        registry
            .collect_and_serialize(&mut out, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            out.lines,
            [
                "# latency histogram -",
                r#"latency_bucket{path="/a",le="1"} 1"#,
                r#"latency_bucket{path="/a",le="2"} 2"#,
                r#"latency_bucket{path="/a",le="+Inf"} 3"#,
                r#"latency_sum{path="/a"} 11"#,
                r#"latency_count{path="/a"} 3"#,
                "# requests counter total requests",
                r#"requests{path="/a"} 3"#,
            ]
        );
        assert!(out.ended);
        assert!(out.flushed);
    }

    #[tokio::test]
    async fn collect_does_not_mutate_store() {
        let registry = seeded();
        let before = registry.store().series_count();
        for _ in 0..2 {
            registry
                .collect_and_serialize(&mut Capture::default(), &CancellationToken::new())
                .await
                .unwrap();
        }
        assert_eq!(registry.store().series_count(), before);
    }

    #[tokio::test]
    async fn cancelled_collection_stops_early() {
        let registry = seeded();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut out = Capture::default();
        let err = registry.collect_and_serialize(&mut out, &cancel).await.unwrap_err();
        assert!(matches!(err, CollectError::Cancelled));
        assert!(out.lines.is_empty());
        assert!(!out.flushed);
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_write() {
        let registry = seeded();
        let cancel = CancellationToken::new();
        let started = Arc::new(Notify::new());

        let trigger = {
            let started = started.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                started.notified().await;
                cancel.cancel();
            })
        };

        let mut out = Stalled {
            started,
            points: 0,
            flushed: false,
        };
        let err = registry.collect_and_serialize(&mut out, &cancel).await.unwrap_err();
        trigger.await.unwrap();

        assert!(matches!(err, CollectError::Cancelled));
        assert_eq!(out.points, 1);
        assert!(!out.flushed);
    }

    #[tokio::test]
    async fn serializer_error_propagates() {
        let registry = seeded();
        let err = registry
            .collect_and_serialize(&mut Broken, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            CollectError::Serialize(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn hooks_run_before_each_pass() {
        let registry = MetricRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = registry.add_before_collect(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        registry
            .collect_and_serialize(&mut Capture::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(registry.remove_before_collect(id));
        assert!(!registry.remove_before_collect(id));
        registry.snapshot();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_registry_still_terminates_output() {
        let mut out = Capture::default();
        MetricRegistry::new()
            .collect_and_serialize(&mut out, &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.lines.is_empty());
        assert!(out.ended && out.flushed);
    }
}
