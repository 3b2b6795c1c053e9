use std::sync::Arc;

use metron_core::{AdapterOptions, CollectError, MeterAdapter, MetricRegistry, instrument::MeterProvider};
use metron_model::Attribute;
use metron_prometheus::{ExportError, PrometheusExporter};
use tokio_util::sync::CancellationToken;

fn setup() -> (MeterProvider, Arc<MetricRegistry>, metron_core::AdapterHandle) {
    let provider = MeterProvider::new();
    let registry = Arc::new(MetricRegistry::new());
    let adapter = MeterAdapter::start_listening(
        Arc::new(provider.clone()),
        AdapterOptions::new(registry.clone())
            .with_filter(|i| i.meter == "test")
            .with_bucket_resolver(|_| vec![1.0, 2.0, 3.0, 4.0]),
    );
    (provider, registry, adapter)
}

#[tokio::test]
async fn renders_counter_text() {
    let (provider, registry, _adapter) = setup();
    let meter = provider.meter("test");
    let counter = meter
        .counter::<i64>("int_counter")
        .with_description("an integer counter")
        .build();
    counter.add(3, &[Attribute::new("l1", "value")]);

    let text = PrometheusExporter::new(registry)
        .render(&CancellationToken::new())
        .await
        .unwrap();

    assert!(text.contains("# HELP test_int_counter an integer counter"), "{text}");
    assert!(text.contains("# TYPE test_int_counter counter"), "{text}");
    assert!(text.contains(r#"test_int_counter{l1="value"} 3"#), "{text}");
}

#[tokio::test]
async fn renders_histogram_text() {
    let (provider, registry, _adapter) = setup();
    let histogram = provider.meter("test").histogram::<f64>("histogram").build();
    for v in [0.5, 2.5, 10.0] {
        histogram.record(v, &[]);
    }

    let text = PrometheusExporter::new(registry)
        .render(&CancellationToken::new())
        .await
        .unwrap();

    assert!(text.contains("# TYPE test_histogram histogram"), "{text}");
    assert!(text.contains(r#"test_histogram_bucket{le="1"} 1"#), "{text}");
    assert!(text.contains(r#"test_histogram_bucket{le="3"} 2"#), "{text}");
    assert!(text.contains(r#"test_histogram_bucket{le="+Inf"} 3"#), "{text}");
    assert!(text.contains("test_histogram_sum 13"), "{text}");
    assert!(text.contains("test_histogram_count 3"), "{text}");
}

#[tokio::test]
async fn gather_skips_filtered_meters() {
    let (provider, registry, _adapter) = setup();
    provider.meter("test").counter::<i64>("kept").build().add(1, &[]);
    provider.meter("other").counter::<i64>("dropped").build().add(1, &[]);

    let exporter = PrometheusExporter::new(registry.clone());
    assert!(Arc::ptr_eq(exporter.registry(), &registry));
    let families = exporter
        .gather(&CancellationToken::new())
        .await
        .unwrap();
    let names: Vec<&str> = families.iter().map(|f| f.name()).collect();
    assert_eq!(names, ["test_kept"]);
}

#[tokio::test]
async fn cancelled_render_fails() {
    let (_provider, registry, _adapter) = setup();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = PrometheusExporter::new(registry).render(&cancel).await.unwrap_err();
    assert!(matches!(err, ExportError::Collect(CollectError::Cancelled)));
}
