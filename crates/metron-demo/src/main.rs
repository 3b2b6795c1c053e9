use std::{env, fs, sync::Arc};

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use metron_core::{
    AdapterConfig, AdapterOptions, MeterAdapter, MetricRegistry,
    instrument::{MeterProvider, Observation},
};
use metron_model::Attribute;
use metron_observe::{LoggerConfig, LoggerLevel, init_logger};
use metron_prometheus::PrometheusExporter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) logger
    let cfg = LoggerConfig {
        level: LoggerLevel::new("info,metron_core=debug")?,
        ..Default::default()
    };
    init_logger(&cfg)?;

    // 2) adapter config: optional JSON file as the first argument
    let config = match env::args().nth(1) {
        Some(path) => {
            let raw = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str::<AdapterConfig>(&raw).with_context(|| format!("parsing {path}"))?
        }
        None => AdapterConfig::default(),
    };

    // 3) registry + adapter
    let provider = MeterProvider::new();
    let registry = Arc::new(MetricRegistry::new());
    let options = AdapterOptions::from_config(&config, registry.clone())?;
    let adapter = MeterAdapter::start_listening(Arc::new(provider.clone()), options);
    info!(?config, "adapter listening");

    // 4) instrumentation
    let meter = provider.meter("demo.http");
    let requests = meter
        .counter::<i64>("requestsTotal")
        .with_description("Handled requests")
        .build();
    let latency = meter
        .histogram::<f64>("latency")
        .with_unit("s")
        .with_description("Request latency in seconds")
        .build();
    let _workers = meter
        .observable_gauge("activeWorkers", || vec![Observation::new(4_i64, vec![])])
        .build();

    let mut tasks = Vec::new();
    for worker in 0..4_i64 {
        let requests = requests.clone();
        let latency = latency.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..250_i64 {
                let attrs = [
                    Attribute::new("Route", if i % 3 == 0 { "/health" } else { "/api" }),
                    Attribute::new("worker", worker),
                ];
                requests.add(1, &attrs);
                latency.record((i % 20) as f64 * 0.01, &attrs[..1]);
            }
        }));
    }
    for task in tasks {
        task.await?;
    }

    // 5) scrape
    let text = PrometheusExporter::new(registry)
        .render(&CancellationToken::new())
        .await?;
    println!("{text}");

    adapter.dispose();
    info!("demo finished");
    Ok(())
}
