//! Prometheus exposition for metron registries.
//!
//! [`ProtoSerializer`] turns a collection pass into `prometheus::proto::MetricFamily` values and
//! [`PrometheusExporter`] encodes them with the text encoder.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use metron_core::{AdapterOptions, MeterAdapter, MetricRegistry, instrument::MeterProvider};
//! use metron_prometheus::PrometheusExporter;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = MeterProvider::new();
//! let registry = Arc::new(MetricRegistry::new());
//! let _adapter = MeterAdapter::start_listening(Arc::new(provider.clone()), AdapterOptions::new(registry.clone()));
//!
//! provider.meter("http").counter::<i64>("requests").build().add(1, &[]);
//!
//! let text = PrometheusExporter::new(registry).render(&CancellationToken::new()).await?;
//! assert!(text.contains("# TYPE http_requests counter"));
//! # Ok(())
//! # }
//! ```
//!
//! ## HTTP Server
//! This crate does NOT provide an HTTP server for the `/metrics` endpoint.
//! Call [`PrometheusExporter::render`] from your application's existing HTTP framework.

mod error;
pub use error::ExportError;

mod exporter;
pub use exporter::PrometheusExporter;

mod serializer;
pub use serializer::ProtoSerializer;

pub use prometheus::{Encoder, TextEncoder};
