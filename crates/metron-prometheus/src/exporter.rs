use std::sync::Arc;

use prometheus::{Encoder, TextEncoder, proto::MetricFamily};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use metron_core::MetricRegistry;

use crate::{error::ExportError, serializer::ProtoSerializer};

/// Prometheus exposition for a [`MetricRegistry`].
///
/// Every call runs a full collection pass, so observable instruments are sampled per scrape.
#[derive(Debug, Clone)]
pub struct PrometheusExporter {
    registry: Arc<MetricRegistry>,
}

impl PrometheusExporter {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Collect all families as prometheus protobuf messages.
    pub async fn gather(&self, cancel: &CancellationToken) -> Result<Vec<MetricFamily>, ExportError> {
        let mut serializer = ProtoSerializer::new();
        self.registry
            .collect_and_serialize(&mut serializer, cancel)
            .await?;
        Ok(serializer.into_families())
    }

    /// Collect and encode in the text exposition format.
    ///
    /// Use this to implement a `/metrics` endpoint; the content type is `TextEncoder::format_type()`.
    pub async fn render(&self, cancel: &CancellationToken) -> Result<String, ExportError> {
        let families = self.gather(cancel).await?;
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        debug!(families = families.len(), bytes = buffer.len(), "metrics rendered");
        Ok(String::from_utf8(buffer)?)
    }
}
