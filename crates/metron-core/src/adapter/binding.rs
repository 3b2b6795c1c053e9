use std::sync::{Arc, OnceLock};

use metron_model::{Buckets, InstrumentDescriptor, InstrumentKind, MetricKind};

use super::options::AdapterOptions;
use crate::{
    error::MetricError,
    instrument::Measurement,
    label::{canonicalize, is_valid_name},
    store::{Exemplar, Family, FamilySpec, Store, Update},
};

/// Resolved export target of one observed instrument.
///
/// Name, help and buckets are resolved once when the instrument is published and never change afterwards.
/// The store family is looked up on the first accepted measurement and reused from then on.
#[derive(Debug)]
pub(crate) struct InstrumentBinding {
    kind: InstrumentKind,
    family: FamilySpec,
    resolved: OnceLock<Arc<Family>>,
}

impl InstrumentBinding {
    pub(crate) fn resolve(
        instrument: &InstrumentDescriptor,
        options: &AdapterOptions,
    ) -> Result<Self, MetricError> {
        let name = (options.name)(instrument);
        if !is_valid_name(&name) {
            return Err(MetricError::InvalidName { name });
        }

        let kind = instrument.kind.metric_kind();
        let mut family = FamilySpec::new(name, kind);
        family.help = (options.help)(instrument);

        if kind == MetricKind::Histogram {
            let buckets = Buckets::new((options.buckets)(instrument)).map_err(|source| {
                MetricError::Buckets {
                    name: family.name.clone(),
                    source,
                }
            })?;
            family.buckets = Some(buckets);
        }

        Ok(Self {
            kind: instrument.kind,
            family,
            resolved: OnceLock::new(),
        })
    }

    #[inline]
    pub(crate) fn family(&self) -> &FamilySpec {
        &self.family
    }

    /// Canonicalize the measurement and fold it into the store.
    pub(crate) fn record(&self, store: &Store, measurement: &Measurement<'_>) -> Result<(), MetricError> {
        let value = measurement.value;
        let update = match self.kind {
            InstrumentKind::Counter => Update::Increment(value),
            InstrumentKind::UpDownCounter => Update::Adjust(value),
            InstrumentKind::Histogram => Update::Observe(value),
            InstrumentKind::ObservableCounter => Update::Advance(value),
            InstrumentKind::ObservableUpDownCounter | InstrumentKind::ObservableGauge => {
                Update::Set(value)
            }
        };

        let labels = canonicalize(measurement.attributes);
        let exemplar = measurement.exemplar.map(|attrs| Exemplar {
            labels: canonicalize(attrs),
            value,
        });
        match self.resolved.get() {
            Some(family) => Store::upsert_resolved(family, &labels, update, exemplar),
            None => {
                // First write goes through the full path so rejected values register nothing.
                store.upsert(&self.family, &labels, update, exemplar)?;
                let family = store.family(&self.family)?;
                let _ = self.resolved.set(family);
                Ok(())
            }
        }
    }
}
