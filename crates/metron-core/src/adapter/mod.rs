//! Instrument-to-registry adapter.
//!
//! [`MeterAdapter::start_listening`] attaches to an [`InstrumentSource`], binds every accepted instrument
//! to a metric family and folds its measurements into the registry's store. The returned
//! [`AdapterHandle`] is the only resource to release: dropping or disposing it detaches everything.
mod binding;
use binding::InstrumentBinding;

mod options;
pub use options::{
    AdapterConfig, AdapterOptions, BucketResolver, ErrorHandler, HelpResolver, InstrumentFilter,
    NameResolver, default_metric_name,
};

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, PoisonError, RwLock, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use metron_model::{InstrumentDescriptor, InstrumentId};
use tracing::{debug, info, trace};

use crate::{
    instrument::{InstrumentListener, InstrumentSource, ListenerId, Measurement},
    registry::HookId,
};

/// Entry point of the adapter.
pub struct MeterAdapter;

impl MeterAdapter {
    /// Start observing `source` and recording into `options.registry()`.
    ///
    /// Instruments already published are offered immediately; later ones as they appear.
    ///
    /// # Example
    /// ```rust
    /// use std::sync::Arc;
    /// use metron_core::{AdapterOptions, MeterAdapter, MetricRegistry, instrument::MeterProvider};
    ///
    /// let provider = MeterProvider::new();
    /// let registry = Arc::new(MetricRegistry::new());
    /// let adapter = MeterAdapter::start_listening(
    ///     Arc::new(provider.clone()),
    ///     AdapterOptions::new(registry.clone()).with_filter(|i| i.meter == "test"),
    /// );
    ///
    /// let counter = provider.meter("test").counter::<i64>("int_counter").build();
    /// counter.add(1, &[]);
    /// assert_eq!(registry.store().series_count(), 1);
    ///
    /// adapter.dispose();
    /// ```
    pub fn start_listening(source: Arc<dyn InstrumentSource>, options: AdapterOptions) -> AdapterHandle {
        let registry = options.registry().clone();
        let listener = Arc::new(AdapterListener {
            options,
            bindings: RwLock::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        });

        let id = source.attach(listener.clone());

        let weak: Weak<dyn InstrumentSource> = Arc::downgrade(&source);
        let hook = registry.add_before_collect(Arc::new(move || {
            if let Some(source) = weak.upgrade() {
                source.record_observables(id);
            }
        }));

        info!(listener = %id, bindings = listener.binding_count(), "meter adapter started");
        AdapterHandle {
            source,
            listener,
            id,
            hook,
            disposed: AtomicBool::new(false),
        }
    }
}

/// Scoped subscription returned by [`MeterAdapter::start_listening`].
///
/// Disposal is idempotent and also runs on drop. Once it returns, no measurement reported afterwards reaches the store.
#[must_use = "dropping the handle stops the adapter"]
pub struct AdapterHandle {
    source: Arc<dyn InstrumentSource>,
    listener: Arc<AdapterListener>,
    id: ListenerId,
    hook: HookId,
    disposed: AtomicBool,
}

impl AdapterHandle {
    /// Detach from the source and the registry.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.listener.disposed.store(true, Ordering::Release);
        self.source.detach(self.id);
        self.listener.options.registry().remove_before_collect(self.hook);
        self.listener
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!(listener = %self.id, "meter adapter disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of instruments currently bound.
    pub fn binding_count(&self) -> usize {
        self.listener.binding_count()
    }

    /// Export family name bound to an instrument, if it is observed.
    pub fn family_name(&self, instrument: InstrumentId) -> Option<String> {
        self.listener
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&instrument)
            .map(|b| b.family().name.clone())
    }
}

impl Drop for AdapterHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("listener", &self.id)
            .field("bindings", &self.binding_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

struct AdapterListener {
    options: AdapterOptions,
    bindings: RwLock<HashMap<InstrumentId, InstrumentBinding>>,
    disposed: AtomicBool,
}

impl AdapterListener {
    fn binding_count(&self) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl InstrumentListener for AdapterListener {
    fn on_instrument_published(&self, instrument: &InstrumentDescriptor) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }
        if !(self.options.filter)(instrument) {
            trace!(meter = %instrument.meter, instrument = %instrument.name, "instrument filtered out");
            return false;
        }

        match InstrumentBinding::resolve(instrument, &self.options) {
            Ok(binding) => {
                debug!(
                    meter = %instrument.meter,
                    instrument = %instrument.name,
                    family = %binding.family().name,
                    kind = %binding.family().kind,
                    "instrument bound"
                );
                self.bindings
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(instrument.id, binding);
                true
            }
            Err(err) => {
                (self.options.on_error)(instrument, &err);
                false
            }
        }
    }

    fn on_measurement(&self, instrument: &InstrumentDescriptor, measurement: &Measurement<'_>) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
        let Some(binding) = bindings.get(&instrument.id) else {
            return;
        };

        if let Err(err) = binding.record(self.options.registry().store(), measurement) {
            (self.options.on_error)(instrument, &err);
        }
    }

    fn on_instrument_disposed(&self, instrument: &InstrumentDescriptor) {
        let removed = self
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&instrument.id);
        if removed.is_some() {
            debug!(meter = %instrument.meter, instrument = %instrument.name, "instrument unbound");
        }
    }
}
