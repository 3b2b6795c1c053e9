use std::sync::{
    Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use metron_model::{Attribute, InstrumentDescriptor, InstrumentId, InstrumentKind, Number, NumberKind};
use tracing::{debug, trace};

use super::{
    InstrumentListener, InstrumentSource, ListenerId, Measurement,
    handle::{InstrumentBuilder, ObserveFn},
};

/// Root of the instrumentation source: creates meters and dispatches to listeners.
///
/// Cloning is cheap; all clones share the same instrument and listener tables.
#[derive(Clone, Default)]
pub struct MeterProvider {
    inner: Arc<ProviderInner>,
}

#[derive(Default)]
pub(crate) struct ProviderInner {
    state: RwLock<ProviderState>,
    next_meter: AtomicU64,
    next_instrument: AtomicU64,
    next_listener: AtomicU64,
}

#[derive(Default)]
struct ProviderState {
    instruments: Vec<Arc<InstrumentCore>>,
    listeners: Vec<Subscriber>,
}

#[derive(Clone)]
struct Subscriber {
    id: ListenerId,
    listener: Arc<dyn InstrumentListener>,
}

impl MeterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a meter. Instrument names are scoped by the meter name on export.
    pub fn meter(&self, name: impl Into<String>) -> Meter {
        Meter {
            id: self.inner.next_meter.fetch_add(1, Ordering::Relaxed),
            name: name.into().into(),
            provider: self.inner.clone(),
        }
    }

    /// Number of live (not disposed) instruments.
    pub fn instrument_count(&self) -> usize {
        read(&self.inner.state).instruments.len()
    }
}

impl InstrumentSource for MeterProvider {
    fn attach(&self, listener: Arc<dyn InstrumentListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        let mut state = write(&self.inner.state);

        for core in state.instruments.iter() {
            if listener.on_instrument_published(&core.descriptor) {
                core.subscribe(id, listener.clone());
            }
        }
        state.listeners.push(Subscriber { id, listener });
        debug!(listener = %id, "listener attached");
        id
    }

    fn detach(&self, id: ListenerId) -> bool {
        let mut state = write(&self.inner.state);
        let before = state.listeners.len();
        state.listeners.retain(|s| s.id != id);
        let found = state.listeners.len() != before;

        if found {
            for core in state.instruments.iter() {
                core.unsubscribe(id);
            }
            debug!(listener = %id, "listener detached");
        }
        found
    }

    fn record_observables(&self, id: ListenerId) {
        let observables: Vec<Arc<InstrumentCore>> = read(&self.inner.state)
            .instruments
            .iter()
            .filter(|c| c.descriptor.kind.is_observable())
            .cloned()
            .collect();

        for core in observables {
            core.observe_for(id);
        }
    }
}

/// Named factory for instruments.
#[derive(Clone)]
pub struct Meter {
    id: u64,
    name: Arc<str>,
    provider: Arc<ProviderInner>,
}

impl Meter {
    /// Meter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counter<T>(&self, name: impl Into<String>) -> InstrumentBuilder<'_, super::Counter<T>> {
        InstrumentBuilder::new(self, name.into(), InstrumentKind::Counter, None)
    }

    pub fn up_down_counter<T>(
        &self,
        name: impl Into<String>,
    ) -> InstrumentBuilder<'_, super::UpDownCounter<T>> {
        InstrumentBuilder::new(self, name.into(), InstrumentKind::UpDownCounter, None)
    }

    pub fn histogram<T>(&self, name: impl Into<String>) -> InstrumentBuilder<'_, super::Histogram<T>> {
        InstrumentBuilder::new(self, name.into(), InstrumentKind::Histogram, None)
    }

    /// Counter whose cumulative total is reported by `callback` at collection time.
    pub fn observable_counter<T, F>(
        &self,
        name: impl Into<String>,
        callback: F,
    ) -> InstrumentBuilder<'_, super::ObservableCounter<T>>
    where
        T: super::Measure,
        F: Fn() -> Vec<super::Observation<T>> + Send + Sync + 'static,
    {
        let observe = super::handle::observe_fn(callback);
        InstrumentBuilder::new(self, name.into(), InstrumentKind::ObservableCounter, Some(observe))
    }

    /// Up-down counter whose current total is reported by `callback` at collection time.
    pub fn observable_up_down_counter<T, F>(
        &self,
        name: impl Into<String>,
        callback: F,
    ) -> InstrumentBuilder<'_, super::ObservableUpDownCounter<T>>
    where
        T: super::Measure,
        F: Fn() -> Vec<super::Observation<T>> + Send + Sync + 'static,
    {
        let observe = super::handle::observe_fn(callback);
        InstrumentBuilder::new(
            self,
            name.into(),
            InstrumentKind::ObservableUpDownCounter,
            Some(observe),
        )
    }

    /// Gauge whose current value is reported by `callback` at collection time.
    pub fn observable_gauge<T, F>(
        &self,
        name: impl Into<String>,
        callback: F,
    ) -> InstrumentBuilder<'_, super::ObservableGauge<T>>
    where
        T: super::Measure,
        F: Fn() -> Vec<super::Observation<T>> + Send + Sync + 'static,
    {
        let observe = super::handle::observe_fn(callback);
        InstrumentBuilder::new(self, name.into(), InstrumentKind::ObservableGauge, Some(observe))
    }

    /// Dispose every instrument created by this meter.
    ///
    /// Listeners get `on_instrument_disposed`; later reports on the instruments are ignored.
    pub fn dispose(&self) {
        let removed: Vec<Arc<InstrumentCore>> = {
            let mut state = write(&self.provider.state);
            let (removed, kept) = std::mem::take(&mut state.instruments)
                .into_iter()
                .partition(|c| c.meter_id == self.id);
            state.instruments = kept;
            removed
        };

        debug!(meter = %self.name, instruments = removed.len(), "meter disposed");
        for core in removed {
            core.dispose();
        }
    }

    /// Publish a new instrument to every attached listener.
    pub(crate) fn publish(
        &self,
        name: String,
        kind: InstrumentKind,
        number: NumberKind,
        unit: Option<String>,
        description: Option<String>,
        observe: Option<ObserveFn>,
    ) -> Arc<InstrumentCore> {
        let descriptor = InstrumentDescriptor {
            id: InstrumentId(self.provider.next_instrument.fetch_add(1, Ordering::Relaxed)),
            meter: self.name.to_string(),
            name,
            kind,
            number,
            unit,
            description,
        };
        let core = Arc::new(InstrumentCore {
            meter_id: self.id,
            descriptor,
            subscribers: RwLock::new(Arc::from(Vec::new())),
            disposed: AtomicBool::new(false),
            observe,
        });

        let mut state = write(&self.provider.state);
        for s in state.listeners.iter() {
            if s.listener.on_instrument_published(&core.descriptor) {
                core.subscribe(s.id, s.listener.clone());
            }
        }
        state.instruments.push(core.clone());
        trace!(meter = %self.name, instrument = %core.descriptor.name, kind = %kind, "instrument published");
        core
    }
}

/// Shared state behind every instrument handle.
pub(crate) struct InstrumentCore {
    meter_id: u64,
    descriptor: InstrumentDescriptor,
    /// Copy-on-write list so delivery never holds the lock while calling out.
    subscribers: RwLock<Arc<[Subscriber]>>,
    disposed: AtomicBool,
    observe: Option<ObserveFn>,
}

impl InstrumentCore {
    #[inline]
    pub(crate) fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    /// Deliver one measurement to every enabled listener.
    pub(crate) fn report(&self, value: Number, attributes: &[Attribute], exemplar: Option<&[Attribute]>) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let subscribers = self.subscribers();
        if subscribers.is_empty() {
            return;
        }

        let measurement = Measurement {
            value,
            attributes,
            exemplar,
        };
        for s in subscribers.iter() {
            s.listener.on_measurement(&self.descriptor, &measurement);
        }
    }

    fn observe_for(&self, id: ListenerId) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let Some(observe) = self.observe.as_ref() else {
            return;
        };
        let subscribers = self.subscribers();
        let Some(subscriber) = subscribers.iter().find(|s| s.id == id) else {
            return;
        };

        for (value, attributes) in observe() {
            let measurement = Measurement {
                value,
                attributes: &attributes,
                exemplar: None,
            };
            subscriber.listener.on_measurement(&self.descriptor, &measurement);
        }
    }

    fn subscribers(&self) -> Arc<[Subscriber]> {
        read(&self.subscribers).clone()
    }

    fn subscribe(&self, id: ListenerId, listener: Arc<dyn InstrumentListener>) {
        let mut guard = write(&self.subscribers);
        let mut next: Vec<Subscriber> = guard.iter().cloned().collect();
        next.push(Subscriber { id, listener });
        *guard = next.into();
    }

    fn unsubscribe(&self, id: ListenerId) {
        let mut guard = write(&self.subscribers);
        let next: Vec<Subscriber> = guard.iter().filter(|s| s.id != id).cloned().collect();
        *guard = next.into();
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let subscribers = std::mem::replace(&mut *write(&self.subscribers), Arc::from(Vec::new()));
        for s in subscribers.iter() {
            s.listener.on_instrument_disposed(&self.descriptor);
        }
    }
}

#[inline]
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

#[inline]
fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
