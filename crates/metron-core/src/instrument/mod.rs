//! Push-style instrumentation source.
//!
//! Instrumentation code creates [`Meter`]s from a [`MeterProvider`] and instruments from meters.
//! Consumers implement [`InstrumentListener`] and attach through [`InstrumentSource`]: they are told
//! about every published instrument, decide whether to receive its measurements, and are then called
//! on whatever thread reports a value.
mod handle;
pub use handle::{
    Counter, Histogram, InstrumentBuilder, Measure, ObservableCounter, ObservableGauge,
    ObservableUpDownCounter, Observation, UpDownCounter,
};

mod provider;
pub use provider::{Meter, MeterProvider};

use std::{fmt, sync::Arc};

use metron_model::{Attribute, InstrumentDescriptor, Number};

/// Identity of an attached listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// One reported value, borrowed from the reporting call.
#[derive(Debug, Clone, Copy)]
pub struct Measurement<'a> {
    pub value: Number,
    pub attributes: &'a [Attribute],
    /// Exemplar attributes (e.g. `trace_id`) sampled with this value.
    pub exemplar: Option<&'a [Attribute]>,
}

/// Consumer of instrument lifecycle and measurement notifications.
///
/// `on_instrument_published` runs while the source holds its instrument table lock and must not call back into the source.
/// `on_measurement` runs on the reporting thread, concurrently and unordered.
pub trait InstrumentListener: Send + Sync {
    /// Called once per instrument, for existing ones at attach time and for new ones as they appear.
    ///
    /// Returning `false` means the listener never hears about this instrument again.
    fn on_instrument_published(&self, instrument: &InstrumentDescriptor) -> bool;

    /// Called for every measurement of an enabled instrument.
    fn on_measurement(&self, instrument: &InstrumentDescriptor, measurement: &Measurement<'_>);

    /// Called when an enabled instrument is disposed upstream.
    fn on_instrument_disposed(&self, _instrument: &InstrumentDescriptor) {}
}

/// Subscription surface consumed by the adapter.
pub trait InstrumentSource: Send + Sync {
    /// Attach a listener; it is immediately offered every live instrument.
    fn attach(&self, listener: Arc<dyn InstrumentListener>) -> ListenerId;

    /// Detach a listener. No new callbacks are delivered once this returns.
    ///
    /// Returns `false` if the listener was not attached.
    fn detach(&self, id: ListenerId) -> bool;

    /// Run observable instrument callbacks, delivering their observations to `id` only.
    fn record_observables(&self, id: ListenerId);
}
