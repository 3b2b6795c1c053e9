use std::{fmt, marker::PhantomData, sync::Arc};

use metron_model::{Attribute, InstrumentDescriptor, InstrumentKind, Number, NumberKind};

use super::provider::{InstrumentCore, Meter};

/// Callback of an observable instrument, type-erased to plain numbers.
pub(crate) type ObserveFn = Box<dyn Fn() -> Vec<(Number, Vec<Attribute>)> + Send + Sync>;

pub(crate) fn observe_fn<T, F>(callback: F) -> ObserveFn
where
    T: Measure,
    F: Fn() -> Vec<Observation<T>> + Send + Sync + 'static,
{
    Box::new(move || {
        callback()
            .into_iter()
            .map(|o| (o.value.into_number(), o.attributes))
            .collect()
    })
}

/// Numeric types an instrument can report.
pub trait Measure: Copy + Send + Sync + 'static {
    const KIND: NumberKind;

    fn into_number(self) -> Number;
}

impl Measure for i64 {
    const KIND: NumberKind = NumberKind::I64;

    #[inline]
    fn into_number(self) -> Number {
        Number::I64(self)
    }
}

impl Measure for f64 {
    const KIND: NumberKind = NumberKind::F64;

    #[inline]
    fn into_number(self) -> Number {
        Number::F64(self)
    }
}

/// Value reported by an observable instrument callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<T> {
    value: T,
    attributes: Vec<Attribute>,
}

impl<T: Measure> Observation<T> {
    pub fn new(value: T, attributes: Vec<Attribute>) -> Self {
        Self { value, attributes }
    }
}

/// Builder returned by the `Meter` factory methods.
#[must_use = "instruments are published by `build()`"]
pub struct InstrumentBuilder<'a, I> {
    meter: &'a Meter,
    name: String,
    kind: InstrumentKind,
    unit: Option<String>,
    description: Option<String>,
    observe: Option<ObserveFn>,
    _instrument: PhantomData<fn() -> I>,
}

impl<'a, I> InstrumentBuilder<'a, I> {
    pub(crate) fn new(
        meter: &'a Meter,
        name: String,
        kind: InstrumentKind,
        observe: Option<ObserveFn>,
    ) -> Self {
        Self {
            meter,
            name,
            kind,
            unit: None,
            description: None,
            observe,
            _instrument: PhantomData,
        }
    }

    /// Declared unit, e.g. `"s"` or `"By"`.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Human-readable description; exported as help text by default.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn publish(self, number: NumberKind) -> Arc<InstrumentCore> {
        self.meter.publish(
            self.name,
            self.kind,
            number,
            self.unit,
            self.description,
            self.observe,
        )
    }
}

macro_rules! instrument_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<T> {
            core: Arc<InstrumentCore>,
            _number: PhantomData<fn(T)>,
        }

        impl<T> $name<T> {
            /// Static description of this instrument.
            pub fn descriptor(&self) -> &InstrumentDescriptor {
                self.core.descriptor()
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    core: self.core.clone(),
                    _number: PhantomData,
                }
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("descriptor", self.core.descriptor())
                    .finish()
            }
        }

        impl<T: Measure> InstrumentBuilder<'_, $name<T>> {
            /// Publish the instrument to every attached listener.
            pub fn build(self) -> $name<T> {
                $name {
                    core: self.publish(T::KIND),
                    _number: PhantomData,
                }
            }
        }
    };
}

instrument_handle!(
    /// Monotonic counter; negative increments are rejected downstream.
    Counter
);
instrument_handle!(
    /// Counter that can go up and down.
    UpDownCounter
);
instrument_handle!(
    /// Records a distribution of values.
    Histogram
);
instrument_handle!(
    /// Callback-driven cumulative counter.
    ObservableCounter
);
instrument_handle!(
    /// Callback-driven cumulative up-down counter.
    ObservableUpDownCounter
);
instrument_handle!(
    /// Callback-driven gauge.
    ObservableGauge
);

impl<T: Measure> Counter<T> {
    pub fn add(&self, value: T, attributes: &[Attribute]) {
        self.core.report(value.into_number(), attributes, None);
    }

    pub fn add_with_exemplar(&self, value: T, attributes: &[Attribute], exemplar: &[Attribute]) {
        self.core
            .report(value.into_number(), attributes, Some(exemplar));
    }
}

impl<T: Measure> UpDownCounter<T> {
    pub fn add(&self, value: T, attributes: &[Attribute]) {
        self.core.report(value.into_number(), attributes, None);
    }
}

impl<T: Measure> Histogram<T> {
    pub fn record(&self, value: T, attributes: &[Attribute]) {
        self.core.report(value.into_number(), attributes, None);
    }

    pub fn record_with_exemplar(&self, value: T, attributes: &[Attribute], exemplar: &[Attribute]) {
        self.core
            .report(value.into_number(), attributes, Some(exemplar));
    }
}
