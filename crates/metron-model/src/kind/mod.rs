mod instrument;
pub use instrument::{InstrumentDescriptor, InstrumentId, InstrumentKind};

mod metric;
pub use metric::MetricKind;
