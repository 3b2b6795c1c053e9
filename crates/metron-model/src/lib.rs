mod domain;
pub use domain::{Attribute, AttributeValue, Buckets, DEFAULT_BUCKETS, Number, NumberKind};

mod error;
pub use error::{ModelError, ModelResult};

mod kind;
pub use kind::{InstrumentDescriptor, InstrumentId, InstrumentKind, MetricKind};
