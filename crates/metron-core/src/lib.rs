pub mod adapter;
pub mod error;
pub mod instrument;
pub mod label;
pub mod registry;
pub mod store;

pub use adapter::{AdapterConfig, AdapterHandle, AdapterOptions, MeterAdapter};
pub use error::{CollectError, MetricError};
pub use registry::{DataPoint, MetricRegistry, MetricsSerializer, PointSuffix};

pub mod prelude {
    pub use crate::adapter::{AdapterConfig, AdapterHandle, AdapterOptions, MeterAdapter};
    pub use crate::error::{CollectError, MetricError};
    pub use crate::instrument::{InstrumentSource, Meter, MeterProvider, Observation};
    pub use crate::registry::{DataPoint, MetricRegistry, MetricsSerializer, PointSuffix};
    pub use crate::store::{Store, StoreSnapshot};
}
