mod attribute;
pub use attribute::{Attribute, AttributeValue};

mod number;
pub use number::{Number, NumberKind};

mod buckets;
pub use buckets::{Buckets, DEFAULT_BUCKETS};
