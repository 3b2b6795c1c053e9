use std::{ops::Deref, sync::Arc};

use crate::error::{ModelError, ModelResult};

/// Default histogram upper bounds used when no resolver overrides them.
pub const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Validated histogram upper bounds.
///
/// Bounds are finite and strictly increasing; the implicit `+Inf` bucket is never part of the list.
/// Cloning is cheap, the bounds are shared by every series of a histogram family.
#[derive(Debug, Clone, PartialEq)]
pub struct Buckets(Arc<[f64]>);

impl Buckets {
    /// Validate and wrap a list of upper bounds.
    ///
    /// A trailing `+Inf` is accepted and dropped since it is always implied.
    pub fn new(bounds: impl Into<Vec<f64>>) -> ModelResult<Self> {
        let mut bounds = bounds.into();
        if bounds.last() == Some(&f64::INFINITY) {
            bounds.pop();
        }
        if bounds.is_empty() {
            return Err(ModelError::EmptyBuckets);
        }
        if let Some(bad) = bounds.iter().find(|b| !b.is_finite()) {
            return Err(ModelError::NonFiniteBucket(*bad));
        }
        if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ModelError::UnsortedBuckets {
                prev: w[0],
                next: w[1],
            });
        }
        Ok(Self(bounds.into()))
    }

    /// Bounds as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for Buckets {
    fn default() -> Self {
        Self(DEFAULT_BUCKETS.into())
    }
}

impl Deref for Buckets {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_increasing_bounds() {
        let b = Buckets::new(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(b.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn drops_trailing_infinity() {
        let b = Buckets::new(vec![1.0, f64::INFINITY]).unwrap();
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert!(matches!(Buckets::new(vec![]), Err(ModelError::EmptyBuckets)));
        assert!(matches!(
            Buckets::new(vec![1.0, f64::NAN]),
            Err(ModelError::NonFiniteBucket(_))
        ));
        assert!(matches!(
            Buckets::new(vec![2.0, 1.0]),
            Err(ModelError::UnsortedBuckets { .. })
        ));
        assert!(matches!(
            Buckets::new(vec![1.0, 1.0]),
            Err(ModelError::UnsortedBuckets { .. })
        ));
    }

    #[test]
    fn default_is_valid() {
        let d = Buckets::default();
        assert!(Buckets::new(d.to_vec()).is_ok());
    }
}
