use std::sync::atomic::{AtomicU64, Ordering};

/// `f64` stored as raw bits in an [`AtomicU64`].
#[derive(Debug, Default)]
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub(crate) fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    #[inline]
    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Release);
    }

    /// CAS loop; `f` returning `None` leaves the value untouched and yields `Err(current)`.
    pub(crate) fn fetch_update<F>(&self, mut f: F) -> Result<f64, f64>
    where
        F: FnMut(f64) -> Option<f64>,
    {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                f(f64::from_bits(bits)).map(f64::to_bits)
            })
            .map(f64::from_bits)
            .map_err(f64::from_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_store() {
        let a = AtomicF64::new(1.5);
        assert_eq!(a.load(), 1.5);
        a.store(-2.0);
        assert_eq!(a.load(), -2.0);
    }

    #[test]
    fn fetch_update_adds_and_skips() {
        let a = AtomicF64::default();
        assert_eq!(a.fetch_update(|v| Some(v + 0.25)), Ok(0.0));
        assert_eq!(a.load(), 0.25);
        assert_eq!(a.fetch_update(|_| None), Err(0.25));
    }
}
