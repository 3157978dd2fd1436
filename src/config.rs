use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{GeoError, Result};
use crate::geom::BoundingBox;

/// Engine-wide numeric and scheduling settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tolerance relative to the extent of the operands. Lengths compare
    /// against `relative_epsilon * diagonal`, areas against
    /// `relative_epsilon * diagonal²`, so the same setting works for degree
    /// and metre coordinates alike.
    pub relative_epsilon: f64,
    /// Batches smaller than this run on the calling thread.
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relative_epsilon: 1e-9,
            parallel_threshold: 64,
        }
    }
}

impl EngineConfig {
    /// Absolute length tolerance for operands spanning `extent`.
    #[inline]
    pub fn length_tolerance(&self, extent: &BoundingBox) -> f64 {
        self.relative_epsilon * extent.diagonal().max(f64::MIN_POSITIVE)
    }

    /// Absolute area tolerance for operands spanning `extent`.
    #[inline]
    pub fn area_tolerance(&self, extent: &BoundingBox) -> f64 {
        let diagonal = extent.diagonal().max(f64::MIN_POSITIVE);
        self.relative_epsilon * diagonal * diagonal
    }

    /// Whether a batch of `len` independent items should be spread over the thread pool.
    #[inline]
    pub fn run_parallel(&self, len: usize) -> bool { len >= self.parallel_threshold }
}

/// Cooperative cancellation shared between a caller and a running batch.
///
/// Batches check the flag between independent units of work (one left feature
/// in a join, one group in a dissolve) and give up with [`GeoError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self { Self::default() }

    /// Request cancellation of every batch holding a clone of this flag.
    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed) }

    #[inline] pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }

    #[inline]
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() { Err(GeoError::Cancelled) } else { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_scales_with_extent() {
        let config = EngineConfig::default();
        let small = BoundingBox::new(0.0, 0.0, 3.0, 4.0);
        let large = BoundingBox::new(0.0, 0.0, 3000.0, 4000.0);

        assert!((config.length_tolerance(&small) - 5e-9).abs() < 1e-18);
        assert!((config.length_tolerance(&large) - 5e-6).abs() < 1e-15);
        assert!(config.area_tolerance(&large) > config.area_tolerance(&small));
    }

    #[test]
    fn degenerate_extent_still_positive() {
        let config = EngineConfig::default();
        let point = BoundingBox::new(1.0, 1.0, 1.0, 1.0);
        assert!(config.length_tolerance(&point) > 0.0);
    }

    #[test]
    fn cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(clone.check().is_ok());
        flag.cancel();
        assert!(clone.is_cancelled());
        assert_eq!(clone.check(), Err(GeoError::Cancelled));
    }
}
