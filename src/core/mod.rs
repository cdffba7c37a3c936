//! The core module
pub mod grid;
pub mod weights;

use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::ops::Range;
use thiserror::Error;

/// Integrand trait
///
/// The engine evaluates the integrand at grid points of the integration domain, one real
/// coordinate per axis. The blanket implementation below allows plain closures of the form
/// `|point: &[f64]| -> f64` to be used directly.
pub trait Integrand<T: Copy>: Send + Sync {
    /// Evaluate the integrand at the grid point `point`.
    fn call(&self, point: &[T]) -> T;
}

impl<T, F> Integrand<T> for F
where
    T: Copy,
    F: Fn(&[T]) -> T + Send + Sync,
{
    fn call(&self, point: &[T]) -> T {
        self(point)
    }
}

/// The reason an integration domain was rejected.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum DomainError {
    /// The declared dimension was zero.
    #[error("the integration domain must have at least one dimension")]
    ZeroDimension,
    /// A per-axis array does not match the declared dimension.
    #[error("per-axis arrays must all have length {expected}, got {found}")]
    DimensionMismatch {
        /// The declared dimension.
        expected: usize,
        /// The offending array length.
        found: usize,
    },
    /// A lower bound is not strictly below its upper bound.
    #[error("lower bound must be strictly below upper bound on axis {axis}")]
    InvertedBounds {
        /// The offending axis.
        axis: usize,
    },
    /// A step count is zero.
    #[error("step count must be positive on axis {axis}")]
    ZeroSteps {
        /// The offending axis.
        axis: usize,
    },
}

/// An axis-aligned hyper-rectangular integration domain together with the per-axis step
/// counts of the regular grid laid over it.
///
/// The domain is constructed once per integration request and immutable thereafter. The
/// constructor enforces the invariants `lower[i] < upper[i]` and `steps[i] > 0` for every
/// axis `i`; an [`IntegrationDomain`] that exists is always valid.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(
    bound(deserialize = "T: Float + Deserialize<'de>"),
    try_from = "UncheckedDomain<T>"
)]
pub struct IntegrationDomain<T> {
    lower: Vec<T>,
    upper: Vec<T>,
    steps: Vec<usize>,
}

/// The raw shape of a persisted domain. Deserialization funnels through
/// [`IntegrationDomain::new`], so a persisted-and-edited request cannot bypass the domain
/// invariants.
#[derive(Deserialize)]
struct UncheckedDomain<T> {
    lower: Vec<T>,
    upper: Vec<T>,
    steps: Vec<usize>,
}

impl<T: Float> TryFrom<UncheckedDomain<T>> for IntegrationDomain<T> {
    type Error = DomainError;

    fn try_from(raw: UncheckedDomain<T>) -> Result<Self, Self::Error> {
        Self::new(raw.lower, raw.upper, raw.steps)
    }
}

impl<T: Float> IntegrationDomain<T> {
    /// Construct a validated domain from per-axis lower bounds, upper bounds and step
    /// counts. The dimension is implied by the length of `lower`; all three vectors must
    /// have that length.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] describing the first violated invariant.
    pub fn new(lower: Vec<T>, upper: Vec<T>, steps: Vec<usize>) -> Result<Self, DomainError> {
        let dim = lower.len();

        if dim == 0 {
            return Err(DomainError::ZeroDimension);
        }

        for found in &[upper.len(), steps.len()] {
            if *found != dim {
                return Err(DomainError::DimensionMismatch {
                    expected: dim,
                    found: *found,
                });
            }
        }

        for axis in 0..dim {
            if lower[axis] >= upper[axis] {
                return Err(DomainError::InvertedBounds { axis });
            }
            if steps[axis] == 0 {
                return Err(DomainError::ZeroSteps { axis });
            }
        }

        Ok(Self {
            lower,
            upper,
            steps,
        })
    }

    /// Returns the number of axes of the domain.
    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Returns the per-axis lower bounds.
    pub fn lower(&self) -> &[T] {
        &self.lower
    }

    /// Returns the per-axis upper bounds.
    pub fn upper(&self) -> &[T] {
        &self.upper
    }

    /// Returns the per-axis step counts.
    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    /// Returns the width of one grid cell along `axis`.
    pub fn step_size(&self, axis: usize) -> T {
        (self.upper[axis] - self.lower[axis]) / T::from(self.steps[axis]).unwrap()
    }

    /// Returns the product of all per-axis cell widths. This converts the weighted sum of
    /// integrand values into the trapezoidal-rule integral estimate.
    pub fn cell_volume(&self) -> T {
        (0..self.dimension()).fold(T::one(), |acc, axis| acc * self.step_size(axis))
    }
}

/// Compute the contiguous range of linear grid-point indices assigned to the worker with
/// rank `worker`, given the total number of workers `workers` and the total point count
/// `total`.
///
/// All workers receive `total / workers` indices except the last one, whose range extends
/// to `total` to absorb the remainder. The union of all ranges is exactly `[0, total)`
/// with no gaps or overlaps, so the partition reconstructs the enumeration order of the
/// sequential evaluator.
pub fn index_range_for_worker(worker: usize, workers: usize, total: usize) -> Range<usize> {
    // make sure passed data is valid
    debug_assert!(worker < workers);

    let per_worker = total / workers;
    let start = worker * per_worker;

    // the last worker absorbs the remainder
    if worker + 1 == workers {
        start..total
    } else {
        start..start + per_worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand_pcg::Pcg64;

    #[test]
    fn test_index_range_simple() {
        let workers = 3;
        let total = 17;
        let ranges = (0..workers)
            .map(|worker| index_range_for_worker(worker, workers, total))
            .collect::<Vec<_>>();

        assert_eq!(ranges[0], 0..5);
        assert_eq!(ranges[1], 5..10);
        assert_eq!(ranges[2], 10..17);
        assert_eq!(total, ranges.into_iter().map(Iterator::count).sum::<usize>());
    }

    #[test]
    fn test_index_range_exact_split() {
        let ranges = (0..4)
            .map(|worker| index_range_for_worker(worker, 4, 20))
            .collect::<Vec<_>>();

        assert_eq!(ranges, vec![0..5, 5..10, 10..15, 15..20]);
    }

    #[test]
    fn test_index_range_more_workers_than_points() {
        // the first workers receive empty ranges; the last absorbs everything
        let ranges = (0..5)
            .map(|worker| index_range_for_worker(worker, 5, 3))
            .collect::<Vec<_>>();

        assert_eq!(ranges, vec![0..0, 0..0, 0..0, 0..0, 0..3]);
    }

    #[test]
    fn test_index_range_coverage() {
        let mut rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

        for _ in 0..100 {
            let total = rng.gen_range(0, 1_000_000);
            let workers = rng.gen_range(1, 64);

            let mut next = 0;
            for worker in 0..workers {
                let range = index_range_for_worker(worker, workers, total);
                // contiguous, in rank order, no gaps or overlaps
                assert_eq!(range.start, next);
                next = range.end;
            }
            assert_eq!(next, total);
        }
    }

    #[test]
    fn test_domain_accessors() {
        let domain =
            IntegrationDomain::new(vec![0.0, -1.0], vec![1.0, 1.0], vec![10, 4]).unwrap();

        assert_eq!(domain.dimension(), 2);
        assert_eq!(domain.step_size(0), 0.1);
        assert_eq!(domain.step_size(1), 0.5);
        assert_eq!(domain.cell_volume(), 0.05);
    }

    #[test]
    fn test_domain_rejects_invalid() {
        assert_eq!(
            IntegrationDomain::<f64>::new(vec![], vec![], vec![]),
            Err(DomainError::ZeroDimension)
        );
        assert_eq!(
            IntegrationDomain::new(vec![0.0, 0.0], vec![1.0], vec![1, 1]),
            Err(DomainError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            IntegrationDomain::new(vec![1.0, 0.0], vec![0.0, 1.0], vec![1, 1]),
            Err(DomainError::InvertedBounds { axis: 0 })
        );
        assert_eq!(
            IntegrationDomain::new(vec![0.0, 0.0], vec![1.0, 1.0], vec![1, 0]),
            Err(DomainError::ZeroSteps { axis: 1 })
        );
    }
}
