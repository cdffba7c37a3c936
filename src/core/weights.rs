//! This module contains the corner weight cache.
use num_traits::Float;

/// Precomputed trapezoidal corner weights, keyed by a boundary-membership bitmask.
///
/// The trapezoidal rule halves the contribution of a one-dimensional boundary node. In `d`
/// dimensions the halving compounds independently for every axis boundary a grid point
/// lies on, so a point touching `b` boundary faces is weighted by `0.5^b`. The table holds
/// all `2^d` weights indexed by a bitmask with one bit per axis, set if the point lies on
/// that axis's lower or upper bound. It is built once per integration request — `d` is
/// small in practice — and then shared read-only by every point evaluated on a worker,
/// instead of recomputing the weight per axis for every point.
#[derive(Clone, Debug)]
pub struct CornerWeights<T> {
    table: Vec<T>,
}

impl<T: Float> CornerWeights<T> {
    /// Precompute the weight table for a `dimension`-dimensional domain.
    pub fn new(dimension: usize) -> Self {
        let half = T::from(0.5).unwrap();

        Self {
            table: (0..1_usize << dimension)
                .map(|mask: usize| half.powi(mask.count_ones() as i32))
                .collect(),
        }
    }

    /// Returns the number of entries of the table, `2^dimension`.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the table is empty. It never is; this accompanies [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the weight for the boundary-membership bitmask `mask`.
    pub fn weight(&self, mask: usize) -> T {
        self.table[mask]
    }

    /// Returns the weight of the grid point `point` inside the domain described by `lower`
    /// and `upper`.
    ///
    /// Boundary membership is tested by exact floating-point equality of the coordinate
    /// against the originally supplied bound values. Grid coordinates are derived exactly
    /// as `lower + k * step_size`, so `k = 0` reproduces the lower bound bit-for-bit; the
    /// comparison must not be replaced by an independently rounded recomputation.
    pub fn weight_for_point(&self, point: &[T], lower: &[T], upper: &[T]) -> T {
        let mut mask = 0;

        for (axis, coordinate) in point.iter().enumerate() {
            if *coordinate == lower[axis] || *coordinate == upper[axis] {
                mask |= 1 << axis;
            }
        }

        self.table[mask]
    }
}
