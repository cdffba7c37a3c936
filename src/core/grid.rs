//! This module contains the grid indexer.
use crate::core::IntegrationDomain;
use num_traits::Float;

/// Maps linear point indices to the coordinates of the regular grid spanning an
/// integration domain.
///
/// An axis with `steps` cells has `steps + 1` nodes including both endpoints, so the grid
/// of a `d`-dimensional domain holds `∏ (steps[i] + 1)` points. A linear index is
/// decomposed into per-axis node indices by mixed-radix decomposition in increasing axis
/// order, axis 0 varying fastest. The sequential and the parallel evaluator both enumerate
/// points through this type, so their orders are identical by construction.
#[derive(Clone, Debug)]
pub struct Grid<T> {
    lower: Vec<T>,
    step_sizes: Vec<T>,
    /// Per-axis node counts, `steps[i] + 1`.
    nodes: Vec<usize>,
}

impl<T: Float> Grid<T> {
    /// Construct the grid laid over `domain`.
    pub fn new(domain: &IntegrationDomain<T>) -> Self {
        let dim = domain.dimension();

        Self {
            lower: domain.lower().to_vec(),
            step_sizes: (0..dim).map(|axis| domain.step_size(axis)).collect(),
            nodes: domain.steps().iter().map(|steps| steps + 1).collect(),
        }
    }

    /// Returns the number of axes of the grid.
    pub fn dimension(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the total number of grid points.
    ///
    /// The product can overflow only for pathologically large step counts, which is the
    /// caller's responsibility.
    pub fn total_points(&self) -> usize {
        self.nodes.iter().product()
    }

    /// Write the coordinates of the grid point with linear index `index` into `point`.
    ///
    /// Each coordinate is derived exactly as `lower[j] + k * step_size[j]`, where `k` is
    /// the node index on axis `j`. The corner-weighting scheme relies on this derivation:
    /// `k = 0` yields the lower bound exactly, so boundary membership can be tested by
    /// floating-point equality against the original bound values.
    pub fn point_at(&self, index: usize, point: &mut [T]) {
        debug_assert!(index < self.total_points());
        debug_assert_eq!(point.len(), self.dimension());

        let mut rest = index;

        for (axis, coordinate) in point.iter_mut().enumerate() {
            let node = rest % self.nodes[axis];
            rest /= self.nodes[axis];

            // TODO: Get rid of unwrap.
            *coordinate =
                self.lower[axis] + T::from(node).unwrap() * self.step_sizes[axis];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2x1() -> Grid<f64> {
        // two steps on the x axis, one step on the y axis
        let domain = IntegrationDomain::new(vec![0.0, 0.0], vec![1.0, 1.0], vec![2, 1]).unwrap();
        Grid::new(&domain)
    }

    #[test]
    fn test_total_points() {
        let grid = grid_2x1();

        assert_eq!(grid.dimension(), 2);
        // (2 + 1) * (1 + 1)
        assert_eq!(grid.total_points(), 6);
    }

    #[test]
    fn test_enumeration_order() {
        let grid = grid_2x1();
        let mut point = vec![0.0; 2];

        // axis 0 varies fastest
        let expected = [
            [0.0, 0.0],
            [0.5, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [0.5, 1.0],
            [1.0, 1.0],
        ];

        for (index, expected) in expected.iter().enumerate() {
            grid.point_at(index, &mut point);
            assert_eq!(point.as_slice(), &expected[..]);
        }
    }

    #[test]
    fn test_endpoints_are_exact() {
        let domain = IntegrationDomain::new(vec![-2.5], vec![7.5], vec![10]).unwrap();
        let grid = Grid::new(&domain);
        let mut point = vec![0.0];

        grid.point_at(0, &mut point);
        assert_eq!(point[0], -2.5);

        grid.point_at(grid.total_points() - 1, &mut point);
        assert_eq!(point[0], 7.5);
    }
}
