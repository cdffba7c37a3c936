//! Composite trapezoidal-rule evaluators.
//!
//! [`integrate`] runs entirely on one worker. [`integrate_distributed`] is the same
//! quadrature executed SPMD-style by every member of a process group: the coordinator
//! broadcasts the domain description, each worker accumulates a partial sum over its
//! contiguous share of the grid, and a sum-reduction delivers the result to the
//! coordinator. Both evaluators share the per-point kernel, so for a fixed domain the
//! parallel result is invariant to the worker count up to floating-point summation-order
//! rounding.

use crate::collective::{Communicator, GroupMember, Role, SoloCommunicator};
use crate::core::grid::Grid;
use crate::core::weights::CornerWeights;
use crate::core::{index_range_for_worker, Integrand, IntegrationDomain};

use num_traits::Float;
use std::ops::{AddAssign, Range};

use crossbeam as cb;

/// Accumulate the weighted integrand values over the grid points with linear indices in
/// `range`. This is the kernel shared by the sequential and the parallel evaluator; the
/// accumulation order is the increasing linear-index order, in plain floating-point
/// additions without a higher-precision accumulator.
fn weighted_sum<T, I>(
    integrand: &I,
    domain: &IntegrationDomain<T>,
    grid: &Grid<T>,
    weights: &CornerWeights<T>,
    range: Range<usize>,
) -> T
where
    T: AddAssign + Float,
    I: Integrand<T>,
{
    // reuse one coordinate buffer so that no allocation happens per point
    let mut point = vec![T::zero(); domain.dimension()];
    let mut sum = T::zero();

    for index in range {
        grid.point_at(index, &mut point);

        let weight = weights.weight_for_point(&point, domain.lower(), domain.upper());
        sum += integrand.call(&point) * weight;
    }

    sum
}

/// Integrate `integrand` over `domain` on the current worker alone.
///
/// Enumerates every grid point in increasing linear-index order, accumulates the
/// corner-weighted integrand values and scales the sum by the cell volume of the grid.
pub fn integrate<T, I>(integrand: &I, domain: &IntegrationDomain<T>) -> T
where
    T: AddAssign + Float,
    I: Integrand<T>,
{
    let grid = Grid::new(domain);
    let weights = CornerWeights::new(domain.dimension());
    let total = grid.total_points();

    weighted_sum(integrand, domain, &grid, &weights, 0..total) * domain.cell_volume()
}

/// Integrate `integrand` over `domain` cooperatively on the process group behind `comm`.
///
/// Every member of the group must call this function with the same integrand and the same
/// communicator sequence. Only the coordinator needs to supply the domain; all other
/// members pass `None` and receive the description through broadcasts. Each member builds
/// its own corner weight table — the table has `2^dimension` entries, so rebuilding it
/// per worker is cheaper than broadcasting it — and accumulates the weighted sum over its
/// contiguous index range, with the last rank absorbing the remainder of the division.
/// The partial sums are reduced to the coordinator, which applies the cell-volume scaling.
///
/// Returns `Some` result at the coordinator and `None` everywhere else, including the
/// case of a coordinator whose unvalidated domain data does not survive reconstruction.
pub fn integrate_distributed<I, C>(
    integrand: &I,
    domain: Option<&IntegrationDomain<f64>>,
    comm: &C,
) -> Option<f64>
where
    I: Integrand<f64>,
    C: Communicator,
{
    let coordinating = comm.role() == Role::Coordinator;

    // broadcast the domain description from the coordinator; non-coordinators size
    // their arrays from the broadcast dimension and ignore a locally supplied domain
    let mut dim = if coordinating {
        domain.map_or(0, IntegrationDomain::dimension)
    } else {
        0
    };
    comm.broadcast_index(&mut dim);

    let (mut lower, mut upper, mut steps) = match domain.filter(|_| coordinating) {
        Some(d) => (d.lower().to_vec(), d.upper().to_vec(), d.steps().to_vec()),
        None => (vec![0.0; dim], vec![0.0; dim], vec![0; dim]),
    };

    comm.broadcast_reals(&mut lower);
    comm.broadcast_reals(&mut upper);
    comm.broadcast_indices(&mut steps);

    // every member holds the full description now; the data already passed validation at
    // the coordinator, so reconstruction only fails if the caller skipped validation
    let domain = IntegrationDomain::new(lower, upper, steps).ok()?;

    let grid = Grid::new(&domain);
    let weights = CornerWeights::new(domain.dimension());
    let range = index_range_for_worker(comm.rank(), comm.size(), grid.total_points());

    let local = weighted_sum(integrand, &domain, &grid, &weights, range);

    comm.reduce_sum(local)
        .map(|sum| sum * domain.cell_volume())
}

/// Integrate `integrand` over `domain` on `workers` threads of the current process.
///
/// Convenience driver around [`integrate_distributed`]: it connects an in-process group,
/// runs one member per scoped thread and returns the coordinator's result. With a single
/// worker no threads are spawned.
///
/// # Panics
///
/// Panics if `workers` is zero or a worker thread panics.
pub fn integrate_on_workers<I>(
    integrand: &I,
    domain: &IntegrationDomain<f64>,
    workers: usize,
) -> f64
where
    I: Integrand<f64>,
{
    if workers == 1 {
        return integrate_distributed(integrand, Some(domain), &SoloCommunicator)
            .expect("a solo group always reduces at the coordinator");
    }

    let members = crate::collective::connect(workers);

    let results = cb::thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);

        for member in members {
            handles.push(s.spawn(move |_| {
                let local_domain = if member.role() == Role::Coordinator {
                    Some(domain)
                } else {
                    None
                };

                integrate_distributed::<I, GroupMember>(integrand, local_domain, &member)
            }));
        }

        // wait for the threads to finish
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    })
    .unwrap();

    results
        .into_iter()
        .flatten()
        .next()
        .expect("the coordinator always produces a result")
}
