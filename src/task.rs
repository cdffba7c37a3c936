//! Task harness glue: the byte-buffer task-data container and the staged integration
//! tasks built on top of the evaluators.
//!
//! The surrounding harness supplies raw little-endian input buffers together with declared
//! element counts, and a single output buffer receiving the integral estimate. A task
//! walks the fixed lifecycle `validation → pre_processing → run → post_processing`; every
//! operation reports success as a boolean and a failed validation is terminal for the
//! request. The expected input layout is:
//!
//! - input 0: the dimension, one `u64`,
//! - input 1: the per-axis lower bounds, `dimension` reals,
//! - input 2: the per-axis upper bounds, `dimension` reals,
//! - input 3: the per-axis step counts, `dimension` signed integers,
//!
//! with `inputs_count` declaring the element counts of the three per-axis buffers, and
//! exactly one 8-byte output.

use crate::collective::{Communicator, Role};
use crate::core::{Integrand, IntegrationDomain};
use crate::integrators::trapezoid;

use std::convert::{TryFrom, TryInto};

/// A generic task-data container: raw input buffers, their declared per-axis element
/// counts and raw output buffers, owned by the harness side of the boundary.
#[derive(Clone, Debug, Default)]
pub struct TaskData {
    /// The raw input buffers.
    pub inputs: Vec<Vec<u8>>,
    /// Declared element counts of the per-axis input buffers.
    pub inputs_count: Vec<usize>,
    /// The raw output buffers.
    pub outputs: Vec<Vec<u8>>,
}

impl TaskData {
    /// Create an empty container. Workers of a parallel task hold no data and use this.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out the four input buffers and the single output buffer of an integration
    /// request.
    pub fn for_integration(dimension: usize, lower: &[f64], upper: &[f64], steps: &[i64]) -> Self {
        let mut data = Self::new();

        data.push_input_index(dimension);
        data.push_input_reals(lower);
        data.push_input_reals(upper);
        data.push_input_steps(steps);
        data.push_output_real();

        data
    }

    /// Append an input buffer holding a single index. No element count is declared; the
    /// harness declares counts only for the per-axis arrays.
    pub fn push_input_index(&mut self, value: usize) {
        self.inputs.push((value as u64).to_le_bytes().to_vec());
    }

    /// Append an input buffer of reals and declare its element count.
    pub fn push_input_reals(&mut self, values: &[f64]) {
        self.inputs
            .push(values.iter().flat_map(|v| v.to_le_bytes().to_vec()).collect());
        self.inputs_count.push(values.len());
    }

    /// Append an input buffer of signed step counts and declare its element count.
    pub fn push_input_steps(&mut self, values: &[i64]) {
        self.inputs
            .push(values.iter().flat_map(|v| v.to_le_bytes().to_vec()).collect());
        self.inputs_count.push(values.len());
    }

    /// Append an output buffer sized for one real.
    pub fn push_output_real(&mut self) {
        self.outputs.push(vec![0; 8]);
    }

    /// Read back the real written to the output buffer `index`.
    pub fn output_real(&self, index: usize) -> Option<f64> {
        decode_real(self.outputs.get(index)?)
    }
}

fn decode_index(bytes: &[u8]) -> Option<usize> {
    let raw: [u8; 8] = bytes.try_into().ok()?;

    u64::from_le_bytes(raw).try_into().ok()
}

fn decode_real(bytes: &[u8]) -> Option<f64> {
    let raw: [u8; 8] = bytes.try_into().ok()?;

    Some(f64::from_le_bytes(raw))
}

fn decode_reals(bytes: &[u8]) -> Option<Vec<f64>> {
    if bytes.len() % 8 != 0 {
        return None;
    }

    Some(
        bytes
            .chunks_exact(8)
            .map(|chunk| f64::from_le_bytes(chunk.try_into().unwrap()))
            .collect(),
    )
}

fn decode_steps(bytes: &[u8]) -> Option<Vec<i64>> {
    if bytes.len() % 8 != 0 {
        return None;
    }

    Some(
        bytes
            .chunks_exact(8)
            .map(|chunk| i64::from_le_bytes(chunk.try_into().unwrap()))
            .collect(),
    )
}

/// The lifecycle of a task. Stages advance only on success and only in order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stage {
    Created,
    Validated,
    Prepared,
    Computed,
    Finalized,
}

/// A task executed against a [`TaskData`] container in four ordered operations. Each
/// operation returns `true` on success; calling an operation out of order fails.
pub trait Task {
    /// Check the task data before any computation. A failure is terminal for the request.
    fn validation(&mut self) -> bool;
    /// Read the inputs into the internal state of the task.
    fn pre_processing(&mut self) -> bool;
    /// Perform the computation.
    fn run(&mut self) -> bool;
    /// Write the result to the output buffer.
    fn post_processing(&mut self) -> bool;
}

/// Checks shared by both task variants: buffer counts, dimension, buffer presence and the
/// per-axis domain invariants, in order, short-circuiting on the first failure.
fn validate_common(data: &TaskData) -> Option<usize> {
    // the dimension buffer and all three per-axis buffers must be present
    if data.inputs.len() < 4 || data.outputs.len() != 1 {
        return None;
    }

    let dim = decode_index(&data.inputs[0])?;
    if dim == 0 {
        return None;
    }

    if data.inputs[1..4].iter().any(Vec::is_empty) {
        return None;
    }

    let lower = decode_reals(&data.inputs[1])?;
    let upper = decode_reals(&data.inputs[2])?;
    let steps = decode_steps(&data.inputs[3])?;

    if lower.len() < dim || upper.len() < dim || steps.len() < dim {
        return None;
    }

    for axis in 0..dim {
        if lower[axis] >= upper[axis] || steps[axis] <= 0 {
            return None;
        }
    }

    Some(dim)
}

/// Read the domain description out of validated task data. The arrays are truncated to
/// the declared dimension.
fn read_domain(data: &TaskData) -> Option<IntegrationDomain<f64>> {
    let dim = decode_index(&data.inputs[0])?;

    let mut lower = decode_reals(&data.inputs[1])?;
    let mut upper = decode_reals(&data.inputs[2])?;
    let mut steps = decode_steps(&data.inputs[3])?;

    lower.truncate(dim);
    upper.truncate(dim);
    steps.truncate(dim);

    let steps = steps
        .into_iter()
        .map(|step| usize::try_from(step).ok())
        .collect::<Option<Vec<_>>>()?;

    IntegrationDomain::new(lower, upper, steps).ok()
}

fn write_output(data: &mut TaskData, value: f64) {
    let out = &mut data.outputs[0];
    out.clear();
    out.extend_from_slice(&value.to_le_bytes());
}

/// The sequential integration task: the whole grid is evaluated on the current worker.
pub struct SequentialTrapezoid<I> {
    data: TaskData,
    integrand: I,
    domain: Option<IntegrationDomain<f64>>,
    result: Option<f64>,
    stage: Stage,
}

impl<I: Integrand<f64>> SequentialTrapezoid<I> {
    /// Create a task over `data` integrating `integrand`.
    pub fn new(data: TaskData, integrand: I) -> Self {
        Self {
            data,
            integrand,
            domain: None,
            result: None,
            stage: Stage::Created,
        }
    }

    /// Access the task data, e.g. to read back the output.
    pub fn data(&self) -> &TaskData {
        &self.data
    }

    /// Consume the task and hand the task data back to the harness.
    pub fn into_data(self) -> TaskData {
        self.data
    }
}

impl<I: Integrand<f64>> Task for SequentialTrapezoid<I> {
    fn validation(&mut self) -> bool {
        if self.stage != Stage::Created {
            return false;
        }

        let dim = match validate_common(&self.data) {
            Some(dim) => dim,
            None => return false,
        };

        // sequential variant only: the declared per-axis counts must agree with the
        // dimension
        if self.data.inputs_count.len() < 3
            || self.data.inputs_count[..3].iter().any(|count| *count != dim)
        {
            return false;
        }

        self.stage = Stage::Validated;
        true
    }

    fn pre_processing(&mut self) -> bool {
        if self.stage != Stage::Validated {
            return false;
        }

        self.domain = match read_domain(&self.data) {
            Some(domain) => Some(domain),
            None => return false,
        };

        self.stage = Stage::Prepared;
        true
    }

    fn run(&mut self) -> bool {
        if self.stage != Stage::Prepared {
            return false;
        }

        let domain = match &self.domain {
            Some(domain) => domain,
            None => return false,
        };

        // a fresh value per invocation, taken again in post_processing
        self.result = Some(trapezoid::integrate(&self.integrand, domain));

        self.stage = Stage::Computed;
        true
    }

    fn post_processing(&mut self) -> bool {
        if self.stage != Stage::Computed {
            return false;
        }

        let value = match self.result.take() {
            Some(value) => value,
            None => return false,
        };
        write_output(&mut self.data, value);

        self.stage = Stage::Finalized;
        true
    }
}

/// The parallel integration task: the grid is partitioned across the process group behind
/// the communicator, and only the coordinator touches the task data.
///
/// All members of the group must drive their task instances through the same lifecycle in
/// lockstep; `run` contains blocking collective calls. Workers carry an empty
/// [`TaskData`] and vacuously pass validation — they hold nothing to validate until the
/// broadcasts in `run`.
pub struct ParallelTrapezoid<I, C> {
    data: TaskData,
    integrand: I,
    comm: C,
    domain: Option<IntegrationDomain<f64>>,
    result: Option<f64>,
    stage: Stage,
}

impl<I, C> ParallelTrapezoid<I, C>
where
    I: Integrand<f64>,
    C: Communicator,
{
    /// Create a task over `data` integrating `integrand` on the group behind `comm`.
    pub fn new(data: TaskData, integrand: I, comm: C) -> Self {
        Self {
            data,
            integrand,
            comm,
            domain: None,
            result: None,
            stage: Stage::Created,
        }
    }

    /// Access the task data, e.g. to read back the output at the coordinator.
    pub fn data(&self) -> &TaskData {
        &self.data
    }

    /// Consume the task and hand the task data back to the harness.
    pub fn into_data(self) -> TaskData {
        self.data
    }
}

impl<I, C> Task for ParallelTrapezoid<I, C>
where
    I: Integrand<f64>,
    C: Communicator,
{
    fn validation(&mut self) -> bool {
        if self.stage != Stage::Created {
            return false;
        }

        // only the coordinator holds input data; the parallel variant does not check the
        // declared per-axis counts
        if self.comm.role() == Role::Coordinator && validate_common(&self.data).is_none() {
            return false;
        }

        self.stage = Stage::Validated;
        true
    }

    fn pre_processing(&mut self) -> bool {
        if self.stage != Stage::Validated {
            return false;
        }

        if self.comm.role() == Role::Coordinator {
            self.domain = match read_domain(&self.data) {
                Some(domain) => Some(domain),
                None => return false,
            };
        }

        self.stage = Stage::Prepared;
        true
    }

    fn run(&mut self) -> bool {
        if self.stage != Stage::Prepared {
            return false;
        }

        if self.comm.role() == Role::Coordinator && self.domain.is_none() {
            return false;
        }

        self.result =
            trapezoid::integrate_distributed(&self.integrand, self.domain.as_ref(), &self.comm);

        self.stage = Stage::Computed;
        true
    }

    fn post_processing(&mut self) -> bool {
        if self.stage != Stage::Computed {
            return false;
        }

        if self.comm.role() == Role::Coordinator {
            let value = match self.result.take() {
                Some(value) => value,
                None => return false,
            };
            write_output(&mut self.data, value);
        }

        self.stage = Stage::Finalized;
        true
    }
}
