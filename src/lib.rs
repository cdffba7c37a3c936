#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! The crate `trapezir` computes definite multi-dimensional integrals over axis-aligned
//! hyper-rectangles using the composite trapezoidal rule, either on a single worker or
//! distributed across a fixed group of cooperating workers. The pronunciation of `trapezir`
//! is the same as of the word `trapezier`.
//!
//! # Features
//!
//! This library was designed with the following features as essential in mind:
//!
//! - **Generic numeric type**. The numeric type of the sequential engine is not fixed, but
//! instead a generic parameter, so that the integration routines can be used with either
//! `f32`, `f64`, or a custom numeric type that implements the `Float` trait from the
//! `num-traits` crate.
//! - **Worker-count invariance**. The parallel evaluator partitions the grid into contiguous
//! index ranges whose union reproduces the exact enumeration order of the sequential
//! evaluator, so the result does not depend on the number of workers beyond floating-point
//! summation-order rounding.
//! - **Precomputed corner weights**. The trapezoidal rule halves the contribution of every
//! boundary node; in `d` dimensions a grid point touching `b` boundary faces is weighted by
//! `0.5^b`. All `2^d` weights are computed once per request and looked up by a bitmask
//! instead of being recomputed per axis for every point.
//! - **Validation first**. Buffer counts, dimensionality, bound ordering and step positivity
//! are checked before any computation; a failed validation is reported as a boolean failure
//! and never as a panic across the component boundary.
//! - **Pluggable collective substrate**. The parallel evaluator only needs `broadcast` and a
//! sum-`reduce` from its process group. These are behind a small trait, so an in-process
//! channel-backed group of threads (provided) and an MPI-style binding are interchangeable.
//!
//! # What is ...?
//!
//! This section is a dictionary of terms that are used in this documentation.
//!
//! - a *grid point* is one node of the regular rectangular lattice spanning the integration
//! domain; an axis with `n` steps has `n + 1` nodes including both endpoints,
//! - the *corner weight* of a grid point is the trapezoidal-rule multiplier `0.5^b`, where
//! `b` is the number of axis boundaries the point lies on,
//! - the *cell volume* is the product of the per-axis step widths; it scales the weighted
//! sum of integrand values into the integral estimate,
//! - the *coordinator* is the single worker (rank 0) that owns the original input and output
//! buffers and receives the reduced result,
//! - a *collective reduction* combines one value per worker into a single value at the
//! coordinator using a commutative operator, here the sum.

pub mod collective;
pub mod core;
pub mod integrators;
pub mod task;

pub use crate::core::*;
