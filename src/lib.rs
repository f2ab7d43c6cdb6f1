//! # qubo-ops: structure-preserving transforms for QUBO instances
//!
//! **`qubo-ops`** derives new benchmark instances from an existing QUBO
//! (quadratic unconstrained binary optimization) instance
//!
//! ```text
//! E(x) = offset + sum_{i <= j} w(i,j) * x_i * x_j,    x in {0,1}^nbit
//! ```
//!
//! while keeping a precise record of how the new instance relates to the old
//! one, so that a known solution and its energy can be carried across.
//!
//! ## Transforms
//!
//! - **[`flip`]**: substitute `x -> 1 - x` for some bits.
//! - **[`shuffle`]**: relabel bits by a random permutation.
//! - **[`duplicate`]**: replace bits by penalized chains of replicas.
//! - **[`reduce`]**: merge pairs of bits that agree on a known solution.
//! - **[`constrain`]**: inject one-hot penalty groups satisfied by a known solution.
//!
//! Every transform reads a [`Qubo`][crate::qubo::Qubo] (and optionally a
//! [`Solution`][crate::solution::Solution]), never mutates its input, and
//! returns a [`Transformed`][crate::provenance::Transformed] with the new
//! instance, the carried solution and an operation-specific
//! [`Provenance`][crate::provenance::Provenance]. All randomness comes from a
//! seeded generator, so the same seed and input reproduce the same output.
//!
//! ## Basic Usage
//!
//! ```rust
//! use num_bigint::BigInt;
//! use qubo_ops::flip::flip_set;
//! use qubo_ops::qubo::Qubo;
//!
//! let q = Qubo::from_terms(
//!     3,
//!     [
//!         (0, 0, BigInt::from(-1)),
//!         (1, 1, BigInt::from(-1)),
//!         (0, 1, BigInt::from(5)),
//!     ],
//! )?;
//!
//! let out = flip_set(&q, None, &[0])?;
//! assert_eq!(out.qubo.get(0, 0), BigInt::from(1));
//! assert_eq!(out.qubo.get(0, 1), BigInt::from(-5));
//! assert_eq!(out.qubo.offset(), &BigInt::from(-1));
//!
//! // Energies agree once bit 0 is complemented.
//! assert_eq!(q.energy(&[1, 1, 0]), out.qubo.energy(&[0, 1, 0]));
//! # Ok::<(), qubo_ops::Error>(())
//! ```
//!
//! Instances and solutions are exchanged as JSON records, see [`record`].

pub mod constrain;
pub mod duplicate;
pub mod error;
pub mod flip;
pub mod provenance;
pub mod qubo;
pub mod record;
pub mod reduce;
pub mod renumber;
pub mod select;
pub mod shuffle;
pub mod solution;
pub mod split;

pub use error::{Error, Result};
