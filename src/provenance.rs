//! Provenance records relating a transform's output to its input.

use num_bigint::BigInt;
use serde_json::{Map, Value};

use crate::qubo::Qubo;
use crate::solution::Solution;

/// Metadata every transform reports about its output.
pub trait Provenance {
    /// Operation name, written to the `operation` field of the output record.
    fn operation(&self) -> &'static str;

    /// Constant added to the offset by the transform.
    fn offset_delta(&self) -> BigInt;

    /// Writes the operation-specific fields (parameters and index relation).
    fn write_fields(&self, fields: &mut Map<String, Value>);
}

/// Result of a single transform.
#[derive(Debug, Clone)]
pub struct Transformed<P> {
    pub qubo: Qubo,
    /// The input solution carried over to the new instance, if one was given.
    pub solution: Option<Solution>,
    pub provenance: P,
}
