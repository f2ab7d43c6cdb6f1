//! Bit flip: substitute `x -> 1 - x` for a set of bits.
//!
//! ```text
//! w * x           = w - w * (1 - x)             (diagonal: -w, offset += w)
//! w * x * y       = w * y - w * (1 - x) * y     (edge: -w, diag(y) += w)
//! ```
//!
//! Flipped bits are visited in ascending order and each flip rewrites the
//! current store, so an edge with both endpoints flipped gets the rule applied
//! once per endpoint. The energy of every assignment is preserved once the
//! flipped bits are complemented and the offset delta is added back.

use std::collections::BTreeSet;

use log::debug;
use num_bigint::BigInt;
use num_traits::Zero;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::provenance::{Provenance, Transformed};
use crate::qubo::Qubo;
use crate::select::{free_bits, sample_from, seeded, Amount};
use crate::solution::Solution;

#[derive(Debug, Clone, Default)]
pub struct FlipParams {
    /// Number of bits to flip, or a fraction of `nbit`.
    pub amount: Amount,
    pub seed: u64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FlipProvenance {
    /// Size of the (identity) index mapping.
    pub nbit: usize,
    /// Flipped bits, ascending.
    pub flipped: Vec<usize>,
    pub offset_delta: BigInt,
}

impl Provenance for FlipProvenance {
    fn operation(&self) -> &'static str {
        "bit flipping"
    }

    fn offset_delta(&self) -> BigInt {
        self.offset_delta.clone()
    }

    fn write_fields(&self, fields: &mut Map<String, Value>) {
        fields.insert("flipped".into(), Value::from(self.flipped.clone()));
        fields.insert("offset delta".into(), crate::record::int_value(&self.offset_delta));
    }
}

/// Flips a random selection of bits, skipping the solution's selected set.
pub fn flip(qubo: &Qubo, solution: Option<&Solution>, params: &FlipParams) -> Result<Transformed<FlipProvenance>> {
    let nbit = qubo.nbit();
    if let Some(s) = solution {
        s.check(nbit)?;
    }
    let pool = free_bits(nbit, solution);
    let count = params.amount.resolve(nbit);
    if count > pool.len() {
        return Err(Error::infeasible(format!(
            "cannot flip {} bits, only {} of {} are free",
            count,
            pool.len(),
            nbit
        )));
    }
    let mut rng = seeded(params.seed);
    let bits = sample_from(&mut rng, &pool, count);
    flip_set(qubo, solution, &bits)
}

/// Flips exactly the given bits (duplicates are ignored).
pub fn flip_set(qubo: &Qubo, solution: Option<&Solution>, bits: &[usize]) -> Result<Transformed<FlipProvenance>> {
    let nbit = qubo.nbit();
    if let Some(&x) = bits.iter().find(|&&x| x >= nbit) {
        return Err(Error::invalid(format!("bit {} is out of range 0..{}", x, nbit)));
    }
    if let Some(s) = solution {
        s.check(nbit)?;
    }

    let flipped: Vec<usize> = bits.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

    let mut q = qubo.clone();
    let mut offset_delta = BigInt::zero();
    for &x in &flipped {
        offset_delta += q.flip_bit(x);
    }
    debug!("flipped {} of {} bits, offset delta {}", flipped.len(), nbit, offset_delta);

    let solution = solution.map(|s| {
        let mut s = s.clone();
        for &x in &flipped {
            s.flip(x);
        }
        s.offset = Some(q.offset().clone());
        s
    });

    Ok(Transformed {
        qubo: q,
        solution,
        provenance: FlipProvenance {
            nbit,
            flipped,
            offset_delta,
        },
    })
}
