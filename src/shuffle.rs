//! Bit shuffle: relabel all bits by a uniformly random permutation.
//!
//! Weights and the offset are untouched; only index locality is destroyed.

use log::debug;
use num_bigint::BigInt;
use num_traits::Zero;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::provenance::{Provenance, Transformed};
use crate::qubo::Qubo;
use crate::select::{permutation, seeded};
use crate::solution::Solution;

#[derive(Debug, Clone, Default)]
pub struct ShuffleParams {
    pub seed: u64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShuffleProvenance {
    /// `mapping[old] = new`.
    pub mapping: Vec<usize>,
}

impl ShuffleProvenance {
    /// `inverse[new] = old`.
    pub fn inverse(&self) -> Vec<usize> {
        let mut inverse = vec![0; self.mapping.len()];
        for (old, &new) in self.mapping.iter().enumerate() {
            inverse[new] = old;
        }
        inverse
    }
}

impl Provenance for ShuffleProvenance {
    fn operation(&self) -> &'static str {
        "bit shuffle"
    }

    fn offset_delta(&self) -> BigInt {
        BigInt::zero()
    }

    fn write_fields(&self, fields: &mut Map<String, Value>) {
        fields.insert("mapping".into(), Value::from(self.mapping.clone()));
    }
}

pub fn shuffle(qubo: &Qubo, solution: Option<&Solution>, params: &ShuffleParams) -> Result<Transformed<ShuffleProvenance>> {
    let nbit = qubo.nbit();
    if let Some(s) = solution {
        s.check(nbit)?;
    }

    let mut rng = seeded(params.seed);
    let mapping = permutation(&mut rng, nbit);
    let q = qubo.permuted(&mapping);
    debug!("shuffled {} bits ({} terms)", nbit, q.len());

    let solution = solution.map(|s| {
        let mut bits = vec![0; nbit];
        for (old, &new) in mapping.iter().enumerate() {
            bits[new] = s.bits[old];
        }
        Solution {
            bits,
            energy: s.energy.clone(),
            offset: Some(q.offset().clone()),
            selected: s.selected.iter().map(|&i| mapping[i]).collect(),
        }
    });

    Ok(Transformed {
        qubo: q,
        solution,
        provenance: ShuffleProvenance { mapping },
    })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn sample_qubo() -> Qubo {
        Qubo::from_terms(
            4,
            [
                (0, 0, BigInt::from(2)),
                (0, 3, BigInt::from(-7)),
                (1, 2, BigInt::from(4)),
                (3, 3, BigInt::from(1)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shuffle_round_trip() {
        let q = sample_qubo();
        let out = shuffle(&q, None, &ShuffleParams { seed: 17 }).unwrap();
        assert!(out.qubo.is_canonical());
        let back = out.qubo.permuted(&out.provenance.inverse());
        assert_eq!(back.triples(), q.triples());
    }

    #[test]
    fn test_shuffle_keeps_energy() {
        let q = sample_qubo();
        let s = Solution::new(vec![1, 0, 1, 1]);
        let out = shuffle(&q, Some(&s), &ShuffleParams { seed: 5 }).unwrap();
        let t = out.solution.unwrap();
        assert_eq!(out.qubo.energy(&t.bits), q.energy(&s.bits));
    }

    #[test]
    fn test_shuffle_empty() {
        let out = shuffle(&Qubo::new(0), None, &ShuffleParams::default()).unwrap();
        assert_eq!(out.qubo.nbit(), 0);
        assert!(out.provenance.mapping.is_empty());
    }

    #[test]
    fn test_shuffle_reproducible() {
        let q = sample_qubo();
        let a = shuffle(&q, None, &ShuffleParams { seed: 9 }).unwrap();
        let b = shuffle(&q, None, &ShuffleParams { seed: 9 }).unwrap();
        assert_eq!(a.provenance, b.provenance);
        assert_eq!(a.qubo, b.qubo);
    }
}
