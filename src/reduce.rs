//! Bit reduction: merge pairs of bits that agree on a known solution.
//!
//! For a pair `(a, b)` with `a < b` and `x_a == x_b`, every term on `b` is
//! folded into `a` (see [`Qubo::merge_bits`]) and `b` is removed. A *mixed*
//! pair (one bit 0, one bit 1) first has its 1-valued member flipped, which
//! makes both members 0 and contributes to the offset.
//!
//! Pairs are processed in ascending order of their lower index. All indices
//! stay in the original numbering while merging; the removed bits are closed
//! up once at the end with a single [`Renumbering`], which is equivalent to
//! renumbering after every merge.

use std::collections::BTreeSet;

use log::debug;
use num_bigint::BigInt;
use num_traits::Zero;
use rand::Rng;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::provenance::{Provenance, Transformed};
use crate::qubo::Qubo;
use crate::record::int_value;
use crate::renumber::Renumbering;
use crate::select::{sample_from, seeded};
use crate::solution::Solution;

#[derive(Debug, Clone, Default)]
pub struct ReduceParams {
    /// Number of bits to remove (one per merged pair).
    pub count: usize,
    /// How many of the pairs are mixed.
    pub mixed: usize,
    /// Bits that must not be merged, in addition to the solution's selected set.
    pub reserved: Vec<usize>,
    pub seed: u64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReduceProvenance {
    pub mixed: usize,
    /// Merged pairs `(survivor, removed)` in original indices, ascending.
    pub pairs: Vec<(usize, usize)>,
    /// Bits flipped before merging (original indices), ascending.
    pub flipped: Vec<usize>,
    pub offset_delta: BigInt,
    pub renumbering: Renumbering,
}

impl ReduceProvenance {
    pub fn reduction(&self) -> usize {
        self.pairs.len()
    }

    /// Expands an assignment of the reduced instance into an assignment of
    /// the original one with the same energy.
    pub fn expand(&self, reduced: &[u8]) -> Vec<u8> {
        assert_eq!(reduced.len(), self.renumbering.len());
        let flipped: BTreeSet<usize> = self.flipped.iter().copied().collect();
        let flip = |i: usize| u8::from(flipped.contains(&i));

        let mut bits = vec![0; self.renumbering.original_len()];
        for (new, &value) in reduced.iter().enumerate() {
            let old = self.renumbering.original_of(new);
            bits[old] = value ^ flip(old);
        }
        for &(a, b) in &self.pairs {
            bits[b] = bits[a] ^ flip(a) ^ flip(b);
        }
        bits
    }
}

impl Provenance for ReduceProvenance {
    fn operation(&self) -> &'static str {
        "bit reduction"
    }

    fn offset_delta(&self) -> BigInt {
        self.offset_delta.clone()
    }

    fn write_fields(&self, fields: &mut Map<String, Value>) {
        fields.insert("reduction number".into(), Value::from(self.reduction()));
        fields.insert("mixed pairs".into(), Value::from(self.mixed));
        let pairs = self.pairs.iter().map(|&(a, b)| Value::from(vec![a, b])).collect();
        fields.insert("pairs".into(), Value::Array(pairs));
        fields.insert("flipped".into(), Value::from(self.flipped.clone()));
        fields.insert("offset delta".into(), int_value(&self.offset_delta));
        fields.insert("mapping".into(), Value::from(self.renumbering.table()));
    }
}

/// Draws `mixed` mixed pairs and `count - mixed` equal-valued pairs.
fn draw_pairs<R: Rng + ?Sized>(
    rng: &mut R,
    mut zeros: Vec<usize>,
    mut ones: Vec<usize>,
    count: usize,
    mixed: usize,
) -> Vec<(usize, usize)> {
    let mixed_zeros = sample_from(rng, &zeros, mixed);
    let mixed_ones = sample_from(rng, &ones, mixed);
    let taken: BTreeSet<usize> = mixed_zeros.iter().chain(&mixed_ones).copied().collect();
    zeros.retain(|i| !taken.contains(i));
    ones.retain(|i| !taken.contains(i));

    let mut pairs: Vec<(usize, usize)> = mixed_zeros
        .iter()
        .zip(&mixed_ones)
        .map(|(&z, &o)| (z.min(o), z.max(o)))
        .collect();

    for _ in mixed..count {
        // Pick the class of a random remaining bit, falling back to the other
        // class when that one cannot supply a pair.
        let pick = rng.random_range(0..zeros.len() + ones.len());
        let from_zeros = if pick < zeros.len() {
            zeros.len() >= 2
        } else {
            ones.len() < 2
        };
        let pool = if from_zeros { &mut zeros } else { &mut ones };
        let a = pool.swap_remove(rng.random_range(0..pool.len()));
        let b = pool.swap_remove(rng.random_range(0..pool.len()));
        pairs.push((a.min(b), a.max(b)));
    }

    pairs.sort();
    pairs
}

pub fn reduce(qubo: &Qubo, solution: &Solution, params: &ReduceParams) -> Result<Transformed<ReduceProvenance>> {
    let nbit = qubo.nbit();
    solution.check(nbit)?;
    let (count, mixed) = (params.count, params.mixed);
    if mixed > count {
        return Err(Error::invalid(format!(
            "number of mixed pairs ({}) exceeds the reduction number ({})",
            mixed, count
        )));
    }
    if let Some(&i) = params.reserved.iter().find(|&&i| i >= nbit) {
        return Err(Error::invalid(format!("reserved bit {} is out of range 0..{}", i, nbit)));
    }

    let excluded: BTreeSet<usize> = solution.selected.iter().chain(&params.reserved).copied().collect();
    let candidates = |value: u8| -> Vec<usize> {
        (0..nbit)
            .filter(|i| !excluded.contains(i) && solution.bits[*i] == value)
            .collect()
    };
    let zeros = candidates(0);
    let ones = candidates(1);
    if mixed > zeros.len() || mixed > ones.len() {
        return Err(Error::infeasible(format!(
            "cannot form {} mixed pairs from {} zero bits and {} one bits",
            mixed,
            zeros.len(),
            ones.len()
        )));
    }
    let equal_available = (zeros.len() - mixed) / 2 + (ones.len() - mixed) / 2;
    if equal_available < count - mixed {
        return Err(Error::infeasible(format!(
            "cannot form {} equal-valued pairs, only {} available",
            count - mixed,
            equal_available
        )));
    }

    let mut rng = seeded(params.seed);
    let pairs = draw_pairs(&mut rng, zeros, ones, count, mixed);

    let mut q = qubo.clone();
    let mut bits = solution.bits.clone();
    let mut flipped = Vec::with_capacity(mixed);
    let mut offset_delta = BigInt::zero();
    let mut renumbering = Renumbering::new(nbit);
    for &(a, b) in &pairs {
        if bits[a] != bits[b] {
            let m = if bits[a] == 1 { a } else { b };
            offset_delta += q.flip_bit(m);
            bits[m] = 0;
            flipped.push(m);
        }
        q.merge_bits(a, b);
        renumbering.remove(b);
    }
    flipped.sort();

    let reduced = q.renumbered(&renumbering);
    debug!(
        "reduced {} -> {} bits ({} mixed pairs), offset delta {}",
        nbit,
        reduced.nbit(),
        mixed,
        offset_delta
    );

    let selected: Vec<usize> = solution
        .selected
        .iter()
        .copied()
        .chain(pairs.iter().map(|&(a, _)| a))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let solution = Solution {
        bits: renumbering.compact(&bits),
        energy: solution.energy.clone(),
        offset: Some(reduced.offset().clone()),
        selected: renumbering.indices(&selected),
    };

    Ok(Transformed {
        qubo: reduced,
        solution: Some(solution),
        provenance: ReduceProvenance {
            mixed,
            pairs,
            flipped,
            offset_delta,
            renumbering,
        },
    })
}
