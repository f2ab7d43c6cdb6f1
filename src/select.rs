//! Seeded randomness and random bit selection.
//!
//! Every transform draws from a [`ChaCha8Rng`] seeded with a user-supplied
//! `u64`, so the same seed and input always reproduce the same output.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::solution::Solution;

/// Creates the deterministic generator used by all transforms.
pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Draws `k` distinct indices from `0..n`, in random order.
pub fn sample<R: Rng + ?Sized>(rng: &mut R, n: usize, k: usize) -> Vec<usize> {
    assert!(k <= n, "Cannot draw {} distinct indices out of {}", k, n);
    index::sample(rng, n, k).into_vec()
}

/// Draws `k` distinct elements of `pool`, in random order.
pub fn sample_from<R: Rng + ?Sized>(rng: &mut R, pool: &[usize], k: usize) -> Vec<usize> {
    sample(rng, pool.len(), k).into_iter().map(|i| pool[i]).collect()
}

/// Bits of `0..nbit` not in the solution's selected set, ascending.
pub fn free_bits(nbit: usize, solution: Option<&Solution>) -> Vec<usize> {
    match solution {
        Some(s) if !s.selected.is_empty() => {
            let selected: BTreeSet<usize> = s.selected.iter().copied().collect();
            (0..nbit).filter(|i| !selected.contains(i)).collect()
        }
        _ => (0..nbit).collect(),
    }
}

/// Uniformly random permutation of `0..n`.
pub fn permutation<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<usize> {
    let mut p: Vec<usize> = (0..n).collect();
    p.shuffle(rng);
    p
}

/// Number of bits to select: an absolute count or a fraction of `nbit`.
///
/// Parsed from strings the way the command line accepts them: an integer
/// literal (`"12"`) is a count, anything else must be a fraction in `[0,1]`
/// (`"0.25"`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Count(usize),
    Fraction(f64),
}

impl Amount {
    /// Resolves the amount against an instance size (fractions round down).
    pub fn resolve(self, nbit: usize) -> usize {
        match self {
            Amount::Count(n) => n,
            Amount::Fraction(f) => (f * nbit as f64).floor() as usize,
        }
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::Count(0)
    }
}

impl From<usize> for Amount {
    fn from(n: usize) -> Self {
        Amount::Count(n)
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            let n = s.parse().map_err(|_| Error::invalid(format!("count '{}' is too large", s)))?;
            return Ok(Amount::Count(n));
        }
        let f: f64 = s
            .parse()
            .map_err(|_| Error::invalid(format!("'{}' is neither a count nor a fraction", s)))?;
        if !(0.0..=1.0).contains(&f) {
            return Err(Error::invalid(format!("fraction {} is outside [0, 1]", f)));
        }
        Ok(Amount::Fraction(f))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Count(n) => write!(f, "{}", n),
            Amount::Fraction(x) => write!(f, "{}", x),
        }
    }
}
