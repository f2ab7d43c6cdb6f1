//! Sparse symmetric coefficient store.
//!
//! A [`Qubo`] holds the objective
//!
//! ```text
//! E(x) = offset + sum_{i <= j} w(i,j) * x_i * x_j,    x in {0,1}^nbit
//! ```
//!
//! Diagonal keys `(i,i)` are the linear terms (`x_i * x_i = x_i`), all other
//! keys the quadratic ones. Keys are kept canonical (`i <= j < nbit`), zero
//! weights are never stored, and storage grows with the number of nonzero
//! terms only: an ordered map of terms plus per-bit neighbor sets.
//!
//! Weights are `BigInt`, so sums of user-supplied penalties over long chains
//! or large groups never overflow.
//!
//! # Example
//!
//! ```
//! use num_bigint::BigInt;
//! use qubo_ops::qubo::Qubo;
//!
//! let mut q = Qubo::new(3);
//! q.set(0, 0, -1);
//! q.set(1, 0, 5); // stored as (0,1)
//! q.accumulate(0, 1, -5); // cancels, entry is dropped
//! assert_eq!(q.len(), 1);
//! assert_eq!(q.energy(&[1, 1, 0]), BigInt::from(-1));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::error::{Error, Result};
use crate::renumber::Renumbering;

/// Canonical key order.
fn sort_pair(i: usize, j: usize) -> (usize, usize) {
    if i <= j {
        (i, j)
    } else {
        (j, i)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Qubo {
    nbit: usize,
    offset: BigInt,
    terms: BTreeMap<(usize, usize), BigInt>,
    /// Off-diagonal neighbors of every bit.
    adjacency: Vec<BTreeSet<usize>>,
}

impl Qubo {
    /// Creates an empty instance over `nbit` bits.
    pub fn new(nbit: usize) -> Self {
        Self {
            nbit,
            offset: BigInt::zero(),
            terms: BTreeMap::new(),
            adjacency: vec![BTreeSet::new(); nbit],
        }
    }

    /// Builds an instance from (possibly non-canonical) triples.
    ///
    /// Entries for the same unordered pair are summed.
    pub fn from_terms<I>(nbit: usize, terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, BigInt)>,
    {
        let mut q = Self::new(nbit);
        for (i, j, w) in terms {
            if i >= nbit || j >= nbit {
                return Err(Error::malformed(format!(
                    "term [{}, {}] is out of range for nbit = {}",
                    i, j, nbit
                )));
            }
            q.accumulate(i, j, w);
        }
        Ok(q)
    }

    pub fn nbit(&self) -> usize {
        self.nbit
    }

    /// Constant term of the objective.
    pub fn offset(&self) -> &BigInt {
        &self.offset
    }

    pub fn set_offset(&mut self, offset: impl Into<BigInt>) {
        self.offset = offset.into();
    }

    pub fn add_offset(&mut self, delta: &BigInt) {
        self.offset += delta;
    }

    /// Number of stored (nonzero) terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn check_index(&self, i: usize) {
        assert!(i < self.nbit, "Bit {} is out of range 0..{}", i, self.nbit);
    }

    /// Weight of the term on `(i,j)`, if any.
    pub fn weight(&self, i: usize, j: usize) -> Option<&BigInt> {
        self.terms.get(&sort_pair(i, j))
    }

    /// Weight of the term on `(i,j)`, zero if absent.
    pub fn get(&self, i: usize, j: usize) -> BigInt {
        self.weight(i, j).cloned().unwrap_or_default()
    }

    /// Sets the weight on `(i,j)`. A zero weight removes the entry.
    pub fn set(&mut self, i: usize, j: usize, weight: impl Into<BigInt>) {
        self.check_index(i);
        self.check_index(j);
        let key = sort_pair(i, j);
        let weight = weight.into();
        if weight.is_zero() {
            self.remove(i, j);
            return;
        }
        if self.terms.insert(key, weight).is_none() && i != j {
            self.adjacency[i].insert(j);
            self.adjacency[j].insert(i);
        }
    }

    /// Adds `delta` to the weight on `(i,j)`.
    pub fn accumulate(&mut self, i: usize, j: usize, delta: impl Into<BigInt>) {
        let delta = delta.into();
        if delta.is_zero() {
            return;
        }
        let weight = self.get(i, j) + delta;
        self.set(i, j, weight);
    }

    /// Removes the term on `(i,j)`, returning its weight.
    pub fn remove(&mut self, i: usize, j: usize) -> Option<BigInt> {
        let removed = self.terms.remove(&sort_pair(i, j));
        if removed.is_some() && i != j {
            self.adjacency[i].remove(&j);
            self.adjacency[j].remove(&i);
        }
        removed
    }

    /// Bits sharing a quadratic term with `i`, ascending.
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[i].iter().copied()
    }

    pub fn degree(&self, i: usize) -> usize {
        self.adjacency[i].len()
    }

    /// All terms, sorted ascending by `(i,j)`.
    pub fn terms(&self) -> impl Iterator<Item = (usize, usize, &BigInt)> + '_ {
        self.terms.iter().map(|(&(i, j), w)| (i, j, w))
    }

    /// Serializable `[i, j, weight]` triples, sorted ascending by `(i,j)`.
    pub fn triples(&self) -> Vec<(usize, usize, BigInt)> {
        self.terms().map(|(i, j, w)| (i, j, w.clone())).collect()
    }

    /// Appends fresh bits (without any terms) up to `nbit`.
    pub fn grow(&mut self, nbit: usize) {
        assert!(nbit >= self.nbit, "Cannot shrink from {} to {} bits", self.nbit, nbit);
        self.adjacency.resize(nbit, BTreeSet::new());
        self.nbit = nbit;
    }

    /// Sum of absolute weights of every term touching bit `i`.
    ///
    /// This bounds the change of the objective when `x_i` is flipped.
    pub fn local_bound(&self, i: usize) -> BigInt {
        let mut bound = self.weight(i, i).map(|w| w.abs()).unwrap_or_default();
        for j in self.neighbors(i) {
            bound += self.get(i, j).abs();
        }
        bound
    }

    /// Objective value without the constant offset.
    pub fn terms_energy(&self, x: &[u8]) -> BigInt {
        assert_eq!(x.len(), self.nbit, "Assignment has {} bits, expected {}", x.len(), self.nbit);
        let mut energy = BigInt::zero();
        for (i, j, w) in self.terms() {
            if x[i] != 0 && x[j] != 0 {
                energy += w;
            }
        }
        energy
    }

    /// Objective value including the constant offset.
    pub fn energy(&self, x: &[u8]) -> BigInt {
        self.terms_energy(x) + &self.offset
    }

    /// Checks the store invariant: every key satisfies `i <= j < nbit` and no
    /// weight equals zero.
    pub fn is_canonical(&self) -> bool {
        self.terms.iter().all(|(&(i, j), w)| i <= j && j < self.nbit && !w.is_zero())
            && self.adjacency.len() == self.nbit
    }

    /// Substitutes `x -> 1 - x` for a single bit, in place.
    ///
    /// The diagonal weight `w` becomes `-w` and moves `w` into the offset;
    /// every quadratic weight `v` on `(x,y)` becomes `-v` and adds `v` to the
    /// diagonal of `y`. Returns the offset contribution `w`.
    pub fn flip_bit(&mut self, x: usize) -> BigInt {
        self.check_index(x);
        let w = self.get(x, x);
        self.set(x, x, -&w);
        let neighbors: Vec<usize> = self.neighbors(x).collect();
        for y in neighbors {
            let v = self.get(x, y);
            self.set(x, y, -&v);
            self.accumulate(y, y, v);
        }
        self.offset += &w;
        w
    }

    /// Merges bit `drop` into bit `keep`, assuming both always take the same
    /// value: `w(i,keep) += w(i,drop)` for every other `i`, and
    /// `w(keep,keep) += w(drop,drop) + w(keep,drop)`.
    ///
    /// Afterwards `drop` has no terms left; the index itself is not removed.
    pub fn merge_bits(&mut self, keep: usize, drop: usize) {
        assert_ne!(keep, drop, "Cannot merge bit {} into itself", keep);
        self.check_index(keep);
        self.check_index(drop);
        let neighbors: Vec<usize> = self.neighbors(drop).collect();
        for i in neighbors {
            if let Some(w) = self.remove(drop, i) {
                // For i == keep, x_keep * x_drop == x_keep.
                self.accumulate(keep, i, w);
            }
        }
        if let Some(w) = self.remove(drop, drop) {
            self.accumulate(keep, keep, w);
        }
    }

    /// Relabels every bit `i` as `p[i]`.
    pub fn permuted(&self, p: &[usize]) -> Qubo {
        assert_eq!(p.len(), self.nbit, "Permutation has {} entries, expected {}", p.len(), self.nbit);
        let mut res = Qubo::new(self.nbit);
        res.offset = self.offset.clone();
        for (i, j, w) in self.terms() {
            res.set(p[i], p[j], w.clone());
        }
        res
    }

    /// Applies a renumbering to all keys.
    ///
    /// Removed bits must not carry any term.
    pub fn renumbered(&self, renumbering: &Renumbering) -> Qubo {
        assert_eq!(renumbering.original_len(), self.nbit);
        let table = renumbering.table();
        let mut res = Qubo::new(renumbering.len());
        res.offset = self.offset.clone();
        for (i, j, w) in self.terms() {
            match (table[i], table[j]) {
                (Some(a), Some(b)) => res.set(a, b, w.clone()),
                _ => panic!("Term ({}, {}) references a removed bit", i, j),
            }
        }
        res
    }
}

impl Display for Qubo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Qubo(nbit={}, terms={}, offset={})", self.nbit, self.len(), self.offset)
    }
}
