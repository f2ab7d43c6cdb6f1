//! Known assignments carried alongside an instance.

use num_bigint::BigInt;

use crate::error::{Error, Result};

/// A 0/1 assignment of every bit of an instance.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Solution {
    pub bits: Vec<u8>,
    /// Known energy of the assignment, offset included.
    pub energy: Option<BigInt>,
    /// Offset accumulated by earlier transforms.
    pub offset: Option<BigInt>,
    /// Indices already consumed by earlier transforms ("selected bits
    /// indices"), excluded from random selection in later ones.
    pub selected: Vec<usize>,
}

impl Solution {
    pub fn new(bits: Vec<u8>) -> Self {
        Self {
            bits,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Checks that the solution fits an instance over `nbit` bits.
    pub fn check(&self, nbit: usize) -> Result<()> {
        if self.bits.len() != nbit {
            return Err(Error::malformed(format!(
                "solution has {} bits, but the instance has nbit = {}",
                self.bits.len(),
                nbit
            )));
        }
        if let Some(b) = self.bits.iter().find(|&&b| b > 1) {
            return Err(Error::malformed(format!("solution bit {} is not 0 or 1", b)));
        }
        if let Some(i) = self.selected.iter().find(|&&i| i >= nbit) {
            return Err(Error::malformed(format!("selected bit index {} is out of range", i)));
        }
        Ok(())
    }

    /// Indices of bits set to `value`, ascending.
    pub fn indices_of(&self, value: u8) -> Vec<usize> {
        (0..self.bits.len()).filter(|&i| self.bits[i] == value).collect()
    }

    pub fn flip(&mut self, i: usize) {
        self.bits[i] ^= 1;
    }
}
