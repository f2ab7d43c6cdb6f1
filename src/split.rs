//! Exact-sum random splitting of integer weights.
//!
//! [`split_exact`] breaks a weight into `parts` random integers that add up to
//! the original value exactly. Any such split keeps the objective unchanged on
//! assignments where all receiving slots take the same value, which is what
//! bit duplication relies on when it spreads a term across replicas.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rand::seq::SliceRandom;
use rand::Rng;

/// Splits `total` into `parts` random integers summing to `total`.
///
/// All but one part are drawn uniformly from `[-|total|, |total|]` (the range
/// is capped at `u64::MAX` for larger totals); the remaining part absorbs the
/// difference and is placed at a random position.
pub fn split_exact<R: Rng + ?Sized>(rng: &mut R, total: &BigInt, parts: usize) -> Vec<BigInt> {
    assert!(parts > 0, "Cannot split a weight into zero parts");
    let bound = total.magnitude().to_u64().unwrap_or(u64::MAX) as i128;
    let mut res = Vec::with_capacity(parts);
    let mut rest = total.clone();
    for _ in 1..parts {
        let v = BigInt::from(rng.random_range(-bound..=bound));
        rest -= &v;
        res.push(v);
    }
    res.push(rest);
    res.shuffle(rng);
    res
}
