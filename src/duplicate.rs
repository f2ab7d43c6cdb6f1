//! Bit duplication: replace selected bits by chains of agreeing replicas.
//!
//! A selected bit `b` with replica count `k` becomes the chain
//! `[b, r_1, ..., r_{k-1}]`, where `b` itself is replica 0 and the `r_j` are
//! fresh indices appended after all existing bits (chains of the first group
//! first, in ascending order of the selected bit, then the next group).
//!
//! Every term touching a selected bit is spread over the corresponding
//! replica slots with [`split_exact`], so on assignments where all replicas of
//! a chain agree the objective is unchanged:
//!
//! - diagonal `w(b,b)` over the `k` replica diagonals and the `k(k-1)/2`
//!   replica pairs;
//! - edge `w(b,c)` over all `k_b * k_c` pairs of replicas of `b` and `c`
//!   (`k_c = 1` for a bit that is not duplicated).
//!
//! Agreement is then enforced by a chain penalty `P * (r_j - r_{j+1})^2`
//! between consecutive replicas, i.e. `diag(r_j) += P`, `diag(r_{j+1}) += P`,
//! `w(r_j, r_{j+1}) -= 2P`. Without a user-supplied penalty, every chain gets
//! the sum of absolute weights touching its replicas (at least 1): changing
//! any subset of a chain's replicas cannot move the unpenalized objective by
//! more than that, so a disagreeing chain never beats the agreeing one.

use log::debug;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::provenance::{Provenance, Transformed};
use crate::qubo::Qubo;
use crate::record::int_array;
use crate::select::{free_bits, sample_from, seeded, Amount};
use crate::solution::Solution;
use crate::split::split_exact;

/// One independently sized duplication group.
#[derive(Debug, Clone)]
pub struct DuplicationGroup {
    /// Number of selected bits, or a fraction of `nbit`.
    pub amount: Amount,
    /// Replicas per selected bit, the original bit included.
    pub replicas: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateParams {
    pub groups: Vec<DuplicationGroup>,
    /// Chain penalty; derived per chain when `None`.
    pub penalty: Option<BigInt>,
    pub seed: u64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GroupProvenance {
    /// Selected original bits, ascending.
    pub selected: Vec<usize>,
    pub replicas: usize,
    /// `chains[i] = [selected[i], replica_1, ..., replica_{k-1}]`.
    pub chains: Vec<Vec<usize>>,
    /// Penalty used for each chain.
    pub penalties: Vec<BigInt>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DuplicateProvenance {
    pub original_nbit: usize,
    pub groups: Vec<GroupProvenance>,
}

impl DuplicateProvenance {
    pub fn duplicated_bits(&self) -> usize {
        self.groups.iter().map(|g| g.selected.len()).sum()
    }

    pub fn chains(&self) -> impl Iterator<Item = &Vec<usize>> + '_ {
        self.groups.iter().flat_map(|g| g.chains.iter())
    }

    /// Projects an assignment of the duplicated instance back onto the
    /// original bits (replica 0 of every chain is the original index).
    pub fn restrict(&self, bits: &[u8]) -> Vec<u8> {
        bits[..self.original_nbit].to_vec()
    }
}

impl Provenance for DuplicateProvenance {
    fn operation(&self) -> &'static str {
        "bit duplication"
    }

    fn offset_delta(&self) -> BigInt {
        BigInt::zero()
    }

    fn write_fields(&self, fields: &mut Map<String, Value>) {
        fields.insert("duplicated_bits".into(), Value::from(self.duplicated_bits()));
        let groups = self
            .groups
            .iter()
            .map(|g| {
                let mut group = Map::new();
                group.insert("duplicated".into(), Value::from(g.selected.clone()));
                group.insert("replicas".into(), Value::from(g.replicas));
                group.insert("penalty".into(), int_array(&g.penalties));
                group.insert("mapping".into(), Value::from(g.chains.clone()));
                Value::Object(group)
            })
            .collect();
        fields.insert("groups".into(), Value::Array(groups));
    }
}

/// Indices standing in for original bit `i` in the duplicated instance.
fn replicas_of(chain_of: &[Option<usize>], chains: &[Vec<usize>], i: usize) -> Vec<usize> {
    match chain_of[i] {
        Some(c) => chains[c].clone(),
        None => vec![i],
    }
}

pub fn duplicate(
    qubo: &Qubo,
    solution: Option<&Solution>,
    params: &DuplicateParams,
) -> Result<Transformed<DuplicateProvenance>> {
    let nbit = qubo.nbit();
    if let Some(s) = solution {
        s.check(nbit)?;
    }
    if let Some(p) = &params.penalty {
        if p.is_negative() {
            return Err(Error::invalid(format!("penalty must be non-negative, got {}", p)));
        }
    }
    if let Some(g) = params.groups.iter().find(|g| g.replicas == 0) {
        return Err(Error::invalid(format!("replica count must be at least 1 (group of {})", g.amount)));
    }
    let counts: Vec<usize> = params.groups.iter().map(|g| g.amount.resolve(nbit)).collect();
    let total: usize = counts.iter().sum();
    let pool = free_bits(nbit, solution);
    if total > pool.len() {
        return Err(Error::infeasible(format!(
            "cannot select {} bits to duplicate, only {} of {} are free",
            total,
            pool.len(),
            nbit
        )));
    }

    let mut rng = seeded(params.seed);
    let drawn = sample_from(&mut rng, &pool, total);

    // Lay out the chains group by group.
    let mut chain_of: Vec<Option<usize>> = vec![None; nbit];
    let mut chains: Vec<Vec<usize>> = Vec::with_capacity(total);
    let mut groups = Vec::with_capacity(params.groups.len());
    let mut next = nbit;
    let mut start = 0;
    for (group, &count) in params.groups.iter().zip(&counts) {
        let mut selected = drawn[start..start + count].to_vec();
        selected.sort();
        start += count;

        let first_chain = chains.len();
        for &b in &selected {
            let mut chain = vec![b];
            chain.extend(next..next + group.replicas - 1);
            next += group.replicas - 1;
            chain_of[b] = Some(chains.len());
            chains.push(chain);
        }
        groups.push(GroupProvenance {
            selected,
            replicas: group.replicas,
            chains: chains[first_chain..].to_vec(),
            penalties: Vec::new(),
        });
    }

    // Redistribute every term over the replica slots.
    let mut q = Qubo::new(next);
    q.set_offset(qubo.offset().clone());
    for (i, j, w) in qubo.terms() {
        let slots: Vec<(usize, usize)> = if i == j {
            let chain = replicas_of(&chain_of, &chains, i);
            (0..chain.len())
                .flat_map(|a| (a..chain.len()).map(move |b| (a, b)))
                .map(|(a, b)| (chain[a], chain[b]))
                .collect()
        } else {
            let xs = replicas_of(&chain_of, &chains, i);
            let ys = replicas_of(&chain_of, &chains, j);
            xs.iter().flat_map(|&x| ys.iter().map(move |&y| (x, y))).collect()
        };
        if slots.len() == 1 {
            q.set(slots[0].0, slots[0].1, w.clone());
            continue;
        }
        let parts = split_exact(&mut rng, w, slots.len());
        for ((x, y), v) in slots.into_iter().zip(parts) {
            q.accumulate(x, y, v);
        }
    }

    // Every bound is taken before any penalty is inserted.
    let penalties: Vec<BigInt> = chains
        .iter()
        .map(|chain| match &params.penalty {
            Some(p) => p.clone(),
            None => {
                let bound: BigInt = chain.iter().map(|&r| q.local_bound(r)).sum();
                bound.max(BigInt::one())
            }
        })
        .collect();

    let two = BigInt::from(2);
    for (chain, p) in chains.iter().zip(&penalties) {
        for pair in chain.windows(2) {
            q.accumulate(pair[0], pair[0], p.clone());
            q.accumulate(pair[1], pair[1], p.clone());
            q.accumulate(pair[0], pair[1], -(&two * p));
        }
    }

    let mut first = 0;
    for group in &mut groups {
        let n = group.chains.len();
        group.penalties = penalties[first..first + n].to_vec();
        first += n;
    }
    debug!("duplicated {} bits in {} groups: nbit {} -> {}", total, groups.len(), nbit, next);

    let solution = solution.map(|s| {
        let mut s = s.clone();
        s.bits.resize(next, 0);
        for chain in &chains {
            let value = s.bits[chain[0]];
            for &r in &chain[1..] {
                s.bits[r] = value;
            }
        }
        s.offset = Some(q.offset().clone());
        s
    });

    Ok(Transformed {
        qubo: q,
        solution,
        provenance: DuplicateProvenance {
            original_nbit: nbit,
            groups,
        },
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
                (0, 0, BigInt::from(-3)),
                (1, 1, BigInt::from(2)),
                (2, 2, BigInt::from(-1)),
                (0, 1, BigInt::from(4)),
                (1, 3, BigInt::from(-6)),
                (2, 3, BigInt::from(5)),
                (0, 2, BigInt::from(-2)),
            ],
        )
        .unwrap()
    }

    fn params(groups: &[(usize, usize)], penalty: Option<i64>, seed: u64) -> DuplicateParams {
        DuplicateParams {
            groups: groups
                .iter()
                .map(|&(n, k)| DuplicationGroup {
                    amount: Amount::Count(n),
                    replicas: k,
                })
                .collect(),
            penalty: penalty.map(BigInt::from),
            seed,
        }
    }

    fn bits(mask: u32, n: usize) -> Vec<u8> {
        (0..n).map(|i| ((mask >> i) & 1) as u8).collect()
    }

    #[test]
    fn test_layout() {
        let out = duplicate(&sample_qubo(), None, &params(&[(2, 3), (1, 2)], None, 1)).unwrap();
        let prov = &out.provenance;
        assert_eq!(out.qubo.nbit(), 4 + 2 * 2 + 1);
        assert_eq!(prov.duplicated_bits(), 3);
        assert_eq!(prov.groups[0].chains[0][1..], [4, 5]);
        assert_eq!(prov.groups[0].chains[1][1..], [6, 7]);
        assert_eq!(prov.groups[1].chains[0][1..], [8]);
        for g in &prov.groups {
            for (chain, &b) in g.chains.iter().zip(&g.selected) {
                assert_eq!(chain[0], b);
                assert_eq!(chain.len(), g.replicas);
            }
            assert_eq!(g.penalties.len(), g.chains.len());
        }
        // Groups are disjoint.
        let a = &prov.groups[0].selected;
        assert!(prov.groups[1].selected.iter().all(|b| !a.contains(b)));
        assert!(out.qubo.is_canonical());
    }

    #[test]
    fn test_agreement_preserves_energy() {
        let q = sample_qubo();
        let out = duplicate(&q, None, &params(&[(2, 3), (1, 2)], Some(7), 4)).unwrap();
        for mask in 0..16 {
            let x = bits(mask, 4);
            let s = Solution::new(x.clone());
            let extended = duplicate(&q, Some(&s), &params(&[(2, 3), (1, 2)], Some(7), 4))
                .unwrap()
                .solution
                .unwrap();
            assert_eq!(out.qubo.energy(&extended.bits), q.energy(&x));
            assert_eq!(out.provenance.restrict(&extended.bits), x);
        }
    }

    #[test]
    fn test_diagonal_split_sums_to_original() {
        let q = sample_qubo();
        let out = duplicate(&q, None, &params(&[(4, 3)], Some(100), 8)).unwrap();
        for chain in out.provenance.chains() {
            let mut sum = BigInt::zero();
            for a in 0..chain.len() {
                for b in a..chain.len() {
                    sum += out.qubo.get(chain[a], chain[b]);
                }
            }
            // Chain penalties cancel out inside the chain: P + P - 2P.
            assert_eq!(sum, q.get(chain[0], chain[0]));
        }
    }

    #[test]
    fn test_auto_penalty_dominates() {
        let q = sample_qubo();
        let out = duplicate(&q, None, &params(&[(2, 2), (1, 3)], None, 2)).unwrap();
        let n = out.qubo.nbit();
        assert!(n <= 12);
        for mask in 0..(1u32 << n) {
            let y = bits(mask, n);
            for chain in out.provenance.chains() {
                if chain.iter().all(|&r| y[r] == y[chain[0]]) {
                    continue;
                }
                for value in 0..2u8 {
                    let mut fixed = y.clone();
                    for &r in chain {
                        fixed[r] = value;
                    }
                    assert!(out.qubo.energy(&fixed) <= out.qubo.energy(&y));
                }
            }
        }
    }

    #[test]
    fn test_selected_bits_are_not_duplicated() {
        let q = sample_qubo();
        let mut s = Solution::new(vec![1, 0, 0, 1]);
        s.selected = vec![0, 2];
        for seed in 0..10 {
            let out = duplicate(&q, Some(&s), &params(&[(1, 2), (1, 3)], None, seed)).unwrap();
            let mut chosen: Vec<usize> = out.provenance.groups.iter().flat_map(|g| g.selected.clone()).collect();
            chosen.sort();
            assert_eq!(chosen, vec![1, 3]);
        }
        assert!(matches!(
            duplicate(&q, Some(&s), &params(&[(2, 2), (1, 2)], None, 0)),
            Err(Error::Infeasible(_))
        ));
    }

    #[test]
    fn test_supplied_penalty_is_recorded() {
        let out = duplicate(&sample_qubo(), None, &params(&[(1, 2), (1, 2)], Some(11), 0)).unwrap();
        for g in &out.provenance.groups {
            assert_eq!(g.penalties, vec![BigInt::from(11)]);
        }
    }

    #[test]
    fn test_single_replica_is_identity() {
        let q = sample_qubo();
        let out = duplicate(&q, None, &params(&[(2, 1)], None, 0)).unwrap();
        assert_eq!(out.qubo.triples(), q.triples());
    }

    #[test]
    fn test_infeasible() {
        let q = sample_qubo();
        assert!(matches!(
            duplicate(&q, None, &params(&[(3, 2), (2, 2)], None, 0)),
            Err(Error::Infeasible(_))
        ));
        assert!(matches!(
            duplicate(&q, None, &params(&[(1, 0)], None, 0)),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            duplicate(&q, None, &params(&[(1, 2)], Some(-1), 0)),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_reproducible() {
        let q = sample_qubo();
        let p = params(&[(2, 3)], None, 21);
        let a = duplicate(&q, None, &p).unwrap();
        let b = duplicate(&q, None, &p).unwrap();
        assert_eq!(a.qubo, b.qubo);
        assert_eq!(a.provenance, b.provenance);
    }
}
