//! Constraint addition: inject one-hot penalty groups satisfied by a known
//! solution.
//!
//! A group `G` of `m` bits gets `P * (sum(G) - 1)^2 - P`, i.e. `-P` on every
//! member's diagonal and `+2P` on every pair inside `G`, plus `P` on the
//! offset. With `s` bits of the group set the injected energy is
//! `P * s * (s - 2) + P`, which is zero exactly when `s == 1`. Each group is
//! built from one 1-valued anchor and `m - 1` 0-valued bits of the known
//! solution, so the solution's energy is unchanged.

use std::collections::BTreeSet;

use log::{debug, warn};
use num_bigint::BigInt;
use num_traits::Signed;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::provenance::{Provenance, Transformed};
use crate::qubo::Qubo;
use crate::record::int_value;
use crate::select::{permutation, seeded};
use crate::solution::Solution;

#[derive(Debug, Clone)]
pub struct ConstrainParams {
    /// Number of groups to inject.
    pub count: usize,
    /// Bits per group.
    pub size: usize,
    pub penalty: BigInt,
    pub seed: u64,
}

impl Default for ConstrainParams {
    fn default() -> Self {
        Self {
            count: 1,
            size: 2,
            penalty: BigInt::from(1),
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConstrainProvenance {
    /// Injected groups, anchor first.
    pub groups: Vec<Vec<usize>>,
    pub penalty: BigInt,
}

impl Provenance for ConstrainProvenance {
    fn operation(&self) -> &'static str {
        "constraint addition"
    }

    fn offset_delta(&self) -> BigInt {
        &self.penalty * BigInt::from(self.groups.len())
    }

    fn write_fields(&self, fields: &mut Map<String, Value>) {
        fields.insert("constraints".into(), Value::from(self.groups.clone()));
        fields.insert("penalty".into(), int_value(&self.penalty));
        fields.insert("offset delta".into(), int_value(&self.offset_delta()));
    }
}

pub fn constrain(qubo: &Qubo, solution: &Solution, params: &ConstrainParams) -> Result<Transformed<ConstrainProvenance>> {
    let nbit = qubo.nbit();
    solution.check(nbit)?;
    if !params.penalty.is_positive() {
        return Err(Error::invalid(format!("penalty must be positive, got {}", params.penalty)));
    }
    if params.size == 0 {
        return Err(Error::invalid("constraint size must be at least 1"));
    }

    // Free bits of each value, in one random order.
    let excluded: BTreeSet<usize> = solution.selected.iter().copied().collect();
    let mut rng = seeded(params.seed);
    let order = permutation(&mut rng, nbit);
    let pool = |value: u8| -> Vec<usize> {
        order
            .iter()
            .copied()
            .filter(|i| !excluded.contains(i) && solution.bits[*i] == value)
            .collect()
    };
    let ones = pool(1);
    let zeros = pool(0);

    let fill = params.size - 1;
    let mut groups = Vec::with_capacity(params.count);
    let (mut o, mut z) = (0, 0);
    while groups.len() < params.count {
        if o >= ones.len() || zeros.len() - z < fill {
            warn!(
                "Stopping after {} of {} constraints: not enough free bits left",
                groups.len(),
                params.count
            );
            break;
        }
        let mut group = vec![ones[o]];
        group.extend_from_slice(&zeros[z..z + fill]);
        o += 1;
        z += fill;
        groups.push(group);
    }

    let mut q = qubo.clone();
    let p = &params.penalty;
    let two_p = BigInt::from(2) * p;
    for group in &groups {
        for (k, &a) in group.iter().enumerate() {
            q.accumulate(a, a, -p);
            for &b in &group[k + 1..] {
                q.accumulate(a, b, two_p.clone());
            }
        }
        q.add_offset(p);
    }
    debug!("added {} constraints of size {} with penalty {}", groups.len(), params.size, p);

    let mut s = solution.clone();
    s.selected = s
        .selected
        .iter()
        .copied()
        .chain(groups.iter().flatten().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    s.offset = Some(q.offset().clone());

    Ok(Transformed {
        qubo: q,
        solution: Some(s),
        provenance: ConstrainProvenance {
            groups,
            penalty: p.clone(),
        },
    })
}
