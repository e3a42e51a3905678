//! Regions: cells of a partition of one sort's representatives.
//!
//! Each region tracks, for every representative it holds, which other representatives it is
//! disequal to, split by whether the other endpoint sits in the same region (internal) or not
//! (external). A region also grows a "test clique", a set of representatives that is believed to
//! be pairwise disequal, together with the equalities ("splits") that would have to be refuted
//! for the test clique to actually be a clique.

mod diseq;

pub use diseq::{DiseqKind, DisequalityList, RegionNodeInfo};

use crate::{
    context::{CdSet, CdValue, Level},
    host::Effort,
    ids::TermId,
    options::Configuration,
};
use std::{cmp::Reverse, collections::BTreeMap, fmt::Write as _};

pub(crate) fn split_key(a: TermId, b: TermId) -> (TermId, TermId) {
    (a.min(b), a.max(b))
}

#[derive(Clone, Debug)]
pub struct Region {
    /// Slots are never removed, only invalidated.
    nodes: BTreeMap<TermId, RegionNodeInfo>,
    valid: CdValue<bool>,
    reps_size: CdValue<usize>,
    /// Indexed by `DiseqKind`, counts directed edges.
    total_diseq: [CdValue<usize>; 2],
    test_clique: CdSet<TermId>,
    splits: CdSet<(TermId, TermId)>,
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

impl Region {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            valid: CdValue::new(true),
            reps_size: CdValue::new(0),
            total_diseq: [CdValue::new(0), CdValue::new(0)],
            test_clique: CdSet::new(),
            splits: CdSet::new(),
        }
    }

    pub fn valid(&self) -> bool {
        self.valid.get()
    }
    pub(crate) fn set_valid(&mut self, level: Level, valid: bool) {
        self.valid.set(level, valid);
    }
    pub fn num_reps(&self) -> usize {
        self.reps_size.get()
    }
    pub fn total_disequalities(&self, kind: DiseqKind) -> usize {
        self.total_diseq[kind as usize].get()
    }
    pub fn has_rep(&self, n: TermId) -> bool {
        self.nodes.get(&n).is_some_and(RegionNodeInfo::valid)
    }
    pub fn node(&self, n: TermId) -> Option<&RegionNodeInfo> {
        self.nodes.get(&n)
    }
    /// Valid representatives in term order.
    pub fn reps(&self) -> impl Iterator<Item = TermId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, info)| info.valid())
            .map(|(&n, _)| n)
    }
    pub fn test_clique(&self) -> impl Iterator<Item = TermId> + '_ {
        self.test_clique.iter().copied()
    }
    pub fn has_splits(&self) -> bool {
        !self.splits.is_empty()
    }
    pub fn splits(&self) -> impl Iterator<Item = (TermId, TermId)> + '_ {
        self.splits.iter().copied()
    }

    fn node_mut(&mut self, n: TermId) -> &mut RegionNodeInfo {
        self.nodes
            .get_mut(&n)
            .unwrap_or_else(|| panic!("{n} has no slot in this region"))
    }

    pub fn add_rep(&mut self, level: Level, n: TermId) {
        self.set_rep(level, n, true);
    }

    pub fn set_rep(&mut self, level: Level, n: TermId, valid: bool) {
        assert_ne!(self.has_rep(n), valid, "{n} already has validity {valid}");
        self.nodes.entry(n).or_insert_with(RegionNodeInfo::new);
        self.node_mut(n).set_valid(level, valid);
        let reps = self.num_reps();
        self.reps_size
            .set(level, if valid { reps + 1 } else { reps - 1 });

        if self.test_clique.remove(level, &n) {
            let stale: Vec<_> = self
                .splits
                .iter()
                .filter(|(a, b)| *a == n || *b == n)
                .copied()
                .collect();
            for split in stale {
                self.splits.remove(level, &split);
            }
        }
    }

    pub fn is_disequal(&self, n1: TermId, n2: TermId, kind: DiseqKind) -> bool {
        self.nodes
            .get(&n1)
            .is_some_and(|info| info.list(kind).contains(n2))
    }

    /// Directed: callers assert both directions.
    pub fn set_disequal(
        &mut self,
        level: Level,
        n1: TermId,
        n2: TermId,
        kind: DiseqKind,
        valid: bool,
    ) {
        if !self.node_mut(n1).list_mut(kind).set_disequal(level, n2, valid) {
            return;
        }
        let total = &mut self.total_diseq[kind as usize];
        let count = total.get();
        total.set(level, if valid { count + 1 } else { count - 1 });

        if kind == DiseqKind::Internal
            && valid
            && self.test_clique.contains(&n1)
            && self.test_clique.contains(&n2)
        {
            self.splits.remove(level, &split_key(n1, n2));
        }
    }

    /// Move `n` from `from` into this region.
    pub fn take_node(&mut self, level: Level, from: &mut Region, n: TermId) {
        assert!(!self.has_rep(n) && from.has_rep(n));
        self.set_rep(level, n, true);
        for kind in DiseqKind::ALL {
            let others: Vec<TermId> = from.nodes[&n].list(kind).iter().collect();
            for m in others {
                from.set_disequal(level, n, m, kind, false);
                match kind {
                    DiseqKind::External if self.has_rep(m) => {
                        self.set_disequal(level, m, n, DiseqKind::External, false);
                        self.set_disequal(level, m, n, DiseqKind::Internal, true);
                        self.set_disequal(level, n, m, DiseqKind::Internal, true);
                    }
                    DiseqKind::External => {
                        self.set_disequal(level, n, m, DiseqKind::External, true);
                    }
                    DiseqKind::Internal => {
                        from.set_disequal(level, m, n, DiseqKind::Internal, false);
                        from.set_disequal(level, m, n, DiseqKind::External, true);
                        self.set_disequal(level, n, m, DiseqKind::External, true);
                    }
                }
            }
        }
        from.set_rep(level, n, false);
    }

    /// Absorb every representative of `other`, then invalidate it.
    pub fn combine(&mut self, level: Level, other: &mut Region) {
        let reps: Vec<TermId> = other.reps().collect();
        for &n in &reps {
            self.set_rep(level, n, true);
        }
        for &n in &reps {
            for kind in DiseqKind::ALL {
                for m in other.nodes[&n].list(kind).iter() {
                    if kind == DiseqKind::External && self.has_rep(m) {
                        self.set_disequal(level, m, n, DiseqKind::External, false);
                        self.set_disequal(level, m, n, DiseqKind::Internal, true);
                        self.set_disequal(level, n, m, DiseqKind::Internal, true);
                    } else {
                        self.set_disequal(level, n, m, kind, true);
                    }
                }
            }
        }
        other.set_valid(level, false);
    }

    /// Cheap test for whether some `cardinality + 1` representatives could be pairwise
    /// disequal across region boundaries.
    pub fn get_must_combine(&self, cardinality: u32, regions: bool) -> bool {
        let card = cardinality as usize;
        if !regions || self.total_disequalities(DiseqKind::External) < card {
            return false;
        }
        let mut degrees = Vec::new();
        for info in self.nodes.values().filter(|info| info.valid()) {
            if info.num_disequalities() < card {
                continue;
            }
            let out = info.num_external();
            if out >= card {
                return true;
            }
            if out >= 1 {
                degrees.push(out);
                if degrees.len() >= card {
                    return true;
                }
            }
        }
        degrees.sort_unstable();
        let len = degrees.len();
        degrees
            .iter()
            .enumerate()
            .any(|(i, &d)| d >= (card + 1).saturating_sub(len - i))
    }

    /// Look for `cardinality + 1` pairwise disequal representatives.
    ///
    /// Grows the test clique by internal degree, highest first, ties in term order. Pairs of
    /// the test clique that are not yet known to be disequal are recorded as splits.
    pub fn check(
        &mut self,
        level: Level,
        effort: Effort,
        cardinality: u32,
        config: &Configuration,
    ) -> Option<Vec<TermId>> {
        let card = cardinality as usize;
        let reps = self.num_reps();
        if !self.valid() || reps <= card {
            return None;
        }
        if reps > 1 && self.total_disequalities(DiseqKind::Internal) == reps * (reps - 1) {
            tracing::trace!("quick clique of {reps} representatives");
            return Some(self.reps().collect());
        }
        if !(config.regions || config.eager_splits || effort == Effort::Full) {
            return None;
        }
        if self.test_clique.len() <= card {
            let mut candidates: Vec<(usize, TermId)> = self
                .nodes
                .iter()
                .filter(|&(n, info)| info.valid() && !self.test_clique.contains(n))
                .map(|(&n, info)| (info.num_internal(), n))
                .collect();
            let new_members: Vec<TermId> = if self.test_clique.len() < card {
                candidates.sort_by_key(|&(degree, _)| Reverse(degree));
                candidates.truncate(card - self.test_clique.len() + 1);
                candidates.into_iter().map(|(_, n)| n).collect()
            } else {
                let mut best: Option<(usize, TermId)> = None;
                for (degree, n) in candidates {
                    if best.is_none_or(|(d, _)| degree > d) {
                        best = Some((degree, n));
                    }
                }
                best.into_iter().map(|(_, n)| n).collect()
            };
            for (i, &a) in new_members.iter().enumerate() {
                for &b in new_members[..i].iter().chain(self.test_clique.iter()) {
                    if !self.is_disequal(a, b, DiseqKind::Internal) {
                        self.splits.insert(level, split_key(a, b));
                    }
                }
            }
            for n in new_members {
                self.test_clique.insert(level, n);
            }
        }
        if self.test_clique.len() > card && self.splits.is_empty() {
            return Some(self.test_clique().collect());
        }
        None
    }

    pub fn pop_to(&mut self, level: Level) {
        self.valid.pop_to(level);
        self.reps_size.pop_to(level);
        for total in &mut self.total_diseq {
            total.pop_to(level);
        }
        self.test_clique.pop_to(level);
        self.splits.pop_to(level);
        for info in self.nodes.values_mut() {
            info.pop_to(level);
        }
    }

    pub fn dbg_summary(&self) -> String {
        let mut out = String::new();
        let _: std::fmt::Result = writeln!(
            out,
            "reps {}, internal {}, external {}",
            self.num_reps(),
            self.total_disequalities(DiseqKind::Internal),
            self.total_disequalities(DiseqKind::External),
        );
        for n in self.reps() {
            let info = &self.nodes[&n];
            let join = |kind| {
                info.list(kind)
                    .iter()
                    .map(|m| format!(" {m}"))
                    .collect::<String>()
            };
            let _: std::fmt::Result = writeln!(
                out,
                "{n} | int{} | ext{}",
                join(DiseqKind::Internal),
                join(DiseqKind::External)
            );
        }
        if !self.test_clique.is_empty() {
            let clique: String = self.test_clique().map(|n| format!(" {n}")).collect();
            let splits: String = self.splits().map(|(a, b)| format!(" ({a} {b})")).collect();
            let _: std::fmt::Result = writeln!(out, "test clique{clique}\nsplits{splits}");
        }
        out
    }
}

#[cfg(test)]
mod tests;
