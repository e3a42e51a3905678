//! Cardinality reasoning for a single uninterpreted sort.
//!
//! A `SortModel` keeps every representative of its sort in exactly one valid region. Merges and
//! disequalities reported by the equality engine move representatives between regions and
//! update the disequality graph. Checks look for cliques larger than the asserted cardinality
//! and otherwise ask the search to split on equalities or combine regions until one region is
//! left.

mod cardinality;
mod clique;


use crate::{
    context::{CdMap, CdValue, CdVec, Level},
    formula::Formula,
    host::{Effort, EqualityEngine, OutputChannel},
    ids::{RegionId, SortId, TermId},
    options::Configuration,
    propagate::DisequalityPropagator,
    region::{DiseqKind, Region},
    stats::Statistics,
    typed_vec::TVec,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write as _,
};

/// Everything a sort model talks to while handling one event.
pub struct Env<'a> {
    pub ee: &'a mut dyn EqualityEngine,
    pub out: &'a mut dyn OutputChannel,
    pub stats: &'a mut Statistics,
    pub propagator: Option<&'a DisequalityPropagator>,
}
impl<'a> Env<'a> {
    pub fn new(
        ee: &'a mut dyn EqualityEngine,
        out: &'a mut dyn OutputChannel,
        stats: &'a mut Statistics,
    ) -> Self {
        Self {
            ee,
            out,
            stats,
            propagator: None,
        }
    }
}

/// Where a registered term lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slot {
    Region(RegionId),
    /// Totality mode: still needs totality axioms.
    Pending,
    /// No longer a representative.
    Retired,
}

pub struct SortModel {
    sort: SortId,
    /// Term used for the cardinality literal and as the first totality witness.
    card_term: TermId,
    config: Configuration,
    level: Level,

    regions: TVec<RegionId, Region>,
    /// Regions at or above this index are unused.
    regions_index: CdValue<usize>,
    slots: CdMap<TermId, Slot>,
    split_scores: CdMap<TermId, u32>,
    /// `(lhs, rhs, reason)` for every disequality in force.
    disequalities: CdVec<(TermId, TermId, Formula)>,
    reps: CdValue<usize>,
    conflict: CdValue<bool>,

    cardinality: CdValue<u32>,
    has_card: CdValue<bool>,
    allocated: u32,
    card_literals: BTreeMap<u32, Formula>,
    card_assertions: CdMap<u32, bool>,
    totality_terms: Vec<TermId>,
    totality_sent: BTreeSet<(TermId, u32)>,
}

impl SortModel {
    /// Call [`SortModel::initialize`] before anything else.
    pub fn new(sort: SortId, card_term: TermId, config: Configuration, level: Level) -> Self {
        Self {
            sort,
            card_term,
            config,
            level,
            regions: TVec::new(),
            regions_index: CdValue::new(0),
            slots: CdMap::new(),
            split_scores: CdMap::new(),
            disequalities: CdVec::new(),
            reps: CdValue::new(0),
            conflict: CdValue::new(false),
            cardinality: CdValue::new(1),
            has_card: CdValue::new(false),
            allocated: 0,
            card_literals: BTreeMap::new(),
            card_assertions: CdMap::new(),
            totality_terms: Vec::new(),
            totality_sent: BTreeSet::new(),
        }
    }

    pub fn sort(&self) -> SortId {
        self.sort
    }
    pub fn card_term(&self) -> TermId {
        self.card_term
    }
    pub fn level(&self) -> Level {
        self.level
    }
    pub fn is_conflict(&self) -> bool {
        self.conflict.get()
    }
    /// Number of representatives.
    pub fn num_reps(&self) -> usize {
        self.reps.get()
    }
    pub fn num_regions(&self) -> usize {
        self.valid_regions().count()
    }
    pub fn valid_regions(&self) -> impl Iterator<Item = (RegionId, &Region)> + '_ {
        self.regions
            .iter_enumerate()
            .take(self.regions_index.get())
            .filter(|(_, region)| region.valid())
    }
    pub fn region_of_term(&self, n: TermId) -> Option<RegionId> {
        match self.slots.get(&n) {
            Some(Slot::Region(ri)) => Some(*ri),
            _ => None,
        }
    }
    pub fn region(&self, ri: RegionId) -> &Region {
        &self.regions[ri]
    }

    pub fn push(&mut self) {
        self.level += 1;
    }
    pub fn pop_to(&mut self, level: Level) {
        debug_assert!(level <= self.level);
        self.level = level;
        for region in self.regions.iter_mut() {
            region.pop_to(level);
        }
        self.regions_index.pop_to(level);
        self.slots.pop_to(level);
        self.split_scores.pop_to(level);
        self.disequalities.pop_to(level);
        self.reps.pop_to(level);
        self.conflict.pop_to(level);
        self.cardinality.pop_to(level);
        self.has_card.pop_to(level);
        self.card_assertions.pop_to(level);
    }

    fn region_index(&self, n: TermId) -> RegionId {
        match self.slots.get(&n) {
            Some(Slot::Region(ri)) => *ri,
            other => panic!("{n} of sort {} has no region ({other:?})", self.sort),
        }
    }
    fn is_valid(&self, ri: RegionId) -> bool {
        usize::from(ri) < self.regions_index.get() && self.regions[ri].valid()
    }

    /// Register a fresh equivalence class.
    pub fn new_eq_class(&mut self, n: TermId, env: &mut Env<'_>) {
        if self.conflict.get() || self.slots.contains_key(&n) {
            return;
        }
        if !self.config.totality_lazy {
            let ks: Vec<u32> = self.card_literals.keys().copied().collect();
            for k in ks {
                if self.config.apply_totality(k) {
                    self.add_totality_axiom(n, k, env);
                }
            }
        }
        if self.config.totality {
            let slot = if self.totality_terms.contains(&n) {
                Slot::Retired
            } else {
                Slot::Pending
            };
            self.slots.insert(self.level, n, slot);
        } else {
            if !self.config.regions {
                self.regions_index.set(self.level, 0);
            }
            let index = self.regions_index.get();
            let ri = RegionId(index);
            self.slots.insert(self.level, n, Slot::Region(ri));
            if self.config.smart_splits {
                self.set_split_score(n, 0, &*env.ee);
            }
            if index < self.regions.len() {
                debug_assert!(!self.config.regions || self.regions[ri].num_reps() == 0);
                self.regions[ri].set_valid(self.level, true);
            } else {
                let pushed = self.regions.push(Region::new());
                debug_assert_eq!(pushed, ri);
            }
            self.regions[ri].add_rep(self.level, n);
            self.regions_index.set(self.level, index + 1);
        }
        self.reps.set(self.level, self.reps.get() + 1);
        tracing::trace!("new class {n} in sort {}, {} reps", self.sort, self.reps.get());
    }

    fn set_split_score(&mut self, n: TermId, score: u32, ee: &dyn EqualityEngine) {
        if self.split_scores.get(&n).is_some_and(|&old| old <= score) {
            return;
        }
        self.split_scores.insert(self.level, n, score);
        let Some((_, args)) = ee.term_database().and_then(|db| db.application(n)) else {
            return;
        };
        for arg in args {
            self.set_split_score(arg, score + 1, ee);
        }
    }

    /// `b` was merged into `a`, both representatives.
    pub fn merge(&mut self, a: TermId, b: TermId, env: &mut Env<'_>) {
        if self.conflict.get() || a == b {
            return;
        }
        tracing::trace!("merge {a} <- {b} in sort {}", self.sort);
        if self.config.totality {
            if self.slots.get(&b) == Some(&Slot::Retired) {
                self.slots.insert(self.level, a, Slot::Retired);
            }
            self.slots.insert(self.level, b, Slot::Retired);
        } else {
            let ai = self.region_index(a);
            let bi = self.region_index(b);
            if ai == bi {
                self.set_equal(ai, a, b, env);
                self.check_region(ai, true, env);
            } else if self.regions[ai].num_reps() == 1 {
                let ri = self.combine_regions(bi, ai);
                self.set_equal(ri, a, b, env);
                self.check_region(ri, true, env);
            } else if self.regions[bi].num_reps() == 1 {
                let ri = self.combine_regions(ai, bi);
                self.set_equal(ri, a, b, env);
                self.check_region(ri, true, env);
            } else {
                let cost = |n: TermId, ni: RegionId, other: RegionId| {
                    let internal = self.regions[ni].node(n).map_or(0, |info| info.num_internal());
                    internal as i64 - self.disequalities_to_region(n, other) as i64
                };
                let aex = cost(a, ai, bi);
                let bex = cost(b, bi, ai);
                if aex < bex {
                    self.move_node(a, bi);
                    self.set_equal(bi, a, b, env);
                } else {
                    self.move_node(b, ai);
                    self.set_equal(ai, a, b, env);
                }
                self.check_region(ai, true, env);
                self.check_region(bi, true, env);
            }
            self.slots.insert(self.level, b, Slot::Retired);
        }
        self.reps.set(self.level, self.reps.get() - 1);
    }

    /// Merge `b` into `a` inside region `ri`, moving `b`'s disequalities onto `a`.
    fn set_equal(&mut self, ri: RegionId, a: TermId, b: TermId, env: &Env<'_>) {
        debug_assert!(self.regions[ri].has_rep(a) && self.regions[ri].has_rep(b));
        for kind in DiseqKind::ALL {
            let others: Vec<TermId> = self.regions[ri]
                .node(b)
                .map(|info| info.list(kind).iter().collect())
                .unwrap_or_default();
            for n in others {
                debug_assert_ne!(n, a, "merging disequal terms {a} and {b}");
                let ni = self.region_index(n);
                if !self.regions[ri].is_disequal(a, n, kind) {
                    self.regions[ri].set_disequal(self.level, a, n, kind, true);
                    self.regions[ni].set_disequal(self.level, n, a, kind, true);
                    if let Some(propagator) = env.propagator {
                        propagator.assert_disequal(a, n);
                    }
                }
                self.regions[ri].set_disequal(self.level, b, n, kind, false);
                self.regions[ni].set_disequal(self.level, n, b, kind, false);
            }
        }
        self.regions[ri].set_rep(self.level, b, false);
    }

    /// Record `a != b`. `reason` is the literal that established it.
    pub fn assert_disequal(&mut self, a: TermId, b: TermId, reason: Formula, env: &mut Env<'_>) {
        if self.conflict.get() || self.config.totality {
            return;
        }
        let (ra, rb) = (env.ee.representative(a), env.ee.representative(b));
        debug_assert_ne!(ra, rb, "{a} != {b} within one class");
        if ra == rb || self.are_disequal(ra, rb) {
            return;
        }
        tracing::trace!("disequal {ra} {rb} in sort {}", self.sort);
        self.disequalities.push(self.level, (a, b, reason));
        let ai = self.region_index(ra);
        let bi = self.region_index(rb);
        let kind = DiseqKind::of(ai == bi);
        self.regions[ai].set_disequal(self.level, ra, rb, kind, true);
        self.regions[bi].set_disequal(self.level, rb, ra, kind, true);
        if ai == bi {
            self.check_region(ai, false, env);
        } else {
            self.check_region(ai, true, env);
            self.check_region(bi, true, env);
        }
    }

    /// Whether the regions record `a != b`, both representatives.
    pub fn are_disequal(&self, a: TermId, b: TermId) -> bool {
        if a == b {
            return false;
        }
        match (self.region_of_term(a), self.region_of_term(b)) {
            (Some(ai), Some(bi)) => self.regions[ai].is_disequal(a, b, DiseqKind::of(ai == bi)),
            _ => false,
        }
    }

    fn disequalities_to_region(&self, n: TermId, ri: RegionId) -> usize {
        let ni = self.region_index(n);
        self.regions[ni].node(n).map_or(0, |info| {
            info.list(DiseqKind::External)
                .iter()
                .filter(|&m| self.region_of_term(m) == Some(ri))
                .count()
        })
    }

    /// Number of external disequality edges from `ri` to every other region.
    fn disequalities_to_regions(&self, ri: RegionId) -> BTreeMap<RegionId, usize> {
        let mut counts = BTreeMap::new();
        let region = &self.regions[ri];
        for n in region.reps() {
            let Some(info) = region.node(n) else {
                continue;
            };
            for m in info.list(DiseqKind::External).iter() {
                *counts.entry(self.region_index(m)).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Combine `bi` into `ai`.
    fn combine_regions(&mut self, ai: RegionId, bi: RegionId) -> RegionId {
        debug_assert!(self.is_valid(ai) && self.is_valid(bi));
        tracing::trace!("combine {bi} into {ai} in sort {}", self.sort);
        let moved: Vec<TermId> = self.regions[bi].reps().collect();
        for n in moved {
            self.slots.insert(self.level, n, Slot::Region(ai));
        }
        let (a, b) = self.regions.pair_mut(ai, bi);
        a.combine(self.level, b);
        ai
    }

    fn move_node(&mut self, n: TermId, ri: RegionId) {
        let from = self.region_index(n);
        let (to, src) = self.regions.pair_mut(ri, from);
        to.take_node(self.level, src, n);
        self.slots.insert(self.level, n, Slot::Region(ri));
    }

    /// Combine `ri` with another valid region, the densest one if `use_density`.
    fn force_combine_region(&mut self, ri: RegionId, use_density: bool) -> Option<RegionId> {
        let other = if use_density {
            let mut best: Option<(RegionId, usize, usize)> = None;
            for (rj, count) in self.disequalities_to_regions(ri) {
                if rj == ri || !self.is_valid(rj) {
                    continue;
                }
                let reps = self.regions[rj].num_reps();
                // count / reps > best_count / best_reps
                if best.is_none_or(|(_, c, r)| count * r > c * reps) {
                    best = Some((rj, count, reps));
                }
            }
            best.map(|(rj, _, _)| rj)
        } else {
            self.regions
                .ids_below(self.regions_index.get())
                .find(|&rj| rj != ri && self.regions[rj].valid())
        };
        Some(self.combine_regions(ri, other?))
    }

    fn check_region(&mut self, ri: RegionId, check_combine: bool, env: &mut Env<'_>) {
        if self.conflict.get() || !self.has_card.get() || !self.is_valid(ri) {
            return;
        }
        let card = self.cardinality.get();
        if check_combine && self.regions[ri].get_must_combine(card, self.config.regions) {
            if let Some(combined) = self.force_combine_region(ri, true) {
                self.check_region(combined, check_combine, env);
                return;
            }
        }
        if let Some(clique) = self.regions[ri].check(self.level, Effort::Standard, card, &self.config)
        {
            if self.config.minimal_model {
                self.add_clique_lemma(clique, env);
            }
        }
    }

    /// Decide whether the current partition fits the asserted cardinality.
    pub fn check(&mut self, effort: Effort, env: &mut Env<'_>) {
        while self.check_round(effort, env) {}
    }

    /// Returns true if regions were combined and the check must run again.
    fn check_round(&mut self, effort: Effort, env: &mut Env<'_>) -> bool {
        if !self.has_card.get() || self.conflict.get() {
            return false;
        }
        let card = self.cardinality.get();
        if self.num_reps() <= card as usize {
            if effort == Effort::Full {
                tracing::debug!(
                    "sort {} fits cardinality {card} with {} reps",
                    self.sort,
                    self.num_reps()
                );
            }
            return false;
        }
        if !self.config.totality {
            for ri in self.regions.ids_below(self.regions_index.get()) {
                if !self.regions[ri].valid() {
                    continue;
                }
                let clique = self.regions[ri].check(self.level, effort, card, &self.config);
                if let Some(clique) = clique {
                    if self.config.minimal_model {
                        self.add_clique_lemma(clique, env);
                        return false;
                    }
                }
            }
        }
        if self.config.apply_totality(card) {
            if self.config.totality_lazy && effort == Effort::Full {
                let pending: Vec<TermId> = self
                    .slots
                    .iter()
                    .filter(|&(_, slot)| !self.config.totality || *slot != Slot::Retired)
                    .map(|(&n, _)| n)
                    .collect();
                for n in pending {
                    self.add_totality_axiom(n, card, env);
                }
            }
            return false;
        }

        let mut added = false;
        if effort == Effort::Full || self.config.eager_splits {
            for ri in self.regions.ids_below(self.regions_index.get()) {
                if self.regions[ri].valid()
                    && self.regions[ri].num_reps() > card as usize
                    && self.add_split(ri, env)
                {
                    added = true;
                }
            }
        }
        if effort != Effort::Full || added {
            return false;
        }
        if self.config.sort_inference && self.combine_same_inferred_sort(&*env.ee) {
            return true;
        }
        let first = self
            .regions
            .ids_below(self.regions_index.get())
            .find(|&ri| self.regions[ri].valid());
        first.is_some_and(|ri| self.force_combine_region(ri, false).is_some())
    }

    fn combine_same_inferred_sort(&mut self, ee: &dyn EqualityEngine) -> bool {
        let mut seen: BTreeMap<u32, RegionId> = BTreeMap::new();
        for ri in self.regions.ids_below(self.regions_index.get()) {
            if !self.regions[ri].valid() {
                continue;
            }
            let Some(id) = self.regions[ri].reps().next().and_then(|n| ee.inferred_sort(n)) else {
                continue;
            };
            if let Some(&first) = seen.get(&id) {
                let _: RegionId = self.combine_regions(first, ri);
                return true;
            }
            seen.insert(id, ri);
        }
        false
    }

    /// Combine every region into one, proposing splits on the way.
    ///
    /// Returns false if a split was needed.
    pub fn minimize(&mut self, env: &mut Env<'_>) -> bool {
        if self.config.totality || self.num_regions() <= 1 {
            return true;
        }
        let mut target: Option<RegionId> = None;
        for ri in self.regions.ids_below(self.regions_index.get()) {
            if !self.regions[ri].valid() {
                continue;
            }
            let Some(target) = target else {
                target = Some(ri);
                continue;
            };
            let _: RegionId = self.combine_regions(target, ri);
            if self.add_split(target, env) {
                tracing::debug!("minimize: combined regions, found split");
                return false;
            }
        }
        debug_assert_eq!(self.num_regions(), 1);
        true
    }

    /// Representatives of the sort, which must be in a single region.
    pub fn representatives(&self) -> Vec<TermId> {
        if self.config.totality {
            return self
                .slots
                .iter()
                .filter(|&(_, slot)| *slot == Slot::Pending)
                .map(|(&n, _)| n)
                .collect();
        }
        debug_assert!(self.num_regions() <= 1, "representatives before minimize");
        self.valid_regions()
            .flat_map(|(_, region)| region.reps())
            .collect()
    }

    /// Check that the valid regions partition the representatives and that disequality
    /// edges are mirrored.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.config.totality {
            return Ok(());
        }
        let mut seen = BTreeSet::new();
        let mut total = 0;
        for (ri, region) in self.valid_regions() {
            total += region.num_reps();
            let mut counted = [0; 2];
            for n in region.reps() {
                if !seen.insert(n) {
                    return Err(format!("{n} in two valid regions"));
                }
                if self.region_of_term(n) != Some(ri) {
                    return Err(format!("{n} is in {ri} but mapped elsewhere"));
                }
                let Some(info) = region.node(n) else {
                    return Err(format!("{n} has no slot in {ri}"));
                };
                for kind in DiseqKind::ALL {
                    counted[kind as usize] += info.list(kind).len();
                    for m in info.list(kind).iter() {
                        let Some(mi) = self.region_of_term(m) else {
                            return Err(format!("{n} != {m} but {m} has no region"));
                        };
                        if DiseqKind::of(mi == ri) != kind {
                            return Err(format!("{n} != {m} recorded as {kind:?}"));
                        }
                        if !self.regions[mi].has_rep(m) || !self.regions[mi].is_disequal(m, n, kind)
                        {
                            return Err(format!("{n} != {m} is not mirrored"));
                        }
                    }
                }
            }
            for kind in DiseqKind::ALL {
                if counted[kind as usize] != region.total_disequalities(kind) {
                    return Err(format!("{ri} {kind:?} counter is off"));
                }
            }
        }
        if total != self.num_reps() {
            return Err(format!("{total} reps in regions, {} expected", self.num_reps()));
        }
        Ok(())
    }

    pub fn dbg_summary(&self) -> String {
        let mut out = String::new();
        let card = if self.has_card.get() {
            self.cardinality.get().to_string()
        } else {
            "none".to_string()
        };
        let _: std::fmt::Result = writeln!(
            out,
            "sort {}: {} reps, cardinality {card}, allocated {}",
            self.sort,
            self.num_reps(),
            self.allocated
        );
        for (ri, region) in self.valid_regions() {
            let _: std::fmt::Result = write!(out, "{ri}: {}", region.dbg_summary());
        }
        out
    }
}
