use super::{Env, SortModel};
use crate::{
    formula::Formula,
    ids::{RegionId, TermId},
    region::{DiseqKind, split_key},
};
use std::collections::{BTreeMap, BTreeSet};

impl SortModel {
    /// Propose one equality split for region `ri`. Returns true if one was sent.
    pub(super) fn add_split(&mut self, ri: RegionId, env: &mut Env<'_>) -> bool {
        let region = &self.regions[ri];
        let split = if region.has_splits() {
            if self.config.smart_splits {
                let score = |n: TermId| self.split_scores.get(&n).copied().unwrap_or(0);
                let mut best: Option<(u32, (TermId, TermId))> = None;
                for (a, b) in region.splits() {
                    let s = score(a).min(score(b));
                    if best.is_none_or(|(best_score, _)| s > best_score) {
                        best = Some((s, (a, b)));
                    }
                }
                best.map(|(_, split)| split)
            } else {
                region.splits().next()
            }
        } else if !self.config.minimal_model {
            // No clique gets reported, so look for an undecided pair directly.
            let reps: Vec<TermId> = region.reps().collect();
            reps.iter()
                .enumerate()
                .flat_map(|(i, &a)| reps[i + 1..].iter().map(move |&b| (a, b)))
                .find(|&(a, b)| !region.is_disequal(a, b, DiseqKind::Internal))
        } else {
            None
        };
        let Some((a, b)) = split else {
            return false;
        };
        let literal = Formula::eq(a, b);
        tracing::debug!("split {literal} in {ri} of sort {}", self.sort);
        env.out.propose_split(literal, true);
        env.stats.split_lemmas += 1;
        true
    }

    /// Report that `clique` is too large for the current cardinality.
    pub(super) fn add_clique_lemma(&mut self, mut clique: Vec<TermId>, env: &mut Env<'_>) {
        let card = self.cardinality.get();
        clique.truncate(card as usize + 1);
        debug_assert_eq!(clique.len(), card as usize + 1);
        tracing::debug!("clique {clique:?} exceeds cardinality {card} of sort {}", self.sort);
        let card_literal = self.card_literals[&card].clone();

        if self.config.explain_cliques() {
            if let Some(conflict) = self.explain_clique(&clique, env) {
                if conflict.is_sat_conflict {
                    let mut literals = conflict.literals;
                    literals.push(card_literal);
                    env.out.conflict(Formula::and(literals));
                    self.conflict.set(self.level, true);
                    env.stats.clique_conflicts += 1;
                } else {
                    env.out.lemma(Formula::implies(
                        Formula::and(conflict.literals),
                        card_literal.negate(),
                    ));
                    env.stats.clique_lemmas += 1;
                }
                return;
            }
            tracing::debug!("clique reasons incomplete, sending plain clique lemma");
        }

        let mut disjuncts = Vec::new();
        for (i, &a) in clique.iter().enumerate() {
            for &b in &clique[..i] {
                disjuncts.push(Formula::eq(a, b));
            }
        }
        disjuncts.push(card_literal.negate());
        env.out.lemma(Formula::or(disjuncts));
        env.stats.clique_lemmas += 1;
    }

    /// Collect one recorded disequality per pair of clique members.
    ///
    /// With explained cliques the original reasons are used and equality chains connect the
    /// asserted terms to the representatives. Otherwise every representative is named by the
    /// first asserted term seen for it. Disequalities between exactly those terms keep their reason,
    /// the others become literals that were never asserted.
    fn explain_clique(&self, clique: &[TermId], env: &Env<'_>) -> Option<CliqueExplanation> {
        let needed = clique.len() * (clique.len() - 1) / 2;
        let members: BTreeSet<TermId> = clique.iter().copied().collect();
        let mut explained = BTreeSet::new();
        let mut literals = Vec::new();
        let mut within_rep: BTreeMap<TermId, Vec<TermId>> = BTreeMap::new();
        let mut named: BTreeMap<TermId, TermId> = BTreeMap::new();
        let mut is_sat_conflict = true;

        for (lhs, rhs, reason) in self.disequalities.iter() {
            if literals.len() == needed {
                break;
            }
            let r1 = env.ee.representative(*lhs);
            let r2 = env.ee.representative(*rhs);
            if r1 == r2 || !members.contains(&r1) || !members.contains(&r2) {
                continue;
            }
            if !explained.insert(split_key(r1, r2)) {
                continue;
            }
            if self.config.explained_cliques {
                literals.push(reason.clone());
                for (rep, term) in [(r1, *lhs), (r2, *rhs)] {
                    let terms = within_rep.entry(rep).or_default();
                    if !terms.contains(&term) {
                        terms.push(term);
                    }
                }
            } else {
                let u1 = *named.entry(r1).or_insert(*lhs);
                let u2 = *named.entry(r2).or_insert(*rhs);
                if u1 == *lhs && u2 == *rhs {
                    literals.push(reason.clone());
                } else {
                    is_sat_conflict = false;
                    literals.push(Formula::neq(u1, u2));
                }
            }
        }
        if literals.len() < needed {
            return None;
        }
        for terms in within_rep.values() {
            for &term in &terms[1..] {
                for literal in env.ee.explain_equality(terms[0], term) {
                    if !literals.contains(&literal) {
                        literals.push(literal);
                    }
                }
            }
        }
        Some(CliqueExplanation {
            literals,
            is_sat_conflict,
        })
    }
}

struct CliqueExplanation {
    literals: Vec<Formula>,
    /// Every literal was asserted as is.
    is_sat_conflict: bool,
}
