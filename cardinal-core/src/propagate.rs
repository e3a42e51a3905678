//! Optional helpers that feed the strong solver extra disequalities or ask the search to
//! separate ambiguous applications.

use crate::{
    context::{CdSet, Level},
    formula::Formula,
    host::{EqualityEngine, OutputChannel},
    ids::TermId,
    region::split_key,
};

/// Derives argument disequalities from asserted predicate applications.
///
/// If `p(s)` is false and `p(t)` is asserted true, then `s` and `t` differ in some position; if
/// only one position is undecided it must be that one.
#[derive(Debug, Default)]
pub struct DisequalityPropagator;

impl DisequalityPropagator {
    pub fn merge(&self, a: TermId, b: TermId) {
        tracing::trace!("propagator: merge {a} {b}");
    }
    pub fn assert_disequal(&self, a: TermId, b: TermId) {
        tracing::trace!("propagator: disequal {a} {b}");
    }

    /// Disequalities implied by asserting predicate application `p` with `polarity`.
    ///
    /// `are_disequal` answers disequality queries over representatives.
    pub fn assert_predicate(
        &self,
        p: TermId,
        polarity: bool,
        ee: &dyn EqualityEngine,
        are_disequal: impl Fn(TermId, TermId) -> bool,
    ) -> Vec<(TermId, TermId)> {
        tracing::trace!("propagator: predicate {p} = {polarity}");
        let Some(db) = ee.term_database() else {
            return Vec::new();
        };
        let Some((op, args)) = db.application(p) else {
            return Vec::new();
        };
        let opposite = ee.representative(db.bool_constant(!polarity));
        let mut derived = Vec::new();
        for s in db.equivalence_class(opposite) {
            let Some((s_op, s_args)) = db.application(s) else {
                continue;
            };
            if s_op != op || s_args.len() != args.len() {
                continue;
            }
            let mut unknown = None;
            for (i, (&x, &y)) in args.iter().zip(&s_args).enumerate() {
                let (rx, ry) = (ee.representative(x), ee.representative(y));
                if ee.are_disequal(x, y) || are_disequal(rx, ry) {
                    unknown = None;
                    break;
                }
                if rx != ry {
                    if unknown.is_some() {
                        unknown = None;
                        break;
                    }
                    unknown = Some(i);
                }
            }
            if let Some(i) = unknown {
                tracing::trace!("propagator: {} != {} from {p} and {s}", args[i], s_args[i]);
                derived.push((args[i], s_args[i]));
            }
        }
        derived
    }
}

/// Asks the search to tell apart applications of the same symbol whose arguments are not known
/// to differ.
#[derive(Debug, Default)]
pub struct TermDisambiguator {
    checked: CdSet<(TermId, TermId)>,
}

impl TermDisambiguator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit at most one disambiguation lemma. Returns the number of lemmas sent.
    pub fn disambiguate(
        &mut self,
        level: Level,
        ee: &dyn EqualityEngine,
        out: &mut dyn OutputChannel,
    ) -> usize {
        let Some(db) = ee.term_database() else {
            return 0;
        };
        for op in db.operators() {
            let apps = db.applications_of(op);
            if apps.len() < 2 || !Self::involves_relevant_sort(ee, apps[0]) {
                continue;
            }
            for (i, &s) in apps.iter().enumerate() {
                for &t in &apps[i + 1..] {
                    if !self.checked.insert(level, split_key(s, t)) {
                        continue;
                    }
                    if ee.are_equal(s, t) {
                        continue;
                    }
                    let (Some((_, s_args)), Some((_, t_args))) =
                        (db.application(s), db.application(t))
                    else {
                        continue;
                    };
                    if s_args.iter().zip(&t_args).any(|(&x, &y)| ee.are_disequal(x, y)) {
                        continue;
                    }
                    let mut disjuncts = vec![Formula::eq(s, t)];
                    disjuncts.extend(
                        s_args
                            .iter()
                            .zip(&t_args)
                            .map(|(&x, &y)| Formula::neq(x, y)),
                    );
                    let lemma = Formula::or(disjuncts);
                    tracing::debug!("disambiguate {lemma}");
                    out.lemma(lemma);
                    return 1;
                }
            }
        }
        0
    }

    fn involves_relevant_sort(ee: &dyn EqualityEngine, t: TermId) -> bool {
        ee.term_database()
            .and_then(|db| db.application(t))
            .is_some_and(|(_, args)| args.iter().any(|&a| ee.is_uninterpreted(ee.sort_of(a))))
    }

    pub fn pop_to(&mut self, level: Level) {
        self.checked.pop_to(level);
    }
}
