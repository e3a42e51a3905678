//! The strong solver: one [`SortModel`] per uninterpreted sort, fed by the equality engine and
//! driven by the search.

use crate::{
    context::{CdValue, Level},
    error::{Result, SolverError},
    formula::Formula,
    host::{Effort, EqualityEngine, Notification, OutputChannel},
    ids::{SortId, TermId},
    options::Configuration,
    propagate::{DisequalityPropagator, TermDisambiguator},
    sort_model::{Env, SortModel},
    stats::Statistics,
};
use std::collections::BTreeMap;

pub struct StrongSolver {
    config: Configuration,
    level: Level,
    conflict: CdValue<bool>,
    models: BTreeMap<SortId, SortModel>,
    stats: Statistics,
    propagator: Option<DisequalityPropagator>,
    disambiguator: Option<TermDisambiguator>,
}

impl StrongSolver {
    pub fn new(config: Configuration) -> Self {
        let propagator = config
            .disequality_propagation
            .then(DisequalityPropagator::default);
        let disambiguator = config.term_disambiguation.then(TermDisambiguator::new);
        Self {
            config,
            level: 0,
            conflict: CdValue::new(false),
            models: BTreeMap::new(),
            stats: Statistics::default(),
            propagator,
            disambiguator,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }
    pub fn level(&self) -> Level {
        self.level
    }
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }
    pub fn is_conflict(&self) -> bool {
        self.conflict.get()
    }
    pub fn sort_model(&self, sort: SortId) -> Option<&SortModel> {
        self.models.get(&sort)
    }
    pub fn sort_models(&self) -> impl Iterator<Item = &SortModel> {
        self.models.values()
    }

    pub fn push(&mut self) {
        self.level += 1;
        for model in self.models.values_mut() {
            model.push();
        }
    }
    pub fn pop_to(&mut self, level: Level) {
        assert!(level <= self.level, "pop to {level} from {}", self.level);
        self.level = level;
        self.conflict.pop_to(level);
        for model in self.models.values_mut() {
            model.pop_to(level);
        }
        if let Some(disambiguator) = &mut self.disambiguator {
            disambiguator.pop_to(level);
        }
    }

    /// Start cardinality reasoning for the sort of `t` if it is uninterpreted.
    pub fn pre_register_term(
        &mut self,
        t: TermId,
        ee: &mut dyn EqualityEngine,
        out: &mut dyn OutputChannel,
    ) -> Result<()> {
        let sort = ee.sort_of(t);
        if self.models.contains_key(&sort) || !ee.is_uninterpreted(sort) {
            return Ok(());
        }
        tracing::info!("cardinality reasoning for sort {sort}, cardinality term {t}");
        let mut model = SortModel::new(sort, t, self.config.clone(), self.level);
        let mut env = Env {
            ee,
            out,
            stats: &mut self.stats,
            propagator: self.propagator.as_ref(),
        };
        model.initialize(&mut env)?;
        self.models.insert(sort, model);
        Ok(())
    }

    /// Run `f` on the model for the sort of `t`, registering the sort first if needed.
    fn with_model<R>(
        &mut self,
        t: TermId,
        ee: &mut dyn EqualityEngine,
        out: &mut dyn OutputChannel,
        f: impl FnOnce(&mut SortModel, &mut Env<'_>) -> R,
    ) -> Result<Option<R>> {
        self.pre_register_term(t, &mut *ee, &mut *out)?;
        let sort = ee.sort_of(t);
        let Self {
            models,
            stats,
            propagator,
            conflict,
            level,
            ..
        } = self;
        let Some(model) = models.get_mut(&sort) else {
            return Ok(None);
        };
        let mut env = Env {
            ee,
            out,
            stats,
            propagator: propagator.as_ref(),
        };
        let ret = f(model, &mut env);
        if model.is_conflict() {
            conflict.set(*level, true);
        }
        Ok(Some(ret))
    }

    pub fn notify_new_class(
        &mut self,
        t: TermId,
        ee: &mut dyn EqualityEngine,
        out: &mut dyn OutputChannel,
    ) -> Result<()> {
        self.with_model(t, ee, out, |model, env| model.new_eq_class(t, env))?;
        Ok(())
    }

    /// `b` was merged into `a`.
    pub fn notify_merge(
        &mut self,
        a: TermId,
        b: TermId,
        ee: &mut dyn EqualityEngine,
        out: &mut dyn OutputChannel,
    ) -> Result<()> {
        if self.conflict.get() {
            return Ok(());
        }
        self.with_model(a, ee, out, |model, env| {
            model.merge(a, b, env);
            if let Some(propagator) = env.propagator.filter(|_| !model.is_conflict()) {
                propagator.merge(a, b);
            }
        })?;
        Ok(())
    }

    pub fn notify_disequal(
        &mut self,
        a: TermId,
        b: TermId,
        reason: Formula,
        ee: &mut dyn EqualityEngine,
        out: &mut dyn OutputChannel,
    ) -> Result<()> {
        if self.conflict.get() {
            return Ok(());
        }
        self.with_model(a, ee, out, |model, env| {
            model.assert_disequal(a, b, reason, env);
        })?;
        Ok(())
    }

    /// A literal was assigned by the search.
    pub fn notify_assert(
        &mut self,
        literal: &Formula,
        is_decision: bool,
        ee: &mut dyn EqualityEngine,
        out: &mut dyn OutputChannel,
    ) -> Result<()> {
        let Some((atom, polarity)) = literal.as_literal() else {
            return Ok(());
        };
        tracing::trace!("assert {literal}, decision {is_decision}");
        match *atom {
            Formula::Card { sort, bound } => {
                let Self {
                    models,
                    stats,
                    propagator,
                    conflict,
                    level,
                    ..
                } = self;
                let model = models
                    .get_mut(&sort)
                    .ok_or(SolverError::UnknownSort(sort))?;
                let mut env = Env {
                    ee,
                    out,
                    stats,
                    propagator: propagator.as_ref(),
                };
                model.assert_cardinality(bound, polarity, &mut env)?;
                if model.is_conflict() {
                    conflict.set(*level, true);
                }
            }
            Formula::Atom(p) => {
                let Some(propagator) = &self.propagator else {
                    return Ok(());
                };
                let derived = propagator.assert_predicate(p, polarity, &*ee, |a, b| {
                    self.models
                        .get(&ee.sort_of(a))
                        .is_some_and(|model| model.are_disequal(a, b))
                });
                for (x, y) in derived {
                    self.stats.disequality_propagations += 1;
                    self.notify_disequal(x, y, Formula::neq(x, y), &mut *ee, &mut *out)?;
                    if self.conflict.get() {
                        break;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Deliver a notification through a single entry point.
    pub fn notify(
        &mut self,
        notification: Notification,
        ee: &mut dyn EqualityEngine,
        out: &mut dyn OutputChannel,
    ) -> Result<()> {
        match notification {
            Notification::NewClass(t) => self.notify_new_class(t, ee, out),
            Notification::Merge(a, b) => self.notify_merge(a, b, ee, out),
            Notification::Disequal(a, b, reason) => self.notify_disequal(a, b, reason, ee, out),
            Notification::Assert {
                literal,
                is_decision,
            } => self.notify_assert(&literal, is_decision, ee, out),
        }
    }

    pub fn check(
        &mut self,
        effort: Effort,
        ee: &mut dyn EqualityEngine,
        out: &mut dyn OutputChannel,
    ) {
        if self.conflict.get() {
            return;
        }
        crate::log_duration!("check at {:?} took {}", effort, {
            if effort != Effort::Full || !self.disambiguate(&*ee, &mut *out) {
                self.check_sorts(effort, ee, out);
            }
        });
    }

    /// Returns true if a disambiguation lemma was sent, in which case the sorts wait for the
    /// next round.
    fn disambiguate(&mut self, ee: &dyn EqualityEngine, out: &mut dyn OutputChannel) -> bool {
        let Some(disambiguator) = &mut self.disambiguator else {
            return false;
        };
        let sent = disambiguator.disambiguate(self.level, ee, out);
        self.stats.disambiguation_lemmas += sent as u64;
        sent > 0
    }

    fn check_sorts(
        &mut self,
        effort: Effort,
        ee: &mut dyn EqualityEngine,
        out: &mut dyn OutputChannel,
    ) {
        let Self {
            models,
            stats,
            propagator,
            conflict,
            level,
            ..
        } = self;
        for model in models.values_mut() {
            let mut env = Env {
                ee: &mut *ee,
                out: &mut *out,
                stats: &mut *stats,
                propagator: propagator.as_ref(),
            };
            model.check(effort, &mut env);
            if model.is_conflict() {
                conflict.set(*level, true);
                break;
            }
        }
    }

    /// The next cardinality literal the search should decide, if any.
    pub fn next_decision_request(&self) -> Option<Formula> {
        self.models
            .values()
            .find_map(SortModel::next_decision_request)
    }

    pub fn are_disequal(&self, a: TermId, b: TermId, ee: &dyn EqualityEngine) -> bool {
        if a == b {
            return false;
        }
        let (a, b) = (ee.representative(a), ee.representative(b));
        if ee.are_disequal(a, b) {
            return true;
        }
        self.models
            .get(&ee.sort_of(a))
            .is_some_and(|model| model.are_disequal(a, b))
    }

    /// The committed cardinality of `sort`, if any.
    pub fn cardinality(&self, sort: SortId) -> Result<Option<u32>> {
        self.models
            .get(&sort)
            .map(SortModel::cardinality)
            .ok_or(SolverError::UnknownSort(sort))
    }

    pub fn representatives(&self, sort: SortId) -> Result<Vec<TermId>> {
        self.models
            .get(&sort)
            .map(SortModel::representatives)
            .ok_or(SolverError::UnknownSort(sort))
    }

    /// Collapse every sort to a single region. Returns false if more splitting is needed.
    pub fn minimize(&mut self, ee: &mut dyn EqualityEngine, out: &mut dyn OutputChannel) -> bool {
        let Self {
            models,
            stats,
            propagator,
            ..
        } = self;
        models.values_mut().all(|model| {
            let mut env = Env {
                ee: &mut *ee,
                out: &mut *out,
                stats: &mut *stats,
                propagator: propagator.as_ref(),
            };
            model.minimize(&mut env)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::StrongSolver;
    use crate::{
        driver::{Recorder, ReferenceEngine},
        error::SolverError,
        formula::Formula,
        host::{Notification, TermDatabase as _},
        ids::SortId,
        options::Configuration,
    };
    use expect_test::expect;

    #[test]
    fn notifications_reach_the_sort_model() {
        let mut ee = ReferenceEngine::new();
        let mut out = Recorder::new();
        let mut solver = StrongSolver::new(Configuration::default());
        let u = ee.add_sort("U", true);
        let [a, b, c] = ["a", "b", "c"].map(|name| ee.add_constant(u, name));
        let f = ee.bool_constant(false);

        for t in [f, a, b, c] {
            solver
                .notify(Notification::NewClass(t), &mut ee, &mut out)
                .unwrap();
        }
        assert!(solver.sort_model(ee.bool_sort()).is_none());

        ee.assert_disequal(a, b, Formula::neq(a, b));
        solver
            .notify(Notification::Disequal(a, b, Formula::neq(a, b)), &mut ee, &mut out)
            .unwrap();
        let (rep, merged) = ee.assert_equal(b, c, Formula::eq(b, c)).unwrap();
        solver
            .notify(Notification::Merge(rep, merged), &mut ee, &mut out)
            .unwrap();
        let decide = |literal| Notification::Assert {
            literal,
            is_decision: true,
        };
        solver
            .notify(decide(Formula::card(u, 1)), &mut ee, &mut out)
            .unwrap();

        let lemmas: Vec<String> = out.lemmas.iter().map(ToString::to_string).collect();
        expect![[r#"
            [
                "(or (card s1 1) (not (card s1 1)))",
                "(or (= t2 t3) (not (card s1 1)))",
            ]
        "#]]
        .assert_debug_eq(&lemmas);
        assert!(solver.are_disequal(a, c, &ee));
        assert_eq!(solver.cardinality(u), Ok(Some(1)));

        assert_eq!(
            solver.notify(decide(Formula::card(SortId(9), 1)), &mut ee, &mut out),
            Err(SolverError::UnknownSort(SortId(9)))
        );
        assert_eq!(
            solver.cardinality(ee.bool_sort()),
            Err(SolverError::UnknownSort(ee.bool_sort()))
        );
    }
}
