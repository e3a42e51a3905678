//! A reference host for the strong solver.
//!
//! [`ReferenceEngine`] is a small backtrackable equality engine, [`Recorder`] collects what the
//! solver sends and [`Search`] is a chronological backtracking search that decides cardinality
//! literals, equality splits and lemma atoms until the solver is satisfied or every branch
//! failed. It finds the smallest model of each sort for problems made of constants,
//! applications, equalities and disequalities.

mod engine;
mod recorder;
mod union_find;

pub use engine::ReferenceEngine;
pub use recorder::Recorder;

use crate::{
    context::{CdMap, Level},
    error::Result,
    formula::Formula,
    host::{Effort, EqualityEngine as _, TermDatabase as _},
    ids::{OpId, SortId, TermId},
    options::Configuration,
    solver::StrongSolver,
    stats::Statistics,
};

/// Size and elements of one sort in a model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSummary {
    pub sort: SortId,
    pub cardinality: u32,
    pub representatives: Vec<TermId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Sat(Vec<SortSummary>),
    Unsat,
}

impl Outcome {
    /// Model size of `sort`, if satisfiable.
    pub fn cardinality(&self, sort: SortId) -> Option<u32> {
        match self {
            Outcome::Sat(sorts) => sorts
                .iter()
                .find(|summary| summary.sort == sort)
                .map(|summary| summary.cardinality),
            Outcome::Unsat => None,
        }
    }
}

#[derive(Debug)]
struct Frame {
    /// Level entered by the decision.
    level: Level,
    literal: Formula,
}

pub struct Search {
    engine: ReferenceEngine,
    solver: StrongSolver,
    out: Recorder,
    /// Every lemma sent so far, never forgotten.
    lemmas: Vec<Formula>,
    card_values: CdMap<(SortId, u32), bool>,
    /// Splits proposed since the last decision.
    splits: Vec<Formula>,
    frames: Vec<Frame>,
    conflicted: bool,
    level: Level,
    /// Engine terms already announced to the solver.
    registered: usize,
    decisions: u64,
    backtracks: u64,
}

impl Search {
    pub fn new(config: Configuration) -> Self {
        let engine = ReferenceEngine::new();
        let registered = engine.num_terms();
        Self {
            engine,
            solver: StrongSolver::new(config),
            out: Recorder::new(),
            lemmas: Vec::new(),
            card_values: CdMap::new(),
            splits: Vec::new(),
            frames: Vec::new(),
            conflicted: false,
            level: 0,
            registered,
            decisions: 0,
            backtracks: 0,
        }
    }

    pub fn engine(&self) -> &ReferenceEngine {
        &self.engine
    }
    pub fn solver(&self) -> &StrongSolver {
        &self.solver
    }
    pub fn statistics(&self) -> &Statistics {
        self.solver.statistics()
    }
    pub fn lemmas(&self) -> &[Formula] {
        &self.lemmas
    }
    pub fn decisions(&self) -> u64 {
        self.decisions
    }
    pub fn backtracks(&self) -> u64 {
        self.backtracks
    }
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn add_sort(&mut self, name: &str) -> SortId {
        self.engine.add_sort(name, true)
    }
    pub fn add_op(&mut self, name: &str) -> OpId {
        self.engine.add_op(name)
    }
    pub fn add_constant(&mut self, sort: SortId, name: &str) -> Result<TermId> {
        let t = self.engine.add_constant(sort, name);
        self.sync()?;
        Ok(t)
    }
    pub fn add_application(&mut self, op: OpId, args: &[TermId], sort: SortId) -> Result<TermId> {
        let t = self.engine.add_application(op, args, sort);
        self.sync()?;
        Ok(t)
    }
    /// A boolean-valued application of `op`.
    pub fn add_predicate(&mut self, op: OpId, args: &[TermId]) -> Result<TermId> {
        let bool_sort = self.engine.bool_sort();
        self.add_application(op, args, bool_sort)
    }
    pub fn set_inferred_sort(&mut self, t: TermId, id: u32) {
        self.engine.set_inferred_sort(t, id);
    }

    pub fn assert_equal(&mut self, a: TermId, b: TermId) -> Result<()> {
        self.assert_literal(&Formula::eq(a, b))
    }
    pub fn assert_distinct(&mut self, a: TermId, b: TermId) -> Result<()> {
        self.assert_literal(&Formula::neq(a, b))
    }
    /// Pairwise disequalities between all of `terms`.
    pub fn assert_all_distinct(&mut self, terms: &[TermId]) -> Result<()> {
        for (i, &a) in terms.iter().enumerate() {
            for &b in &terms[i + 1..] {
                self.assert_distinct(a, b)?;
            }
        }
        Ok(())
    }
    /// Assert a literal at the current level, outside of any decision.
    pub fn assert_literal(&mut self, literal: &Formula) -> Result<()> {
        self.apply(literal, false)
    }

    /// Announce engine terms the solver has not seen yet, then drain the output channel.
    fn sync(&mut self) -> Result<()> {
        while self.registered < self.engine.num_terms() {
            let t = TermId(self.registered);
            self.registered += 1;
            self.solver
                .pre_register_term(t, &mut self.engine, &mut self.out)?;
            self.solver
                .notify_new_class(t, &mut self.engine, &mut self.out)?;
        }
        self.lemmas.append(&mut self.out.lemmas);
        if !self.out.conflicts.is_empty() {
            self.conflicted = true;
            self.out.conflicts.clear();
        }
        self.splits
            .extend(self.out.splits.drain(..).map(|(literal, _)| literal));
        self.out.phases.clear();
        Ok(())
    }

    fn apply(&mut self, literal: &Formula, is_decision: bool) -> Result<()> {
        let Some((atom, polarity)) = literal.as_literal() else {
            return Ok(());
        };
        match *atom {
            Formula::Eq(a, b) if polarity => self.merge(a, b, literal.clone())?,
            Formula::Eq(a, b) => self.distinct(a, b, literal.clone())?,
            Formula::Card { sort, bound } => {
                self.card_values.insert(self.level, (sort, bound), polarity);
                self.solver
                    .notify_assert(literal, is_decision, &mut self.engine, &mut self.out)?;
            }
            Formula::Atom(p) => {
                let value = self.engine.bool_constant(polarity);
                self.merge(p, value, literal.clone())?;
                self.solver
                    .notify_assert(literal, is_decision, &mut self.engine, &mut self.out)?;
            }
            _ => {}
        }
        self.sync()
    }

    fn merge(&mut self, a: TermId, b: TermId, reason: Formula) -> Result<()> {
        if self.solver.are_disequal(a, b, &self.engine) {
            self.conflicted = true;
            return Ok(());
        }
        if let Some((rep, absorbed)) = self.engine.assert_equal(a, b, reason) {
            self.solver
                .notify_merge(rep, absorbed, &mut self.engine, &mut self.out)?;
        }
        Ok(())
    }

    fn distinct(&mut self, a: TermId, b: TermId, reason: Formula) -> Result<()> {
        if self.engine.are_equal(a, b) {
            self.conflicted = true;
            return Ok(());
        }
        if self.solver.are_disequal(a, b, &self.engine) {
            return Ok(());
        }
        self.engine.assert_disequal(a, b, reason.clone());
        self.solver
            .notify_disequal(a, b, reason, &mut self.engine, &mut self.out)
    }

    /// Three-valued evaluation under the current assignment.
    fn eval(&self, f: &Formula) -> Option<bool> {
        match f {
            Formula::Const(b) => Some(*b),
            Formula::Eq(a, b) => {
                if self.engine.are_equal(*a, *b) {
                    Some(true)
                } else if self.solver.are_disequal(*a, *b, &self.engine) {
                    Some(false)
                } else {
                    None
                }
            }
            Formula::Atom(p) => [true, false]
                .into_iter()
                .find(|&value| self.engine.are_equal(*p, self.engine.bool_constant(value))),
            Formula::Card { sort, bound } => self.card_values.get(&(*sort, *bound)).copied(),
            Formula::Not(inner) => self.eval(inner).map(|b| !b),
            Formula::And(children) => {
                let mut ret = Some(true);
                for child in children {
                    match self.eval(child) {
                        Some(false) => return Some(false),
                        None => ret = None,
                        Some(true) => {}
                    }
                }
                ret
            }
            Formula::Or(children) => {
                let mut ret = Some(false);
                for child in children {
                    match self.eval(child) {
                        Some(true) => return Some(true),
                        None => ret = None,
                        Some(false) => {}
                    }
                }
                ret
            }
            Formula::Implies(premise, conclusion) => match (self.eval(premise), self.eval(conclusion)) {
                (Some(false), _) | (_, Some(true)) => Some(true),
                (Some(true), Some(false)) => Some(false),
                _ => None,
            },
        }
    }

    /// Some atom of `f` without a value.
    fn undecided_atom(&self, f: &Formula) -> Option<Formula> {
        match f {
            Formula::Const(_) => None,
            Formula::Eq(..) | Formula::Atom(_) | Formula::Card { .. } => {
                self.eval(f).is_none().then(|| f.clone())
            }
            Formula::Not(inner) => self.undecided_atom(inner),
            Formula::And(children) | Formula::Or(children) => {
                children.iter().find_map(|child| self.undecided_atom(child))
            }
            Formula::Implies(premise, conclusion) => self
                .undecided_atom(premise)
                .or_else(|| self.undecided_atom(conclusion)),
        }
    }

    fn in_conflict(&self) -> bool {
        self.conflicted
            || self.solver.is_conflict()
            || self
                .lemmas
                .iter()
                .any(|lemma| self.eval(lemma) == Some(false))
    }

    fn push(&mut self) {
        self.level += 1;
        self.engine.push();
        self.solver.push();
    }

    fn pop_to(&mut self, level: Level) {
        self.level = level;
        self.engine.pop_to(level);
        self.solver.pop_to(level);
        self.card_values.pop_to(level);
    }

    fn decide(&mut self, literal: Formula) -> Result<()> {
        self.decisions += 1;
        self.push();
        tracing::debug!("decide {literal} at level {}", self.level);
        self.frames.push(Frame {
            level: self.level,
            literal: literal.clone(),
        });
        self.apply(&literal, true)
    }

    /// Undo the latest decision and assert its negation. Returns false if there was none.
    fn backtrack(&mut self) -> Result<bool> {
        let Some(frame) = self.frames.pop() else {
            return Ok(false);
        };
        self.backtracks += 1;
        self.pop_to(frame.level - 1);
        self.conflicted = false;
        self.splits.clear();
        self.out.clear();
        // Terms created above this level were forgotten by the solver.
        for t in self.engine.terms() {
            if self.engine.representative(t) == t {
                self.solver
                    .notify_new_class(t, &mut self.engine, &mut self.out)?;
            }
        }
        let flipped = frame.literal.negate();
        tracing::debug!("backtrack to level {}, assert {flipped}", self.level);
        self.apply(&flipped, false)?;
        Ok(true)
    }

    fn pending_split(&mut self) -> Option<Formula> {
        let splits = std::mem::take(&mut self.splits);
        splits
            .into_iter()
            .find(|literal| self.eval(literal).is_none())
    }

    /// Search for the smallest model of every sort.
    pub fn run(&mut self) -> Result<Outcome> {
        crate::log_duration!("search took {}", { self.search() })
    }

    fn search(&mut self) -> Result<Outcome> {
        loop {
            if self.in_conflict() {
                if !self.backtrack()? {
                    tracing::info!("no model after {} decisions", self.decisions);
                    return Ok(Outcome::Unsat);
                }
                continue;
            }
            if let Some(literal) = self.solver.next_decision_request() {
                self.decide(literal)?;
                continue;
            }
            self.solver
                .check(Effort::Full, &mut self.engine, &mut self.out);
            self.sync()?;
            if self.in_conflict() {
                continue;
            }
            if let Some(literal) = self.pending_split() {
                self.decide(literal)?;
                continue;
            }
            if let Some(atom) = self
                .lemmas
                .iter()
                .find(|lemma| self.eval(lemma).is_none())
                .and_then(|lemma| self.undecided_atom(lemma))
            {
                self.decide(atom)?;
                continue;
            }
            if !self.solver.minimize(&mut self.engine, &mut self.out) {
                self.sync()?;
                continue;
            }
            let model = self.model();
            tracing::info!(
                "model found after {} decisions, {} backtracks",
                self.decisions,
                self.backtracks
            );
            return Ok(Outcome::Sat(model));
        }
    }

    fn model(&self) -> Vec<SortSummary> {
        self.solver
            .sort_models()
            .map(|model| SortSummary {
                sort: model.sort(),
                cardinality: model
                    .cardinality()
                    .unwrap_or_else(|| model.allocated_cardinality()),
                representatives: model.representatives(),
            })
            .collect()
    }

    pub fn dbg_summary(&self) -> String {
        self.solver
            .sort_models()
            .map(|model| model.dbg_summary())
            .collect()
    }
}
