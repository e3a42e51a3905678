//! Capabilities the core expects from the surrounding solver.

use crate::{
    formula::Formula,
    ids::{OpId, SortId, TermId},
};

/// How hard a check should try.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Effort {
    Standard,
    /// Every literal is assigned, the check must be complete.
    Full,
}

/// The congruence-closure engine owning term identity and equivalence classes.
pub trait EqualityEngine {
    fn sort_of(&self, t: TermId) -> SortId;
    /// Whether cardinality reasoning applies to `sort`.
    fn is_uninterpreted(&self, sort: SortId) -> bool;
    fn representative(&self, t: TermId) -> TermId;
    fn are_equal(&self, a: TermId, b: TermId) -> bool {
        self.representative(a) == self.representative(b)
    }
    fn are_disequal(&self, a: TermId, b: TermId) -> bool;
    /// Literals entailing `a = b`, which must currently hold.
    fn explain_equality(&self, a: TermId, b: TermId) -> Vec<Formula>;
    /// Create a fresh constant of `sort`.
    fn fresh_term(&mut self, sort: SortId, name: &str) -> TermId;
    /// Sort id assigned by sort inference, if the host runs it.
    fn inferred_sort(&self, _t: TermId) -> Option<u32> {
        None
    }
    fn term_database(&self) -> Option<&dyn TermDatabase> {
        None
    }
}

/// Structural queries over the term graph.
pub trait TermDatabase {
    /// Symbol and arguments if `t` is an application of an uninterpreted function.
    fn application(&self, t: TermId) -> Option<(OpId, Vec<TermId>)>;
    fn operators(&self) -> Vec<OpId>;
    fn applications_of(&self, op: OpId) -> Vec<TermId>;
    fn equivalence_class(&self, rep: TermId) -> Vec<TermId>;
    fn bool_constant(&self, value: bool) -> TermId;
}

/// Where lemmas, conflicts and decision hints go.
pub trait OutputChannel {
    fn lemma(&mut self, lemma: Formula);
    /// A conjunction of currently asserted literals that is unsatisfiable.
    fn conflict(&mut self, conflict: Formula);
    /// Ask the search to branch on `literal`, trying `preferred_phase` first.
    fn propose_split(&mut self, literal: Formula, preferred_phase: bool);
    fn require_phase(&mut self, literal: Formula, phase: bool);
}

/// Events delivered by the equality engine and the search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    NewClass(TermId),
    /// `b` was merged into `a`, `a` is the new representative.
    Merge(TermId, TermId),
    Disequal(TermId, TermId, Formula),
    Assert { literal: Formula, is_decision: bool },
}
