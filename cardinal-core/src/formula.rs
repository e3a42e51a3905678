//! Opaque formula trees handed to the host as lemmas, conflicts, splits and explanations.

use crate::ids::{SortId, TermId};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Formula {
    Const(bool),
    /// Equality between two terms, smaller id first.
    Eq(TermId, TermId),
    /// A boolean-valued term, such as a predicate application.
    Atom(TermId),
    /// "`sort` has at most `bound` elements".
    Card { sort: SortId, bound: u32 },
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn eq(a: TermId, b: TermId) -> Self {
        Self::Eq(a.min(b), a.max(b))
    }
    pub fn neq(a: TermId, b: TermId) -> Self {
        Self::eq(a, b).negate()
    }
    pub fn card(sort: SortId, bound: u32) -> Self {
        Self::Card { sort, bound }
    }
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            Self::Const(b) => Self::Const(!b),
            other => Self::Not(Box::new(other)),
        }
    }
    pub fn and(mut children: Vec<Formula>) -> Self {
        match children.len() {
            0 => Self::Const(true),
            1 => children.pop().unwrap_or(Self::Const(true)),
            _ => Self::And(children),
        }
    }
    pub fn or(mut children: Vec<Formula>) -> Self {
        match children.len() {
            0 => Self::Const(false),
            1 => children.pop().unwrap_or(Self::Const(false)),
            _ => Self::Or(children),
        }
    }
    pub fn implies(premise: Formula, conclusion: Formula) -> Self {
        Self::Implies(Box::new(premise), Box::new(conclusion))
    }

    /// Split a literal into its atom and polarity.
    pub fn as_literal(&self) -> Option<(&Formula, bool)> {
        match self {
            Self::Not(inner) => match &**inner {
                atom @ (Self::Eq(..) | Self::Atom(_) | Self::Card { .. }) => Some((atom, false)),
                _ => None,
            },
            Self::Eq(..) | Self::Atom(_) | Self::Card { .. } => Some((self, true)),
            _ => None,
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, head: &str, xs: &[Formula]) -> fmt::Result {
            write!(f, "({head}")?;
            for x in xs {
                write!(f, " {x}")?;
            }
            write!(f, ")")
        }
        match self {
            Self::Const(b) => write!(f, "{b}"),
            Self::Eq(a, b) => write!(f, "(= {a} {b})"),
            Self::Atom(t) => write!(f, "{t}"),
            Self::Card { sort, bound } => write!(f, "(card {sort} {bound})"),
            Self::Not(x) => write!(f, "(not {x})"),
            Self::And(xs) => list(f, "and", xs),
            Self::Or(xs) => list(f, "or", xs),
            Self::Implies(a, b) => write!(f, "(=> {a} {b})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Formula;
    use crate::ids::{SortId, TermId};
    use expect_test::expect;

    #[test]
    fn equalities_are_oriented() {
        assert_eq!(
            Formula::eq(TermId(4), TermId(1)),
            Formula::eq(TermId(1), TermId(4))
        );
    }

    #[test]
    fn render() {
        let lemma = Formula::implies(
            Formula::and(vec![
                Formula::neq(TermId(2), TermId(0)),
                Formula::neq(TermId(1), TermId(2)),
            ]),
            Formula::card(SortId(0), 1).negate(),
        );
        expect!["(=> (and (not (= t0 t2)) (not (= t1 t2))) (not (card s0 1)))"]
            .assert_eq(&lemma.to_string());
        assert_eq!(
            Formula::or(vec![Formula::Atom(TermId(3))]),
            Formula::Atom(TermId(3))
        );
        assert_eq!(
            Formula::card(SortId(1), 2).negate().negate(),
            Formula::card(SortId(1), 2)
        );
    }
}
