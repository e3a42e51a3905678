use super::union_find::UndoUnionFind;
use crate::{
    context::Level,
    formula::Formula,
    host::{EqualityEngine, TermDatabase},
    ids::{OpId, SortId, TermId},
    typed_vec::TVec,
};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug)]
struct TermInfo {
    name: String,
    sort: SortId,
    app: Option<(OpId, Vec<TermId>)>,
}

#[derive(Debug)]
struct SortInfo {
    name: String,
    uninterpreted: bool,
}

#[derive(Debug)]
struct OpInfo {
    name: String,
    apps: Vec<TermId>,
}

/// A small backtrackable equality engine.
///
/// Terms are never deleted. Merges and disequalities are undone by [`ReferenceEngine::pop_to`].
/// There is no congruence closure, `f(a)` and `f(b)` are only equal if merged explicitly.
#[derive(Debug)]
pub struct ReferenceEngine {
    terms: TVec<TermId, TermInfo>,
    sorts: TVec<SortId, SortInfo>,
    ops: TVec<OpId, OpInfo>,
    uf: UndoUnionFind<TermId>,
    /// Proof forest edges, `(a, b, reason)` for every merge.
    edges: Vec<(TermId, TermId, Formula)>,
    disequalities: Vec<(TermId, TermId, Formula)>,
    /// `(edges, disequalities, union find)` lengths at every push.
    trail: Vec<(usize, usize, usize)>,
    bool_sort: SortId,
    bool_constants: [TermId; 2],
    inferred: BTreeMap<TermId, u32>,
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceEngine {
    pub fn new() -> Self {
        let mut ret = Self {
            terms: TVec::new(),
            sorts: TVec::new(),
            ops: TVec::new(),
            uf: UndoUnionFind::new(),
            edges: Vec::new(),
            disequalities: Vec::new(),
            trail: Vec::new(),
            bool_sort: SortId(0),
            bool_constants: [TermId(0); 2],
            inferred: BTreeMap::new(),
        };
        ret.bool_sort = ret.add_sort("Bool", false);
        let false_term = ret.add_constant(ret.bool_sort, "false");
        let true_term = ret.add_constant(ret.bool_sort, "true");
        ret.bool_constants = [false_term, true_term];
        ret.disequalities
            .push((false_term, true_term, Formula::Const(true)));
        ret
    }

    pub fn level(&self) -> Level {
        self.trail.len()
    }
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }
    pub fn terms(&self) -> impl Iterator<Item = TermId> + use<> {
        self.terms.ids_below(self.terms.len())
    }
    pub fn bool_sort(&self) -> SortId {
        self.bool_sort
    }
    pub fn name(&self, t: TermId) -> &str {
        &self.terms[t].name
    }
    pub fn sort_name(&self, sort: SortId) -> &str {
        &self.sorts[sort].name
    }
    pub fn op_name(&self, op: OpId) -> &str {
        &self.ops[op].name
    }

    pub fn add_sort(&mut self, name: &str, uninterpreted: bool) -> SortId {
        self.sorts.push(SortInfo {
            name: name.to_owned(),
            uninterpreted,
        })
    }
    pub fn add_op(&mut self, name: &str) -> OpId {
        self.ops.push(OpInfo {
            name: name.to_owned(),
            apps: Vec::new(),
        })
    }
    pub fn add_constant(&mut self, sort: SortId, name: &str) -> TermId {
        self.add_term(sort, name.to_owned(), None)
    }
    pub fn add_application(&mut self, op: OpId, args: &[TermId], sort: SortId) -> TermId {
        let name = format!(
            "({}{})",
            self.op_name(op),
            args.iter()
                .map(|&a| format!(" {}", self.terms[a].name))
                .collect::<String>()
        );
        let t = self.add_term(sort, name, Some((op, args.to_vec())));
        self.ops[op].apps.push(t);
        t
    }
    fn add_term(&mut self, sort: SortId, name: String, app: Option<(OpId, Vec<TermId>)>) -> TermId {
        let t = self.terms.push(TermInfo { name, sort, app });
        let uf_id = self.uf.push();
        debug_assert_eq!(t, uf_id);
        t
    }

    /// Pretend sort inference assigned `t` the subsort `id`.
    pub fn set_inferred_sort(&mut self, t: TermId, id: u32) {
        self.inferred.insert(t, id);
    }

    pub fn push(&mut self) {
        self.trail
            .push((self.edges.len(), self.disequalities.len(), self.uf.mark()));
    }
    pub fn pop_to(&mut self, level: Level) {
        while self.trail.len() > level {
            let Some((edges, disequalities, mark)) = self.trail.pop() else {
                break;
            };
            self.edges.truncate(edges);
            self.disequalities.truncate(disequalities);
            self.uf.undo_to(mark);
        }
    }

    /// Merge the classes of `a` and `b`. Returns `(new representative, absorbed representative)`
    /// if they were distinct.
    pub fn assert_equal(&mut self, a: TermId, b: TermId, reason: Formula) -> Option<(TermId, TermId)> {
        debug_assert!(!self.are_disequal(a, b), "{a} = {b} contradicts a disequality");
        let merged = self.uf.union(a, b)?;
        self.edges.push((a, b, reason));
        Some(merged)
    }
    pub fn assert_disequal(&mut self, a: TermId, b: TermId, reason: Formula) {
        debug_assert!(!self.are_equal(a, b), "{a} != {b} within one class");
        self.disequalities.push((a, b, reason));
    }
}

impl EqualityEngine for ReferenceEngine {
    fn sort_of(&self, t: TermId) -> SortId {
        self.terms[t].sort
    }
    fn is_uninterpreted(&self, sort: SortId) -> bool {
        self.sorts[sort].uninterpreted
    }
    fn representative(&self, t: TermId) -> TermId {
        self.uf.find(t)
    }
    fn are_disequal(&self, a: TermId, b: TermId) -> bool {
        let (ra, rb) = (self.uf.find(a), self.uf.find(b));
        ra != rb
            && self.disequalities.iter().any(|&(x, y, _)| {
                let (rx, ry) = (self.uf.find(x), self.uf.find(y));
                (rx, ry) == (ra, rb) || (rx, ry) == (rb, ra)
            })
    }
    /// Reasons along the path between `a` and `b` in the proof forest.
    fn explain_equality(&self, a: TermId, b: TermId) -> Vec<Formula> {
        if a == b {
            return Vec::new();
        }
        let mut adjacent: BTreeMap<TermId, Vec<(TermId, usize)>> = BTreeMap::new();
        for (i, &(x, y, _)) in self.edges.iter().enumerate() {
            adjacent.entry(x).or_default().push((y, i));
            adjacent.entry(y).or_default().push((x, i));
        }
        let mut reached: BTreeMap<TermId, Option<(TermId, usize)>> = BTreeMap::new();
        reached.insert(a, None);
        let mut queue = VecDeque::from([a]);
        while let Some(x) = queue.pop_front() {
            if x == b {
                break;
            }
            for &(y, edge) in adjacent.get(&x).into_iter().flatten() {
                if !reached.contains_key(&y) {
                    reached.insert(y, Some((x, edge)));
                    queue.push_back(y);
                }
            }
        }
        let mut reasons = Vec::new();
        let mut x = b;
        while let Some(&Some((prev, edge))) = reached.get(&x) {
            reasons.push(self.edges[edge].2.clone());
            x = prev;
        }
        debug_assert_eq!(x, a, "{a} and {b} are not equal");
        reasons
    }
    fn fresh_term(&mut self, sort: SortId, name: &str) -> TermId {
        self.add_constant(sort, name)
    }
    fn inferred_sort(&self, t: TermId) -> Option<u32> {
        self.inferred.get(&t).copied()
    }
    fn term_database(&self) -> Option<&dyn TermDatabase> {
        Some(self)
    }
}

impl TermDatabase for ReferenceEngine {
    fn application(&self, t: TermId) -> Option<(OpId, Vec<TermId>)> {
        self.terms[t].app.clone()
    }
    fn operators(&self) -> Vec<OpId> {
        self.ops.ids_below(self.ops.len()).collect()
    }
    fn applications_of(&self, op: OpId) -> Vec<TermId> {
        self.ops[op].apps.clone()
    }
    fn equivalence_class(&self, rep: TermId) -> Vec<TermId> {
        self.uf.set(rep).to_vec()
    }
    fn bool_constant(&self, value: bool) -> TermId {
        self.bool_constants[usize::from(value)]
    }
}

#[cfg(test)]
mod tests {
    use super::ReferenceEngine;
    use crate::{formula::Formula, host::EqualityEngine};

    #[test]
    fn explain_follows_merges() {
        let mut ee = ReferenceEngine::new();
        let u = ee.add_sort("U", true);
        let [a, b, c, d, e] = ["a", "b", "c", "d", "e"].map(|name| ee.add_constant(u, name));
        ee.assert_equal(a, b, Formula::eq(a, b));
        ee.push();
        ee.assert_equal(c, b, Formula::eq(c, b));
        ee.assert_equal(d, c, Formula::eq(d, c));
        assert!(ee.are_equal(a, d));
        let reasons: Vec<String> = ee
            .explain_equality(a, d)
            .iter()
            .map(ToString::to_string)
            .collect();
        expect_test::expect![[r#"
            [
                "(= t4 t5)",
                "(= t3 t4)",
                "(= t2 t3)",
            ]
        "#]]
        .assert_debug_eq(&reasons);

        ee.assert_disequal(d, e, Formula::neq(d, e));
        assert!(ee.are_disequal(a, e));
        ee.pop_to(0);
        assert!(!ee.are_equal(a, d));
        assert!(ee.are_equal(a, b));
        assert!(!ee.are_disequal(a, e));
        assert!(!ee.are_disequal(d, e));
    }

    #[test]
    fn bool_constants_are_distinct() {
        let ee = ReferenceEngine::new();
        let db = ee.term_database().unwrap();
        assert!(ee.are_disequal(db.bool_constant(true), db.bool_constant(false)));
        assert_eq!(ee.name(db.bool_constant(true)), "true");
    }
}
