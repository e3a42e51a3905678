use crate::{
    driver::{Outcome, Recorder, ReferenceEngine, Search},
    formula::Formula,
    host::{Effort, EqualityEngine as _},
    ids::{SortId, TermId},
    options::Configuration,
    solver::StrongSolver,
};
use proptest::prelude::*;

// to make sure that tests are not accidentally run without debug asserts.
#[should_panic]
#[test]
fn debug_assert_is_enabled() {
    debug_assert!(false);
}

const TERMS: usize = 8;
const ACTIONS: usize = 60;

#[derive(Clone, Debug)]
enum Action {
    Merge(usize, usize),
    Distinct(usize, usize),
    Push,
    Pop,
    /// Decide the requested cardinality literal with this value.
    Card(bool),
    /// Full effort if true.
    Check(bool),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => (0..TERMS, 0..TERMS).prop_map(|(a, b)| Action::Merge(a, b)),
        5 => (0..TERMS, 0..TERMS).prop_map(|(a, b)| Action::Distinct(a, b)),
        2 => Just(Action::Push),
        2 => Just(Action::Pop),
        2 => any::<bool>().prop_map(Action::Card),
        1 => any::<bool>().prop_map(Action::Check),
    ]
}

/// Drives the solver directly, without a search.
struct Harness {
    ee: ReferenceEngine,
    out: Recorder,
    solver: StrongSolver,
    sort: SortId,
    terms: Vec<TermId>,
}

impl Harness {
    fn new(config: Configuration) -> Self {
        let mut ee = ReferenceEngine::new();
        let mut out = Recorder::new();
        let mut solver = StrongSolver::new(config);
        let sort = ee.add_sort("U", true);
        let terms: Vec<TermId> = (0..TERMS)
            .map(|i| ee.add_constant(sort, &format!("x{i}")))
            .collect();
        for &t in &terms {
            solver.pre_register_term(t, &mut ee, &mut out).unwrap();
            solver.notify_new_class(t, &mut ee, &mut out).unwrap();
        }
        Self {
            ee,
            out,
            solver,
            sort,
            terms,
        }
    }

    fn apply(&mut self, action: &Action) {
        let Self {
            ee,
            out,
            solver,
            terms,
            ..
        } = self;
        match *action {
            Action::Merge(i, j) => {
                let (a, b) = (terms[i], terms[j]);
                if ee.are_equal(a, b) || solver.are_disequal(a, b, &*ee) {
                    return;
                }
                let (rep, absorbed) = ee.assert_equal(a, b, Formula::eq(a, b)).unwrap();
                solver.notify_merge(rep, absorbed, ee, out).unwrap();
            }
            Action::Distinct(i, j) => {
                let (a, b) = (terms[i], terms[j]);
                if ee.are_equal(a, b) || solver.are_disequal(a, b, &*ee) {
                    return;
                }
                ee.assert_disequal(a, b, Formula::neq(a, b));
                solver
                    .notify_disequal(a, b, Formula::neq(a, b), ee, out)
                    .unwrap();
            }
            Action::Push => {
                ee.push();
                solver.push();
            }
            Action::Pop => {
                if let Some(level) = solver.level().checked_sub(1) {
                    ee.pop_to(level);
                    solver.pop_to(level);
                }
            }
            Action::Card(value) => {
                if let Some(literal) = solver.next_decision_request() {
                    let literal = if value { literal } else { literal.negate() };
                    solver.notify_assert(&literal, true, ee, out).unwrap();
                }
            }
            Action::Check(full) => {
                let effort = if full { Effort::Full } else { Effort::Standard };
                solver.check(effort, ee, out);
            }
        }
    }

    fn verify(&self) {
        let Some(model) = self.solver.sort_model(self.sort) else {
            panic!("sort was registered");
        };
        model.check_invariants().unwrap();
        let reps: Vec<TermId> = self
            .terms
            .iter()
            .copied()
            .filter(|&t| self.ee.representative(t) == t)
            .collect();
        assert_eq!(model.num_reps(), reps.len());
        for (i, &a) in reps.iter().enumerate() {
            for &b in &reps[i + 1..] {
                assert_eq!(
                    model.are_disequal(a, b),
                    self.ee.are_disequal(a, b),
                    "{a} != {b}\n{}",
                    model.dbg_summary()
                );
            }
        }
    }
}

/// Smallest number of colors for a graph on `n` vertices.
fn chromatic_number(n: usize, edges: &[(usize, usize)]) -> u32 {
    fn colorable(n: usize, edges: &[(usize, usize)], k: usize, colors: &mut Vec<usize>) -> bool {
        let i = colors.len();
        if i == n {
            return true;
        }
        for c in 0..k {
            let clash = edges.iter().any(|&(a, b)| {
                (a == i && b < i && colors[b] == c) || (b == i && a < i && colors[a] == c)
            });
            if clash {
                continue;
            }
            colors.push(c);
            if colorable(n, edges, k, colors) {
                return true;
            }
            colors.pop();
        }
        false
    }
    (1..=n)
        .find(|&k| colorable(n, edges, k, &mut Vec::new()))
        .map_or(1, |k| k as u32)
}

fn graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1..=6_usize).prop_flat_map(|n| {
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();
        let len = pairs.len();
        (
            Just(n),
            proptest::collection::vec(any::<bool>(), len).prop_map(move |keep| {
                pairs
                    .iter()
                    .zip(keep)
                    .filter(|(_, keep)| *keep)
                    .map(|(&pair, _)| pair)
                    .collect::<Vec<_>>()
            }),
        )
    })
}

fn config(index: usize) -> Configuration {
    let default = Configuration::default();
    match index {
        0 => default,
        1 => Configuration {
            explained_cliques: true,
            ..default
        },
        2 => Configuration {
            regions: false,
            ..default
        },
        _ => Configuration {
            smart_splits: true,
            eager_splits: true,
            ..default
        },
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn regions_track_the_engine(actions in proptest::collection::vec(action(), 0..ACTIONS)) {
        let mut harness = Harness::new(Configuration::default());
        let mut allocated = 1;
        for action in &actions {
            harness.apply(action);
            harness.verify();
            let Some(model) = harness.solver.sort_model(harness.sort) else {
                panic!("sort was registered");
            };
            assert!(model.allocated_cardinality() >= allocated);
            allocated = model.allocated_cardinality();
        }
    }

    #[test]
    fn search_finds_chromatic_number((n, edges) in graph(), index in 0..4_usize) {
        let mut search = Search::new(config(index));
        let u = search.add_sort("U");
        let vertices: Vec<TermId> = (0..n)
            .map(|i| search.add_constant(u, &format!("v{i}")).unwrap())
            .collect();
        for &(a, b) in &edges {
            search.assert_distinct(vertices[a], vertices[b]).unwrap();
        }
        let outcome = search.run().unwrap();
        let Outcome::Sat(_) = &outcome else {
            panic!("graphs are colorable");
        };
        let size = outcome.cardinality(u).unwrap();
        assert_eq!(size, chromatic_number(n, &edges));

        let ee = search.engine();
        for &(a, b) in &edges {
            assert_ne!(ee.representative(vertices[a]), ee.representative(vertices[b]));
        }
        let mut classes: Vec<TermId> = vertices.iter().map(|&v| ee.representative(v)).collect();
        classes.sort();
        classes.dedup();
        assert!(classes.len() <= size as usize);
    }
}
