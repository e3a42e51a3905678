use super::{DiseqKind, Region};
use crate::{host::Effort, ids::TermId, options::Configuration};
use expect_test::expect;

fn t(n: usize) -> TermId {
    TermId(n)
}

fn region_with(reps: &[usize], diseqs: &[(usize, usize)]) -> Region {
    let mut region = Region::new();
    for &n in reps {
        region.add_rep(0, t(n));
    }
    for &(a, b) in diseqs {
        region.set_disequal(0, t(a), t(b), DiseqKind::Internal, true);
        region.set_disequal(0, t(b), t(a), DiseqKind::Internal, true);
    }
    region
}

#[test]
fn quick_clique_when_all_pairs_disequal() {
    let config = Configuration::default();
    let mut region = region_with(&[0, 1, 2], &[(0, 1), (0, 2), (1, 2)]);
    let clique = region.check(0, Effort::Standard, 2, &config);
    assert_eq!(clique, Some(vec![t(0), t(1), t(2)]));
    assert_eq!(region.check(0, Effort::Standard, 3, &config), None);
}

#[test]
fn test_clique_prefers_high_degree() {
    let config = Configuration::default();
    let mut region = region_with(&[0, 1, 2, 3], &[(1, 2), (1, 3), (2, 3)]);
    let clique = region.check(0, Effort::Standard, 2, &config);
    assert_eq!(clique, Some(vec![t(1), t(2), t(3)]));
}

#[test]
fn clique_of_card_plus_one_disequal_terms() {
    let config = Configuration::default();
    for card in 1..5_usize {
        let reps: Vec<usize> = (0..=card).collect();
        let mut pairs = Vec::new();
        for a in 0..=card {
            for b in 0..a {
                pairs.push((a, b));
            }
        }
        let mut region = region_with(&reps, &pairs);
        region.add_rep(0, t(100));
        let clique = region
            .check(0, Effort::Full, card as u32, &config)
            .expect("clique");
        assert_eq!(clique, reps.iter().map(|&n| t(n)).collect::<Vec<_>>());
    }
}

#[test]
fn invalidating_test_clique_member_purges_splits() {
    let config = Configuration::default();
    let mut region = region_with(&[0, 1, 2], &[(0, 1)]);
    assert_eq!(region.check(1, Effort::Standard, 2, &config), None);
    assert_eq!(
        region.splits().collect::<Vec<_>>(),
        vec![(t(0), t(2)), (t(1), t(2))]
    );

    region.set_rep(1, t(2), false);
    assert!(!region.has_splits());
    assert_eq!(region.test_clique().collect::<Vec<_>>(), vec![t(0), t(1)]);

    region.pop_to(0);
    assert!(region.has_rep(t(2)));
    assert_eq!(region.test_clique().count(), 0);
}

#[test]
fn internal_disequality_satisfies_split() {
    let config = Configuration::default();
    let mut region = region_with(&[0, 1, 2], &[(0, 1)]);
    assert_eq!(region.check(0, Effort::Standard, 2, &config), None);
    region.set_disequal(0, t(0), t(2), DiseqKind::Internal, true);
    assert_eq!(region.splits().collect::<Vec<_>>(), vec![(t(1), t(2))]);
    region.set_disequal(0, t(2), t(1), DiseqKind::Internal, true);
    assert!(!region.has_splits());
    region.set_disequal(0, t(2), t(0), DiseqKind::Internal, true);
    region.set_disequal(0, t(1), t(2), DiseqKind::Internal, true);
    assert_eq!(
        region.check(0, Effort::Standard, 2, &config),
        Some(vec![t(0), t(1), t(2)])
    );
}

#[test]
fn set_disequal_is_idempotent() {
    let mut region = region_with(&[0, 1], &[]);
    region.set_disequal(0, t(0), t(1), DiseqKind::Internal, true);
    region.set_disequal(0, t(0), t(1), DiseqKind::Internal, true);
    assert_eq!(region.total_disequalities(DiseqKind::Internal), 1);
    region.set_disequal(0, t(0), t(1), DiseqKind::Internal, false);
    region.set_disequal(0, t(0), t(1), DiseqKind::Internal, false);
    assert_eq!(region.total_disequalities(DiseqKind::Internal), 0);
}

#[test]
fn take_node_reclassifies_edges() {
    let mut a = region_with(&[0, 1], &[(0, 1)]);
    let mut b = region_with(&[2], &[]);
    a.set_disequal(0, t(1), t(2), DiseqKind::External, true);
    b.set_disequal(0, t(2), t(1), DiseqKind::External, true);

    b.take_node(1, &mut a, t(1));
    expect![[r#"
        reps 1, internal 0, external 1
        t0 | int | ext t1
    "#]]
    .assert_eq(&a.dbg_summary());
    expect![[r#"
        reps 2, internal 2, external 1
        t1 | int t2 | ext t0
        t2 | int t1 | ext
    "#]]
    .assert_eq(&b.dbg_summary());

    a.pop_to(0);
    b.pop_to(0);
    assert!(a.has_rep(t(1)) && !b.has_rep(t(1)));
    assert!(a.is_disequal(t(0), t(1), DiseqKind::Internal));
    assert!(b.is_disequal(t(2), t(1), DiseqKind::External));
}

#[test]
fn combine_turns_shared_edges_internal() {
    let config = Configuration::default();
    let mut a = region_with(&[0], &[]);
    let mut b = region_with(&[1], &[]);
    a.set_disequal(0, t(0), t(1), DiseqKind::External, true);
    b.set_disequal(0, t(1), t(0), DiseqKind::External, true);

    a.combine(1, &mut b);
    assert!(!b.valid());
    assert_eq!(a.num_reps(), 2);
    assert_eq!(a.total_disequalities(DiseqKind::External), 0);
    assert_eq!(
        a.check(1, Effort::Standard, 1, &config),
        Some(vec![t(0), t(1)])
    );

    a.pop_to(0);
    b.pop_to(0);
    assert!(b.valid());
    assert_eq!(a.num_reps(), 1);
}

#[test]
fn must_combine_on_external_degree() {
    let mut region = region_with(&[0, 1], &[]);
    region.set_disequal(0, t(0), t(5), DiseqKind::External, true);
    region.set_disequal(0, t(0), t(6), DiseqKind::External, true);
    assert!(region.get_must_combine(2, true));
    assert!(!region.get_must_combine(2, false));
    assert!(!region.get_must_combine(3, true));

    // Two nodes with one external edge each and one internal edge.
    let mut region = region_with(&[0, 1, 2], &[(0, 1)]);
    region.set_disequal(0, t(0), t(7), DiseqKind::External, true);
    region.set_disequal(0, t(1), t(8), DiseqKind::External, true);
    assert!(region.get_must_combine(2, true));
}

#[test]
fn no_search_without_regions_below_full_effort() {
    let config = Configuration {
        regions: false,
        ..Configuration::default()
    };
    let mut region = region_with(&[0, 1, 2], &[(0, 1), (1, 2)]);
    assert_eq!(region.check(0, Effort::Standard, 2, &config), None);
    assert_eq!(region.test_clique().count(), 0);
    assert_eq!(region.check(0, Effort::Full, 2, &config), None);
    assert_eq!(region.splits().collect::<Vec<_>>(), vec![(t(0), t(2))]);
}
