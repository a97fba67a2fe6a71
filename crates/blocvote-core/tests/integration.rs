//! Integration tests for blocvote-core.
//!
//! These tests exercise the full pipeline:
//! records → session → favoritism → collusion → matrix.

use blocvote_core::{
    AllocationRecord, AnalysisSession, Channel, CollusionTester, FavoritismResult,
    FavoritismTester, MatrixCompiler, MatrixOptions, PeriodRange, RecordNormalizer,
    SyntheticContest, TestConfig,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn session_from(contest: &SyntheticContest, seed: u64) -> AnalysisSession {
    let mut rng = StdRng::seed_from_u64(seed);
    let records = contest.generate(&mut rng);
    AnalysisSession::from_records(&records, &RecordNormalizer::new()).unwrap()
}

#[test]
fn max_basis_bounds_every_record() {
    let contest = SyntheticContest::new(15, 4)
        .starting_at(2016)
        .with_secondary_channel()
        .with_favor(3, 7);
    let session = session_from(&contest, 1);
    for r in session.records() {
        let stats = session.year_stats().get(r.period()).unwrap();
        assert!(stats.max_points_receivable >= r.combined.points_total());
        assert!(
            (0.0..=1.0).contains(&r.points_total_pct),
            "pct {} out of range",
            r.points_total_pct
        );
    }
    let s = session.year_stats().get(2017).unwrap();
    assert_eq!(s.participant_count, 15);
    assert_eq!(s.max_points_receivable, 24);
    assert!(s.has_secondary_channel);
}

#[test]
fn twenty_participants_all_twelves_is_significant() {
    let contest = SyntheticContest::new(20, 5).with_favor(0, 1);
    let session = session_from(&contest, 2);
    let tester = FavoritismTester::new(&session, TestConfig::default()).unwrap();
    let range = PeriodRange::new(2000, 2004).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let result = tester
        .test(
            &SyntheticContest::entity(0),
            &SyntheticContest::entity(1),
            range,
            &mut rng,
        )
        .unwrap();
    match result {
        FavoritismResult::Significant {
            observed_mean,
            threshold_value,
        } => {
            assert!((observed_mean - 12.0 / 12.0).abs() < 1e-12);
            assert!(threshold_value < 0.6);
        }
        other => panic!("expected significant, got {other:?}"),
    }
}

#[test]
fn reflexive_test_is_always_no_data() {
    let contest = SyntheticContest::new(10, 3).with_favor(4, 4);
    let session = session_from(&contest, 4);
    let tester = FavoritismTester::new(&session, TestConfig::default().with_trials(1000)).unwrap();
    let range = PeriodRange::new(2000, 2002).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    for i in 0..10 {
        let e = SyntheticContest::entity(i);
        assert_eq!(
            tester.test(&e, &e, range, &mut rng).unwrap(),
            FavoritismResult::NoData
        );
    }
}

#[test]
fn never_allocating_is_no_data() {
    let records = vec![
        AllocationRecord::new(2001, Channel::Primary, "A", "B", 12),
        AllocationRecord::new(2001, Channel::Primary, "B", "A", 12),
        AllocationRecord::new(2001, Channel::Primary, "C", "A", 12),
        AllocationRecord::new(2002, Channel::Primary, "A", "C", 12),
    ];
    let session = AnalysisSession::from_records(&records, &RecordNormalizer::new()).unwrap();
    let tester = FavoritismTester::new(&session, TestConfig::default().with_trials(1000)).unwrap();
    let mut rng = StdRng::seed_from_u64(6);
    let result = tester
        .test(
            &"A".into(),
            &"C".into(),
            PeriodRange::single(2001),
            &mut rng,
        )
        .unwrap();
    assert_eq!(result, FavoritismResult::NoData);
}

#[test]
fn null_donors_reject_at_about_nominal_rate() {
    // Every donor follows the null model, so each ordered pair is one
    // experiment with a nominal 5% false-positive rate.
    let contest = SyntheticContest::new(20, 5);
    let session = session_from(&contest, 7);
    let options = MatrixOptions {
        config: TestConfig::default().with_trials(4000).with_seed(8),
        worker_threads: 4,
    };
    let matrix = MatrixCompiler::new(&session, options)
        .unwrap()
        .compile(PeriodRange::new(2000, 2004).unwrap())
        .unwrap();
    let total = 20 * 19;
    let rate = matrix.significant_count() as f64 / total as f64;
    let check = blocvote_stats::false_positive_check(
        matrix.significant_count() as u64,
        total as u64,
        0.05,
    );
    assert!(
        (0.01..=0.09).contains(&rate),
        "false-positive rate {rate:.3} ({})",
        check.details
    );
}

#[test]
fn collusion_requires_both_directions_and_is_symmetric() {
    let contest = SyntheticContest::new(16, 6)
        .with_favor(2, 9)
        .with_favor(9, 2)
        .with_favor(5, 7);
    let session = session_from(&contest, 9);
    let tester =
        CollusionTester::new(&session, TestConfig::default().with_trials(10_000)).unwrap();
    let range = PeriodRange::new(2000, 2005).unwrap();
    let e = SyntheticContest::entity;

    let mut rng = StdRng::seed_from_u64(10);
    assert!(tester.test(&e(2), &e(9), range, &mut rng).unwrap());
    assert!(!tester.test(&e(5), &e(7), range, &mut rng).unwrap());

    for (a, b) in [(2, 9), (5, 7), (1, 3), (0, 15)] {
        let ab = tester
            .test(&e(a), &e(b), range, &mut StdRng::seed_from_u64(11))
            .unwrap();
        let ba = tester
            .test(&e(b), &e(a), range, &mut StdRng::seed_from_u64(11))
            .unwrap();
        assert_eq!(ab, ba);
    }
}

#[test]
fn matrix_recovers_planted_favors() {
    let contest = SyntheticContest::new(12, 8)
        .starting_at(2016)
        .with_secondary_channel()
        .with_favor(0, 1)
        .with_favor(1, 0)
        .with_favor(3, 10);
    let session = session_from(&contest, 12);
    let options = MatrixOptions {
        config: TestConfig::default().with_trials(5000).with_seed(13),
        worker_threads: 3,
    };
    let compiler = MatrixCompiler::new(&session, options).unwrap();
    let range = PeriodRange::new(2016, 2023).unwrap();
    let matrix = compiler.compile(range).unwrap();
    let e = SyntheticContest::entity;
    assert_eq!(matrix.get(&e(0), &e(1)), Some(true));
    assert_eq!(matrix.get(&e(1), &e(0)), Some(true));
    assert_eq!(matrix.get(&e(3), &e(10)), Some(true));
    assert!(matrix.collusive_pairs().contains(&(e(0), e(1))));

    let sparse = compiler.compile_sparse(range).unwrap();
    assert_eq!(sparse.len(), matrix.significant_count());
}
