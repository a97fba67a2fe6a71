//! `blocvote calibrate`: false-positive rate on synthetic null contests.
//!
//! Every synthetic donor ranks the others by a uniform random permutation, so
//! each tested pair is an experiment in which the test should reject at about
//! `1 - percentile / 100`.

use blocvote_core::{
    AnalysisSession, MatrixCompiler, MatrixOptions, PeriodRange, RecordNormalizer,
    SyntheticContest,
};
use blocvote_stats::{CheckResult, false_positive_check};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use super::{Inputs, Overrides, fail, or_exit, resolve_config};

pub struct CalibrateCommandConfig<'a> {
    pub inputs: &'a Inputs<'a>,
    pub overrides: Overrides,
    pub participants: usize,
    pub periods: usize,
    pub experiments: usize,
    pub threads: Option<usize>,
    pub output_path: Option<&'a str>,
}

#[derive(Serialize)]
struct ExperimentOutput {
    experiment: usize,
    pairs: usize,
    rejections: usize,
}

#[derive(Serialize)]
struct CalibrationOutput {
    run_id: String,
    seed: u64,
    participants: usize,
    periods: usize,
    num_trials: usize,
    confidence_percentile: f64,
    experiments: Vec<ExperimentOutput>,
    check: CheckResult,
}

pub fn run(cfg: CalibrateCommandConfig<'_>) {
    if cfg.participants < 2 || cfg.periods == 0 || cfg.experiments == 0 {
        fail(
            "in calibration",
            "need at least 2 participants, 1 period and 1 experiment",
        );
    }
    let config = resolve_config(cfg.inputs, cfg.overrides);
    let seed = config.seed.unwrap_or_default();
    let nominal = 1.0 - config.confidence_percentile / 100.0;

    let contest = SyntheticContest::new(cfg.participants, cfg.periods);
    let periods: Vec<_> = contest.periods().collect();
    let (Some(&first), Some(&last)) = (periods.first(), periods.last()) else {
        fail("in calibration", "empty period span");
    };
    let range = or_exit(PeriodRange::new(first, last), "in calibration");

    println!("Calibration");
    println!(
        "  Contest:     {} participants × {} periods ({range})",
        cfg.participants, cfg.periods
    );
    println!("  Experiments: {}", cfg.experiments);
    println!("  Trials:      {}", config.num_trials);
    println!("  Nominal:     {:.2}%", nominal * 100.0);
    println!("  Seed:        {seed}");
    println!();

    let mut experiments = Vec::with_capacity(cfg.experiments);
    for i in 0..cfg.experiments {
        let experiment_seed = seed.wrapping_add(i as u64);
        let mut rng = StdRng::seed_from_u64(experiment_seed);
        let records = contest.generate(&mut rng);
        let session = or_exit(
            AnalysisSession::from_records(&records, &RecordNormalizer::new()),
            "building synthetic session",
        );

        let mut options = MatrixOptions {
            config: config.with_seed(experiment_seed),
            ..MatrixOptions::default()
        };
        if let Some(n) = cfg.threads {
            options.worker_threads = n;
        }
        let compiler = or_exit(MatrixCompiler::new(&session, options), "in config");
        let matrix = or_exit(compiler.compile(range), "compiling matrix");

        let pairs = cfg.participants * (cfg.participants - 1);
        let rejections = matrix.significant_count();
        println!(
            "  #{:<4} {rejections:>5}/{pairs:<5} rejected ({:.2}%)",
            i + 1,
            rejections as f64 / pairs as f64 * 100.0
        );
        experiments.push(ExperimentOutput {
            experiment: i + 1,
            pairs,
            rejections,
        });
    }

    let total_pairs: usize = experiments.iter().map(|e| e.pairs).sum();
    let total_rejections: usize = experiments.iter().map(|e| e.rejections).sum();
    let check = false_positive_check(total_rejections as u64, total_pairs as u64, nominal);

    println!();
    println!(
        "  {}: {}  p={}  grade {}  {}",
        check.name,
        check.details,
        check
            .p_value
            .map_or_else(|| "n/a".to_string(), |p| format!("{p:.4}")),
        check.grade,
        if check.passed { "PASS" } else { "FAIL" }
    );

    if let Some(path) = cfg.output_path {
        let report = CalibrationOutput {
            run_id: super::run_id(),
            seed,
            participants: cfg.participants,
            periods: cfg.periods,
            num_trials: config.num_trials,
            confidence_percentile: config.confidence_percentile,
            experiments,
            check,
        };
        super::write_json(&report, path, "Calibration report");
    }
}
