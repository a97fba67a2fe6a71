//! `blocvote test`: one donor → recipient favoritism test.

use blocvote_core::{FavoritismReport, FavoritismResult, FavoritismTester, Period};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use super::{Inputs, Overrides, load_session, or_exit, parse_range, resolve_config, resolve_entity};

pub struct TestCommandConfig<'a> {
    pub inputs: &'a Inputs<'a>,
    pub overrides: Overrides,
    pub donor: &'a str,
    pub recipient: &'a str,
    pub from: Period,
    pub to: Period,
    pub batch_output: Option<&'a str>,
    pub output_path: Option<&'a str>,
}

#[derive(Serialize)]
struct TestOutput<'a> {
    run_id: String,
    seed: u64,
    num_trials: usize,
    confidence_percentile: f64,
    #[serde(flatten)]
    report: &'a FavoritismReport,
}

pub fn run(cfg: TestCommandConfig<'_>) {
    let session = load_session(cfg.inputs);
    let config = resolve_config(cfg.inputs, cfg.overrides);
    let range = parse_range(cfg.from, cfg.to);
    let donor = or_exit(resolve_entity(&session, cfg.donor), "resolving donor");
    let recipient = or_exit(resolve_entity(&session, cfg.recipient), "resolving recipient");

    let tester = or_exit(FavoritismTester::new(&session, config), "in config");
    let seed = config.seed.unwrap_or_default();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut report = or_exit(
        tester.test_detailed(&donor, &recipient, range, cfg.batch_output.is_some(), &mut rng),
        "running test",
    );

    println!("{donor} → {recipient}, {range}");
    println!("  Trials:      {}", config.num_trials);
    println!("  Percentile:  {}", config.confidence_percentile);
    println!("  Seed:        {seed}");
    print_report(&report);

    if let Some(path) = cfg.batch_output {
        let batch = report.batch.take().unwrap_or_default();
        super::write_json(&batch, path, "Simulated trial means");
    }
    if let Some(path) = cfg.output_path {
        let out = TestOutput {
            run_id: super::run_id(),
            seed,
            num_trials: config.num_trials,
            confidence_percentile: config.confidence_percentile,
            report: &report,
        };
        super::write_json(&out, path, "Report");
    }
}

fn print_report(report: &FavoritismReport) {
    if report.result == FavoritismResult::NoData {
        println!();
        println!("  Result:      no data (donor never allocated to recipient in range)");
        return;
    }
    let span: Vec<String> = report.applicable_span.iter().map(|p| p.to_string()).collect();
    println!("  Span:        {} ({})", span.len(), span.join(", "));
    if let Some(mean) = report.observed_mean {
        println!("  Observed:    {mean:.4}");
    }
    if let Some(threshold) = report.threshold_value {
        match report.threshold_interval {
            Some((lo, hi)) => println!("  Threshold:   {threshold:.4}  [{lo:.4}, {hi:.4}]"),
            None => println!("  Threshold:   {threshold:.4}"),
        }
    }
    if let Some(p) = report.p_value {
        println!("  p-value:     {p:.5}");
    }
    if let Some(summary) = &report.null_summary {
        println!(
            "  Null:        mean {:.4}  sd {:.4}  median {:.4}",
            summary.mean, summary.std_dev, summary.median
        );
    }
    println!();
    let verdict = if report.result.is_significant() {
        "SIGNIFICANT"
    } else {
        "not significant"
    };
    println!("  Result:      {verdict}");
}
