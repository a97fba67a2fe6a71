//! `blocvote collude`: mutual favoritism between two entities.

use blocvote_core::{CollusionReport, CollusionTester, Period};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use super::{Inputs, Overrides, load_session, or_exit, parse_range, resolve_config, resolve_entity};

#[derive(Serialize)]
struct CollusionOutput<'a> {
    run_id: String,
    seed: u64,
    collusive: bool,
    #[serde(flatten)]
    report: &'a CollusionReport,
}

pub fn run(
    inputs: &Inputs<'_>,
    overrides: Overrides,
    a: &str,
    b: &str,
    from: Period,
    to: Period,
    output_path: Option<&str>,
) {
    let session = load_session(inputs);
    let config = resolve_config(inputs, overrides);
    let range = parse_range(from, to);
    let x = or_exit(resolve_entity(&session, a), "resolving entity");
    let y = or_exit(resolve_entity(&session, b), "resolving entity");

    let tester = or_exit(CollusionTester::new(&session, config), "in config");
    let seed = config.seed.unwrap_or_default();
    let mut rng = StdRng::seed_from_u64(seed);
    let report = or_exit(
        tester.test_detailed(&x, &y, range, &mut rng),
        "running collusion test",
    );

    println!("{} ↔ {}, {range} (seed {seed})", report.first, report.second);
    println!("  {} → {}: {}", report.first, report.second, report.forward);
    println!("  {} → {}: {}", report.second, report.first, report.backward);
    println!();
    let collusive = report.is_collusive();
    println!(
        "  Result: {}",
        if collusive { "COLLUSIVE" } else { "not collusive" }
    );

    if let Some(path) = output_path {
        let out = CollusionOutput {
            run_id: super::run_id(),
            seed,
            collusive,
            report: &report,
        };
        super::write_json(&out, path, "Report");
    }
}
