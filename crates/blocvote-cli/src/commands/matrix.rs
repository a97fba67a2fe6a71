//! `blocvote matrix`: favoritism over every ordered pair, per period range.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use blocvote_core::{
    Entity, Error, FavoritismMatrix, MatrixCompiler, MatrixOptions, MatrixProgress, PeriodRange,
    SignificantPair,
};
use serde::Serialize;

use super::{Inputs, Overrides, fail, load_session, or_exit, resolve_config};

pub struct MatrixCommandConfig<'a> {
    pub inputs: &'a Inputs<'a>,
    pub overrides: Overrides,
    pub ranges: &'a str,
    pub sparse: bool,
    pub threads: Option<usize>,
    pub output_path: Option<&'a str>,
}

#[derive(Serialize)]
struct RangeOutput {
    range: PeriodRange,
    entities: usize,
    significant: Vec<SignificantPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collusive: Option<Vec<(Entity, Entity)>>,
    /// Dense rows, `rows[i][j]` for `order[i] → order[j]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<Vec<Entity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<Vec<bool>>>,
}

#[derive(Serialize)]
struct MatrixOutput {
    run_id: String,
    seed: u64,
    num_trials: usize,
    confidence_percentile: f64,
    ranges: Vec<RangeOutput>,
}

pub fn run(cfg: MatrixCommandConfig<'_>) {
    let ranges = or_exit(PeriodRange::parse_list(cfg.ranges), "parsing --ranges");
    let session = load_session(cfg.inputs);
    let config = resolve_config(cfg.inputs, cfg.overrides);
    let mut options = MatrixOptions {
        config,
        ..MatrixOptions::default()
    };
    if let Some(n) = cfg.threads {
        options.worker_threads = n;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let c = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || c.store(true, Ordering::SeqCst)) {
        log::warn!("Ctrl+C handler unavailable: {e}");
    }

    let progress = |p: &MatrixProgress<'_>| {
        if p.completed % 50 == 0 || p.completed == p.total {
            eprint!("\r  {}: {}/{} pairs", p.range, p.completed, p.total);
        }
        log::debug!("{} -> {}: {}", p.donor, p.recipient, p.result);
    };
    let compiler = or_exit(MatrixCompiler::new(&session, options), "in config")
        .with_progress(&progress)
        .with_cancel(cancel);

    let seed = config.seed.unwrap_or_default();
    println!("Favoritism matrix");
    println!("  Ranges:      {}", join(&ranges));
    println!("  Trials:      {}", config.num_trials);
    println!("  Percentile:  {}", config.confidence_percentile);
    println!("  Workers:     {}", options.worker_threads.max(1));
    println!("  Seed:        {seed}");
    println!();

    let mut outputs = Vec::with_capacity(ranges.len());
    for range in ranges {
        let start = Instant::now();
        let out = if cfg.sparse {
            let significant = check_cancel(compiler.compile_sparse(range));
            eprintln!();
            RangeOutput {
                range,
                entities: session.entities_in(range).len(),
                significant,
                collusive: None,
                order: None,
                rows: None,
            }
        } else {
            let matrix = check_cancel(compiler.compile(range));
            eprintln!();
            dense_output(&matrix)
        };
        print_range(&out, start.elapsed().as_secs_f64());
        outputs.push(out);
    }

    if let Some(path) = cfg.output_path {
        let report = MatrixOutput {
            run_id: super::run_id(),
            seed,
            num_trials: config.num_trials,
            confidence_percentile: config.confidence_percentile,
            ranges: outputs,
        };
        super::write_json(&report, path, "Matrix report");
    }
}

fn check_cancel<T>(r: Result<T, Error>) -> T {
    match r {
        Ok(v) => v,
        Err(Error::Cancelled { completed, total }) => {
            eprintln!();
            eprintln!("Interrupted after {completed}/{total} pairs; no results written.");
            std::process::exit(130);
        }
        Err(e) => fail("compiling matrix", e),
    }
}

fn dense_output(matrix: &FavoritismMatrix) -> RangeOutput {
    let rows = matrix
        .entities()
        .iter()
        .filter_map(|e| matrix.row(e).map(<[bool]>::to_vec))
        .collect();
    RangeOutput {
        range: matrix.range(),
        entities: matrix.entities().len(),
        significant: matrix.significant().to_vec(),
        collusive: Some(matrix.collusive_pairs()),
        order: Some(matrix.entities().to_vec()),
        rows: Some(rows),
    }
}

fn print_range(out: &RangeOutput, elapsed: f64) {
    println!(
        "{}: {} entities, {} significant pairs ({elapsed:.1}s)",
        out.range,
        out.entities,
        out.significant.len()
    );
    if !out.significant.is_empty() {
        println!(
            "  {:<24} {:<24} {:>9} {:>10}",
            "Donor", "Recipient", "Observed", "Threshold"
        );
        for p in &out.significant {
            println!(
                "  {:<24} {:<24} {:>9.4} {:>10.4}",
                p.donor.as_str(),
                p.recipient.as_str(),
                p.observed_mean,
                p.threshold_value
            );
        }
    }
    if let Some(collusive) = &out.collusive
        && !collusive.is_empty()
    {
        println!("  Collusive:");
        for (a, b) in collusive {
            println!("    {a} ↔ {b}");
        }
    }
    println!();
}

fn join(ranges: &[PeriodRange]) -> String {
    ranges
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
