pub mod calibrate;
pub mod collude;
pub mod matrix;
pub mod test;
pub mod years;

use std::fmt::Display;
use std::path::Path;

use blocvote_core::{
    AllocationRecord, AnalysisSession, Entity, EntityAliases, Period, PeriodRange, QueryError,
    RecordNormalizer, TestConfig,
};

/// Input files shared by every command.
pub struct Inputs<'a> {
    pub data: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub aliases: Option<&'a Path>,
    pub secondary_cutoff: Period,
}

/// Command-line overrides of the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub trials: Option<usize>,
    pub percentile: Option<f64>,
    pub seed: Option<u64>,
}

/// Print `context: e` to stderr and exit with status 1.
pub fn fail(context: &str, e: impl Display) -> ! {
    eprintln!("Error {context}: {e}");
    std::process::exit(1);
}

/// Unwrap `r` or [`fail`].
pub fn or_exit<T, E: Display>(r: Result<T, E>, context: &str) -> T {
    match r {
        Ok(v) => v,
        Err(e) => fail(context, e),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("{}: {e}", path.display()))
}

/// Load the record file and aliases into a frozen session.
pub fn load_session(inputs: &Inputs<'_>) -> AnalysisSession {
    let Some(data) = inputs.data else {
        fail("loading data", "--data FILE is required for this command");
    };
    let records: Vec<AllocationRecord> = or_exit(read_json(data), "reading records");
    let aliases: EntityAliases = match inputs.aliases {
        Some(path) => or_exit(read_json(path), "reading aliases"),
        None => EntityAliases::new(),
    };
    log::info!(
        "loaded {} records and {} aliases from {}",
        records.len(),
        aliases.len(),
        data.display()
    );
    let normalizer = RecordNormalizer::new()
        .with_cutoff(inputs.secondary_cutoff)
        .with_aliases(aliases);
    or_exit(
        AnalysisSession::from_records(&records, &normalizer),
        "building session",
    )
}

/// Config file, then overrides, then a fresh OS seed if none was given.
pub fn resolve_config(inputs: &Inputs<'_>, overrides: Overrides) -> TestConfig {
    let mut config = match inputs.config {
        Some(path) => or_exit(TestConfig::load_from_path(path), "loading config"),
        None => TestConfig::default(),
    };
    if let Some(n) = overrides.trials {
        config.num_trials = n;
    }
    if let Some(p) = overrides.percentile {
        config.confidence_percentile = p;
    }
    if overrides.seed.is_some() {
        config.seed = overrides.seed;
    }
    or_exit(config.validate(), "in config");
    if config.seed.is_none() {
        let seed = or_exit(draw_seed(), "drawing seed");
        log::info!("no seed configured, drew {seed}");
        config.seed = Some(seed);
    }
    config
}

fn draw_seed() -> Result<u64, getrandom::Error> {
    let mut buf = [0u8; 8];
    getrandom::fill(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Exact or case-insensitive entity lookup.
pub fn resolve_entity(session: &AnalysisSession, name: &str) -> Result<Entity, QueryError> {
    session
        .find_entity(name)
        .ok_or_else(|| QueryError::UnknownEntity(name.to_string()))
}

pub fn parse_range(from: Period, to: Period) -> PeriodRange {
    or_exit(PeriodRange::new(from, to), "in period range")
}

/// Pretty-print `value` to `path`.
pub fn write_json(value: &impl serde::Serialize, path: &str, label: &str) {
    let json = or_exit(serde_json::to_string_pretty(value), "serializing report");
    match std::fs::write(path, json) {
        Ok(()) => println!("\n{label} written to {path}"),
        Err(e) => fail(&format!("writing {path}"), e),
    }
}

/// Fresh identifier stamped on every JSON report.
pub fn run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
