//! CLI for blocvote: is that twelve points a vote or a favor?

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blocvote")]
#[command(about = "blocvote: Monte Carlo favoritism and collusion tests for point contests")]
#[command(version = blocvote_core::VERSION)]
struct Cli {
    /// JSON array of allocation records (period, channel, donor, recipient, points)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// JSON test config (num_trials, confidence_percentile, seed)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON object mapping name variants to canonical entity names
    #[arg(long, global = true)]
    aliases: Option<PathBuf>,

    /// First period with a secondary channel; earlier secondary records are dropped
    #[arg(long, global = true, default_value_t = blocvote_core::SECONDARY_CHANNEL_CUTOFF)]
    secondary_cutoff: u16,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the config file.
#[derive(clap::Args, Clone, Copy)]
struct TestArgs {
    /// Simulated trials per test
    #[arg(long)]
    trials: Option<usize>,

    /// Percentile of the null distribution the observed mean must exceed (0-100)
    #[arg(long)]
    percentile: Option<f64>,

    /// Base seed; drawn from the OS and printed when omitted
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-period participant counts and normalization basis
    Years,

    /// Test whether DONOR favors RECIPIENT over a period range
    Test {
        #[arg(long)]
        donor: String,

        #[arg(long)]
        recipient: String,

        /// First period (inclusive)
        #[arg(long)]
        from: u16,

        /// Last period (inclusive)
        #[arg(long)]
        to: u16,

        #[command(flatten)]
        test: TestArgs,

        /// Write the raw simulated trial means as JSON
        #[arg(long)]
        batch_output: Option<String>,

        /// Write the full report as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Test two entities for mutual favoritism
    Collude {
        #[arg(long)]
        a: String,

        #[arg(long)]
        b: String,

        #[arg(long)]
        from: u16,

        #[arg(long)]
        to: u16,

        #[command(flatten)]
        test: TestArgs,

        #[arg(long)]
        output: Option<String>,
    },

    /// Favoritism over every ordered entity pair, per period range.
    /// Ctrl+C stops between pairs.
    Matrix {
        /// Comma-separated ranges, e.g. 1975-1999,2000-2015,2016-2023
        #[arg(long)]
        ranges: String,

        /// Only list significant pairs
        #[arg(long)]
        sparse: bool,

        /// Worker threads (default: available parallelism)
        #[arg(long)]
        threads: Option<usize>,

        #[command(flatten)]
        test: TestArgs,

        #[arg(long)]
        output: Option<String>,
    },

    /// False-positive rate of the test on synthetic contests with no favoritism
    Calibrate {
        #[arg(long, default_value = "20")]
        participants: usize,

        #[arg(long, default_value = "5")]
        periods: usize,

        /// Synthetic contests to generate; every ordered pair of each is tested
        #[arg(long, default_value = "1")]
        experiments: usize,

        #[arg(long)]
        threads: Option<usize>,

        #[command(flatten)]
        test: TestArgs,

        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let inputs = commands::Inputs {
        data: cli.data.as_deref(),
        config: cli.config.as_deref(),
        aliases: cli.aliases.as_deref(),
        secondary_cutoff: cli.secondary_cutoff,
    };

    match cli.command {
        Commands::Years => commands::years::run(&inputs),
        Commands::Test {
            donor,
            recipient,
            from,
            to,
            test,
            batch_output,
            output,
        } => commands::test::run(commands::test::TestCommandConfig {
            inputs: &inputs,
            overrides: test.into(),
            donor: &donor,
            recipient: &recipient,
            from,
            to,
            batch_output: batch_output.as_deref(),
            output_path: output.as_deref(),
        }),
        Commands::Collude {
            a,
            b,
            from,
            to,
            test,
            output,
        } => commands::collude::run(
            &inputs,
            test.into(),
            &a,
            &b,
            from,
            to,
            output.as_deref(),
        ),
        Commands::Matrix {
            ranges,
            sparse,
            threads,
            test,
            output,
        } => commands::matrix::run(commands::matrix::MatrixCommandConfig {
            inputs: &inputs,
            overrides: test.into(),
            ranges: &ranges,
            sparse,
            threads,
            output_path: output.as_deref(),
        }),
        Commands::Calibrate {
            participants,
            periods,
            experiments,
            threads,
            test,
            output,
        } => commands::calibrate::run(commands::calibrate::CalibrateCommandConfig {
            inputs: &inputs,
            overrides: test.into(),
            participants,
            periods,
            experiments,
            threads,
            output_path: output.as_deref(),
        }),
    }
}

impl From<TestArgs> for commands::Overrides {
    fn from(a: TestArgs) -> Self {
        Self {
            trials: a.trials,
            percentile: a.percentile,
            seed: a.seed,
        }
    }
}
