//! `blocvote years`: per-period statistics.

use super::{Inputs, load_session};

pub fn run(inputs: &Inputs<'_>) {
    let session = load_session(inputs);
    let stats = session.year_stats();

    println!(
        "{:<8} {:>12} {:>10} {:>10}",
        "Period", "Participants", "Max pts", "Secondary"
    );
    println!("{}", "─".repeat(44));
    for s in stats.iter() {
        println!(
            "{:<8} {:>12} {:>10} {:>10}",
            s.period,
            s.participant_count,
            s.max_points_receivable,
            if s.has_secondary_channel { "yes" } else { "no" }
        );
    }
    println!();
    println!(
        "{} periods, {} entities, {} normalized records",
        stats.len(),
        session.entities().len(),
        session.records().len()
    );
}
