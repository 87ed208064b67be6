//! `tasksync status` — source visibility without side effects.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tasksync_core::Source;
use tasksync_engine::{pipeline, snapshot, RunReport};

use crate::commands::{build_adapters, home_dir, load_config};

/// Arguments for `tasksync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let adapters = build_adapters(&config)?;
        let home = home_dir()?;

        // A dry run: fetch and plan, never apply or persist.
        let report = pipeline::run(&home, &adapters.as_dyn(), true)?;
        let (previous, _) = snapshot::load_or_empty_at(&home);

        if self.json {
            let json = StatusJson::build(&report, previous.synced_at);
            println!("{}", serde_json::to_string_pretty(&json)?);
            return Ok(());
        }

        print_table(&report);
        match previous.synced_at {
            Some(at) => println!("last sync: {} ago", format_age(at)),
            None => println!("last sync: never"),
        }
        let pending = report.plan.total_actions();
        if pending == 0 {
            println!("{}", "in sync — no pending actions".green());
        } else {
            println!("{}", format!("{pending} pending action(s)").yellow());
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "records")]
    records: usize,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "pending")]
    pending: usize,
}

fn print_table(report: &RunReport) {
    let rows: Vec<SourceRow> = Source::ALL
        .iter()
        .map(|source| {
            let down = report.unavailable.iter().any(|f| f.source == *source);
            SourceRow {
                source: source.to_string(),
                records: report.counts.get(source).copied().unwrap_or(0),
                state: if down {
                    "unavailable".red().to_string()
                } else {
                    "ok".green().to_string()
                },
                pending: report
                    .plan
                    .actions
                    .get(source)
                    .map(Vec::len)
                    .unwrap_or(0),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}");
}

#[derive(Serialize)]
struct StatusJson {
    last_synced_at: Option<DateTime<Utc>>,
    sources: Vec<SourceJson>,
    pending_actions: usize,
}

#[derive(Serialize)]
struct SourceJson {
    source: Source,
    records: usize,
    available: bool,
    pending: usize,
}

impl StatusJson {
    fn build(report: &RunReport, last_synced_at: Option<DateTime<Utc>>) -> Self {
        let sources = Source::ALL
            .iter()
            .map(|source| SourceJson {
                source: *source,
                records: report.counts.get(source).copied().unwrap_or(0),
                available: !report.unavailable.iter().any(|f| f.source == *source),
                pending: report
                    .plan
                    .actions
                    .get(source)
                    .map(Vec::len)
                    .unwrap_or(0),
            })
            .collect();
        Self {
            last_synced_at,
            sources,
            pending_actions: report.plan.total_actions(),
        }
    }
}

fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_buckets() {
        let now = Utc::now();
        assert_eq!(format_age(now), "0s");
        assert_eq!(format_age(now - chrono::Duration::minutes(5)), "5m");
        assert_eq!(format_age(now - chrono::Duration::hours(3)), "3h");
        assert_eq!(format_age(now - chrono::Duration::days(2)), "2d");
    }
}
