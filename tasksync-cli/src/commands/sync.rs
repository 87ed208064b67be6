//! `tasksync sync` — the full fetch/diff/apply run.

use anyhow::Result;
use clap::Args;

use tasksync_engine::{pipeline, Action, RunReport};

use crate::commands::{build_adapters, home_dir, load_config};

/// Arguments for `tasksync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Compute and show the plan without applying it or writing the snapshot.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let adapters = build_adapters(&config)?;
        let home = home_dir()?;

        let report = pipeline::run(&home, &adapters.as_dyn(), self.dry_run)?;
        print_report(&report, self.dry_run);

        // Partial action failures are diagnostics, not an error exit: the
        // next run re-derives whatever was left unapplied.
        Ok(())
    }
}

fn print_report(report: &RunReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    if report.snapshot_recovered {
        eprintln!("warning: previous snapshot was unreadable; deletion detection is degraded");
    }
    for failure in &report.unavailable {
        eprintln!(
            "warning: {} unavailable ({}), treated as empty this run",
            failure.source, failure.reason
        );
    }

    let fetched: usize = report.counts.values().sum();
    if report.plan.is_empty() {
        println!("{prefix}✓ {fetched} records across 3 sources — nothing to do");
        return;
    }

    println!(
        "{prefix}✓ {fetched} records across 3 sources, {} action(s)",
        report.plan.total_actions()
    );
    for (source, actions) in &report.plan.actions {
        for action in actions {
            println!("  {source}: {}", describe(action));
        }
    }

    if let Some(dispatch) = &report.dispatch {
        println!(
            "{} applied, {} failed",
            dispatch.applied,
            dispatch.failures.len()
        );
        for failure in &dispatch.failures {
            eprintln!(
                "warning: {} rejected '{}': {}",
                failure.source, failure.description, failure.reason
            );
        }
    }
}

fn describe(action: &Action) -> String {
    match action {
        Action::MarkDone { description, .. } => format!("mark done '{description}'"),
        Action::Delete { description } => format!("delete '{description}'"),
    }
}
