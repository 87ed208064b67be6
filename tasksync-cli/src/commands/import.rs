//! `tasksync import` — membership propagation between Taskwarrior and Todoist.
//!
//! Unlike `sync`, which only corrects completion and deletion, import copies
//! open tasks that exist in exactly one of the two managed stores into the
//! other. The todo.txt file is left alone; it is treated as the manually
//! curated source.

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use clap::Args;

use tasksync_adapters::SourceAdapter;
use tasksync_core::{Description, TaskRecord};

use crate::commands::{build_adapters, load_config};

/// Arguments for `tasksync import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// List the tasks that would be copied without creating anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let adapters = build_adapters(&config)?;

        // Import needs both stores; a missing side would copy everything
        // one way, so an unreachable store aborts here.
        let tw_records = adapters.taskwarrior.fetch()?;
        let td_records = adapters.todoist.fetch()?;

        let mut copied = 0usize;
        let mut failures = Vec::new();
        for (records, into) in [
            (
                missing_from(&tw_records, &td_records),
                &adapters.todoist as &dyn SourceAdapter,
            ),
            (
                missing_from(&td_records, &tw_records),
                &adapters.taskwarrior as &dyn SourceAdapter,
            ),
        ] {
            for record in records {
                if self.dry_run {
                    println!("[dry-run] would add '{}' to {}", record.description, into.source());
                    continue;
                }
                match into.add(record) {
                    Ok(()) => {
                        println!("added '{}' to {}", record.description, into.source());
                        copied += 1;
                    }
                    Err(e) => failures.push(e.to_string()),
                }
            }
        }

        if !self.dry_run {
            println!("import complete: {copied} task(s) copied");
        }
        for failure in &failures {
            eprintln!("warning: {failure}");
        }
        if !failures.is_empty() && copied == 0 {
            return Err(anyhow!("import failed: no task could be copied"));
        }
        Ok(())
    }
}

/// Open records of `from` whose description does not occur in `other`.
fn missing_from<'a>(from: &'a [TaskRecord], other: &[TaskRecord]) -> Vec<&'a TaskRecord> {
    let known: BTreeSet<&Description> = other.iter().map(|r| &r.description).collect();
    let mut seen = BTreeSet::new();
    from.iter()
        .filter(|r| !r.is_completed)
        .filter(|r| !known.contains(&r.description))
        .filter(|r| seen.insert(r.description.clone()))
        .collect()
}
