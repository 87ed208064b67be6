//! Subcommand implementations plus the wiring shared between them.

pub mod import;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

use tasksync_adapters::{SourceAdapter, TaskwarriorAdapter, TodoTxtAdapter, TodoistAdapter};
use tasksync_core::Config;

/// The three concrete adapters, built once per invocation.
pub struct Adapters {
    pub todo: TodoTxtAdapter,
    pub taskwarrior: TaskwarriorAdapter,
    pub todoist: TodoistAdapter,
}

impl Adapters {
    pub fn as_dyn(&self) -> [&dyn SourceAdapter; 3] {
        [&self.todo, &self.taskwarrior, &self.todoist]
    }
}

/// Read and check configuration. Any failure here is a startup failure and
/// aborts with a non-zero exit before any store is touched.
pub fn load_config() -> Result<Config> {
    let config = Config::from_env().context("incomplete configuration")?;
    config.validate().context("configuration check failed")?;
    Ok(config)
}

pub fn build_adapters(config: &Config) -> Result<Adapters> {
    Ok(Adapters {
        todo: TodoTxtAdapter::new(config.todo_file.clone())
            .context("cannot open the todo.txt source")?,
        taskwarrior: TaskwarriorAdapter::new(config.task_bin.clone()),
        todoist: TodoistAdapter::new(config.todoist_url.clone(), config.todoist_token.clone()),
    })
}

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}
