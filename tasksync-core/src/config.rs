//! Runtime configuration.
//!
//! The environment is read exactly once, in `main`, through
//! [`Config::from_env`]; the resulting value is passed explicitly into
//! adapter constructors. Nothing else in the workspace reads environment
//! variables.

use std::path::PathBuf;

use crate::error::ConfigError;

/// `TASKSYNC_TODO_FILE` — path to the todo.txt file (required).
pub const TODO_FILE_VAR: &str = "TASKSYNC_TODO_FILE";
/// `TASKSYNC_TASK_BIN` — Taskwarrior binary to invoke (default `task`).
pub const TASK_BIN_VAR: &str = "TASKSYNC_TASK_BIN";
/// `TODOIST_API_TOKEN` — bearer token for the Todoist REST API (required).
pub const TODOIST_TOKEN_VAR: &str = "TODOIST_API_TOKEN";
/// `TASKSYNC_TODOIST_URL` — API base URL override, mainly for tests.
pub const TODOIST_URL_VAR: &str = "TASKSYNC_TODOIST_URL";

pub const DEFAULT_TASK_BIN: &str = "task";
pub const DEFAULT_TODOIST_URL: &str = "https://api.todoist.com/rest/v2";

/// Explicit configuration for one run. No ambient globals: adapters receive
/// the pieces they need at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    pub todo_file: PathBuf,
    pub task_bin: String,
    pub todoist_token: String,
    pub todoist_url: String,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Pure — no filesystem access;
    /// call [`Config::validate`] afterwards.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            todo_file: PathBuf::from(require(&lookup, TODO_FILE_VAR)?),
            task_bin: lookup(TASK_BIN_VAR)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_TASK_BIN.to_string()),
            todoist_token: require(&lookup, TODOIST_TOKEN_VAR)?,
            todoist_url: lookup(TODOIST_URL_VAR)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_TODOIST_URL.to_string()),
        })
    }

    /// Startup check: the todo file must exist before any fetch is attempted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.todo_file.exists() {
            return Err(ConfigError::TodoFileNotFound {
                path: self.todo_file.clone(),
            });
        }
        Ok(())
    }
}

fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar { name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn lookup_in(map: &HashMap<String, String>) -> impl Fn(&str) -> Option<String> + '_ {
        move |name| map.get(name).cloned()
    }

    #[test]
    fn minimal_configuration_applies_defaults() {
        let map = vars(&[
            (TODO_FILE_VAR, "/tmp/todo.txt"),
            (TODOIST_TOKEN_VAR, "secret"),
        ]);
        let config = Config::from_lookup(lookup_in(&map)).expect("config");
        assert_eq!(config.todo_file, PathBuf::from("/tmp/todo.txt"));
        assert_eq!(config.task_bin, DEFAULT_TASK_BIN);
        assert_eq!(config.todoist_url, DEFAULT_TODOIST_URL);
    }

    #[test]
    fn missing_todo_file_var_is_rejected() {
        let map = vars(&[(TODOIST_TOKEN_VAR, "secret")]);
        let err = Config::from_lookup(lookup_in(&map)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVar { name: TODO_FILE_VAR }
        ));
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let map = vars(&[(TODO_FILE_VAR, "/tmp/todo.txt"), (TODOIST_TOKEN_VAR, "")]);
        let err = Config::from_lookup(lookup_in(&map)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVar {
                name: TODOIST_TOKEN_VAR
            }
        ));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let map = vars(&[
            (TODO_FILE_VAR, "/tmp/todo.txt"),
            (TODOIST_TOKEN_VAR, "secret"),
            (TASK_BIN_VAR, "/opt/taskwarrior/bin/task"),
            (TODOIST_URL_VAR, "http://127.0.0.1:9999"),
        ]);
        let config = Config::from_lookup(lookup_in(&map)).expect("config");
        assert_eq!(config.task_bin, "/opt/taskwarrior/bin/task");
        assert_eq!(config.todoist_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn validate_requires_existing_todo_file() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("todo.txt");
        std::fs::write(&present, "").unwrap();

        let mut config = Config {
            todo_file: present,
            task_bin: DEFAULT_TASK_BIN.to_string(),
            todoist_token: "secret".to_string(),
            todoist_url: DEFAULT_TODOIST_URL.to_string(),
        };
        config.validate().expect("existing file passes");

        config.todo_file = dir.path().join("missing.txt");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::TodoFileNotFound { .. }));
    }
}
