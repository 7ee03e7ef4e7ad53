// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_GROUP_THREADS, FALLBACK_WORKER_THREADS};
use crate::errors::{ConfigError, FailureStrategy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Scheduler configuration.
///
/// Describes the worker pool behind a [`Scheduler`](crate::engine::Scheduler):
/// how many threads serve the default `any` lane, which named lanes exist and
/// what a task failure does to the scheduler. Usually loaded from a YAML or
/// TOML file.
///
/// # Fields
/// * `threads` - Workers of the `any` lane (optional, defaults to the available parallelism)
/// * `failure_strategy` - Reaction to a panicking task (optional, defaults to `abort_run`)
/// * `thread_groups` - Named lanes with their own workers (optional)
/// * `stall_timeout_ms` - How long a run may sit idle waiting for an external
///   write before it fails as stalled (optional, waits indefinitely if absent)
///
/// # Example
/// ```yaml
/// threads: 4
/// failure_strategy: terminate_scheduler
/// stall_timeout_ms: 500
/// thread_groups:
///   - name: io
///     threads: 2
///   - name: gpu
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
    #[serde(default)]
    pub thread_groups: Vec<ThreadGroupConfig>,
    #[serde(default)]
    pub stall_timeout_ms: Option<u64>,
}

/// A named lane and the number of workers serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadGroupConfig {
    pub name: String,
    #[serde(default = "default_group_threads")]
    pub threads: usize,
}

fn default_group_threads() -> usize {
    DEFAULT_GROUP_THREADS
}

impl SchedulerConfig {
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            ..Self::default()
        }
    }

    pub fn with_failure_strategy(mut self, strategy: FailureStrategy) -> Self {
        self.failure_strategy = strategy;
        self
    }

    pub fn with_thread_group(mut self, name: impl Into<String>, threads: usize) -> Self {
        self.thread_groups.push(ThreadGroupConfig {
            name: name.into(),
            threads,
        });
        self
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout_ms.map(Duration::from_millis)
    }

    /// Workers of the `any` lane.
    pub fn worker_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_WORKER_THREADS)
        })
    }
}

pub fn parse_yaml(content: &str) -> Result<SchedulerConfig, ConfigError> {
    Ok(serde_yaml::from_str(content)?)
}

pub fn parse_toml(content: &str) -> Result<SchedulerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Reads a configuration file, choosing the format from its extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SchedulerConfig, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    let parse: fn(&str) -> Result<SchedulerConfig, ConfigError> = match extension.as_deref() {
        Some("yaml") | Some("yml") => parse_yaml,
        Some("toml") => parse_toml,
        _ => {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}

pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<SchedulerConfig, ConfigError> {
    let cfg = load_config(path)?;

    if let Err(validation_errors) = crate::config::validate_config(&cfg) {
        let error_messages: Vec<String> = validation_errors.iter().map(|e| e.to_string()).collect();
        return Err(ConfigError::Invalid(format!(
            "Configuration validation failed:\n{}",
            error_messages.join("\n")
        )));
    }

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_basic_yaml() {
        let yaml = r#"
threads: 3
failure_strategy: terminate_scheduler
thread_groups:
  - name: io
    threads: 2
  - name: gpu
"#;

        let cfg = parse_yaml(yaml).unwrap();
        assert_eq!(cfg.threads, Some(3));
        assert_eq!(cfg.failure_strategy, FailureStrategy::TerminateScheduler);
        assert_eq!(cfg.thread_groups.len(), 2);
        assert_eq!(cfg.thread_groups[1].threads, DEFAULT_GROUP_THREADS);
        assert_eq!(cfg.stall_timeout(), None);
    }

    #[test]
    fn test_stall_timeout_is_in_milliseconds() {
        let cfg = parse_yaml("stall_timeout_ms: 250\n").unwrap();
        assert_eq!(cfg.stall_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(
            SchedulerConfig::default().with_stall_timeout(Duration::from_secs(2)),
            parse_toml("stall_timeout_ms = 2000\n").unwrap()
        );
    }

    #[test]
    fn parse_basic_toml() {
        let toml = r#"
threads = 2

[[thread_groups]]
name = "io"
threads = 4
"#;

        let cfg = parse_toml(toml).unwrap();
        assert_eq!(cfg.worker_threads(), 2);
        assert_eq!(cfg.failure_strategy, FailureStrategy::AbortRun);
        assert_eq!(cfg.thread_groups[0].name, "io");
    }

    #[test]
    fn test_defaults_when_empty() {
        let cfg = parse_yaml("{}").unwrap();
        assert_eq!(cfg, SchedulerConfig::default());
        assert!(cfg.worker_threads() >= 1);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = parse_yaml("threads: 2\nstrategy: work_queue\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_load_by_extension() {
        let yaml = write_temp(".yml", "threads: 5\n");
        assert_eq!(load_config(yaml.path()).unwrap().threads, Some(5));

        let toml = write_temp(".toml", "threads = 6\n");
        assert_eq!(load_config(toml.path()).unwrap().threads, Some(6));

        let json = write_temp(".json", "{\"threads\": 7}");
        assert!(matches!(
            load_config(json.path()),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        match load_config(&path) {
            Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected an io error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_and_validate_rejects_reserved_lane() {
        let yaml = write_temp(
            ".yaml",
            "threads: 2\nthread_groups:\n  - name: main\n    threads: 1\n",
        );
        assert!(matches!(
            load_and_validate_config(yaml.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_and_validate_valid_config() {
        let yaml = write_temp(
            ".yaml",
            "threads: 2\nfailure_strategy: abort_run\nthread_groups:\n  - name: io\n",
        );
        let cfg = load_and_validate_config(yaml.path()).unwrap();
        assert_eq!(cfg.thread_groups.len(), 1);
    }
}
