/// Runs discovered notebooks one at a time and reports the outcome
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::NotebooksConfig;
use crate::errors::PipelineResult;
use crate::logger::{self, LogTag};
use crate::utils::format_duration_compact;

use super::discovery::{discover_notebooks, skip_decision, Notebook};
use super::executor::NotebookExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotebookStatus {
    Passed,
    Failed(String),
    Skipped(String),
}

impl NotebookStatus {
    fn label(&self) -> &'static str {
        match self {
            NotebookStatus::Passed => "PASS",
            NotebookStatus::Failed(_) => "FAIL",
            NotebookStatus::Skipped(_) => "SKIP",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotebookResult {
    pub path: PathBuf,
    pub status: NotebookStatus,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct NotebookRunReport {
    pub results: Vec<NotebookResult>,
}

impl NotebookRunReport {
    fn count(&self, label: &str) -> usize {
        self.results
            .iter()
            .filter(|r| r.status.label() == label)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count("PASS")
    }

    pub fn failed(&self) -> usize {
        self.count("FAIL")
    }

    pub fn skipped(&self) -> usize {
        self.count("SKIP")
    }

    pub fn failing_paths(&self) -> Vec<&Path> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, NotebookStatus::Failed(_)))
            .map(|r| r.path.as_path())
            .collect()
    }

    /// 1 when any notebook failed
    pub fn exit_code(&self) -> i32 {
        if self.failed() > 0 {
            1
        } else {
            0
        }
    }

    pub fn render_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(["Notebook", "Status", "Time", "Details"]);

        for result in &self.results {
            let details = match &result.status {
                NotebookStatus::Passed => String::new(),
                NotebookStatus::Failed(reason) | NotebookStatus::Skipped(reason) => reason.clone(),
            };
            let time = match result.status {
                NotebookStatus::Skipped(_) => "-".to_string(),
                _ => format_duration_compact(result.duration),
            };
            table.add_row([
                result.path.display().to_string(),
                result.status.label().to_string(),
                time,
                details,
            ]);
        }
        table
    }
}

/// Whether the CI environment flag is set and non-empty
pub fn ci_active(config: &NotebooksConfig) -> bool {
    std::env::var(&config.ci_env_var)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

/// Decide and execute each notebook in order; failures never stop the run
pub async fn run_notebook_paths(
    paths: &[PathBuf],
    config: &NotebooksConfig,
    ci_active: bool,
    executor: &dyn NotebookExecutor,
) -> NotebookRunReport {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut report = NotebookRunReport::default();

    for path in paths {
        let notebook = match Notebook::load(path) {
            Ok(notebook) => notebook,
            Err(e) => {
                logger::error(LogTag::Notebooks, &format!("{}: {}", path.display(), e));
                report.results.push(NotebookResult {
                    path: path.clone(),
                    status: NotebookStatus::Failed(e.to_string()),
                    duration: Duration::ZERO,
                });
                continue;
            }
        };

        if let Some(reason) = skip_decision(&notebook, &config.skip_marker, ci_active) {
            logger::info(
                LogTag::Notebooks,
                &format!("Skipping {} ({})", path.display(), reason),
            );
            report.results.push(NotebookResult {
                path: path.clone(),
                status: NotebookStatus::Skipped(reason.to_string()),
                duration: Duration::ZERO,
            });
            continue;
        }

        logger::info(LogTag::Notebooks, &format!("Running {}...", path.display()));
        let started = Instant::now();
        let status = match executor.execute(path, timeout).await {
            Ok(()) => NotebookStatus::Passed,
            Err(e) => {
                logger::error(
                    LogTag::Notebooks,
                    &format!("Error running {}: {}", path.display(), e),
                );
                NotebookStatus::Failed(e.to_string())
            }
        };
        report.results.push(NotebookResult {
            path: path.clone(),
            status,
            duration: started.elapsed(),
        });
    }

    report
}

pub async fn run_notebooks(
    config: &NotebooksConfig,
    executor: &dyn NotebookExecutor,
) -> PipelineResult<NotebookRunReport> {
    let paths = discover_notebooks(&config.pattern)?;
    let ci = ci_active(config);
    logger::info(
        LogTag::Notebooks,
        &format!(
            "Found {} notebooks matching {} (CI {})",
            paths.len(),
            config.pattern,
            if ci { "on" } else { "off" }
        ),
    );

    let report = run_notebook_paths(&paths, config, ci, executor).await;

    logger::info(LogTag::Notebooks, &format!("\n{}", report.render_table()));
    if report.failed() > 0 {
        let failing: Vec<String> = report
            .failing_paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        logger::error(
            LogTag::Notebooks,
            &format!("Failing notebooks:\n{}", failing.join("\n")).red().to_string(),
        );
    } else {
        logger::info(
            LogTag::Notebooks,
            &format!(
                "All notebooks ran successfully ({} passed, {} skipped)",
                report.passed(),
                report.skipped()
            )
            .green()
            .to_string(),
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebooks::executor::fake::FakeExecutor;

    fn write_notebook(dir: &Path, name: &str, code: &str) -> PathBuf {
        let path = dir.join(name);
        let json = serde_json::json!({
            "cells": [{ "cell_type": "code", "source": code }],
            "nbformat": 4
        });
        std::fs::write(&path, json.to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_pass_fail_skip_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_notebook(dir.path(), "ok.ipynb", "x = 1"),
            write_notebook(dir.path(), "broken.ipynb", "raise ValueError()"),
            write_notebook(dir.path(), "grid.ipynb", "perform_grid_search()"),
            write_notebook(dir.path(), "ci.ipynb", "# @ts skip-test-ci: slow"),
        ];
        let executor = FakeExecutor::failing(&["broken.ipynb"]);
        let config = NotebooksConfig::default();

        let report = run_notebook_paths(&paths, &config, false, &executor).await;
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failing_paths(), vec![paths[1].as_path()]);
        // The grid search notebook never reached the executor
        assert_eq!(executor.calls.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_ci_flag_skips_ci_notebooks() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![write_notebook(dir.path(), "ci.ipynb", "# @ts skip-test-ci: slow")];
        let executor = FakeExecutor::default();

        let report = run_notebook_paths(&paths, &NotebooksConfig::default(), true, &executor).await;
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.exit_code(), 0);
        assert!(executor.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_notebook_fails_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.ipynb");
        std::fs::write(&bad, "{oops").unwrap();
        let good = write_notebook(dir.path(), "good.ipynb", "x = 1");
        let executor = FakeExecutor::default();

        let report = run_notebook_paths(
            &[bad, good],
            &NotebooksConfig::default(),
            false,
            &executor,
        )
        .await;
        assert_eq!(report.failed(), 1);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.render_table().row_iter().count(), 2);
    }

    #[tokio::test]
    async fn test_run_notebooks_with_pattern() {
        let dir = tempfile::tempdir().unwrap();
        write_notebook(dir.path(), "a.ipynb", "x = 1");
        let config = NotebooksConfig {
            pattern: format!("{}/*.ipynb", dir.path().display()),
            ci_env_var: "UNIVERSE_PREP_TEST_CI_UNSET".to_string(),
            ..Default::default()
        };
        let report = run_notebooks(&config, &FakeExecutor::default()).await.unwrap();
        assert_eq!(report.passed(), 1);
    }
}
