/// Notebook discovery and skip decisions
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, PipelineResult};

use super::pragma::{parse_pragma, SKIP_TEST, SKIP_TEST_CI};

/// Cell source is either one string or a list of lines
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            CellSource::Text(text) => text,
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCell {
    cell_type: String,
    #[serde(default)]
    source: Option<CellSource>,
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    #[serde(default)]
    cells: Vec<RawCell>,
}

/// Code cells of one notebook
#[derive(Debug, Clone)]
pub struct Notebook {
    pub path: PathBuf,
    pub code_cells: Vec<String>,
}

impl Notebook {
    pub fn parse(path: &Path, contents: &str) -> PipelineResult<Self> {
        let raw: RawNotebook = serde_json::from_str(contents).map_err(|e| {
            PipelineError::Notebook(format!("{} is not a valid notebook: {}", path.display(), e))
        })?;

        let code_cells = raw
            .cells
            .into_iter()
            .filter(|c| c.cell_type == "code")
            .map(|c| c.source.map(CellSource::into_text).unwrap_or_default())
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            code_cells,
        })
    }

    pub fn load(path: &Path) -> PipelineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(path, &contents)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A code cell contains the skip marker
    Marker(String),
    /// `skip-test` pragma
    Always(String),
    /// `skip-test-ci` pragma with the CI flag set
    Ci(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Marker(marker) => write!(f, "Contains {}", marker),
            SkipReason::Always(reason) => write!(f, "Always skip: {}", reason),
            SkipReason::Ci(reason) => write!(f, "CI skip: {}", reason),
        }
    }
}

/// First reason to skip, scanning code cells in order
pub fn skip_decision(notebook: &Notebook, skip_marker: &str, ci_active: bool) -> Option<SkipReason> {
    for cell in &notebook.code_cells {
        if !skip_marker.is_empty() && cell.contains(skip_marker) {
            return Some(SkipReason::Marker(skip_marker.to_string()));
        }

        for line in cell.lines() {
            match parse_pragma(line) {
                Some((SKIP_TEST, reason)) => return Some(SkipReason::Always(reason.to_string())),
                Some((SKIP_TEST_CI, reason)) if ci_active => {
                    return Some(SkipReason::Ci(reason.to_string()))
                }
                _ => {}
            }
        }
    }
    None
}

/// Notebooks matching `pattern`, sorted
pub fn discover_notebooks(pattern: &str) -> PipelineResult<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| PipelineError::config(format!("Invalid notebook pattern '{}': {}", pattern, e)))?;

    let mut notebooks: Vec<PathBuf> = paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        // Jupyter autosaves
        .filter(|path| {
            !path
                .components()
                .any(|c| c.as_os_str() == ".ipynb_checkpoints")
        })
        .collect();
    notebooks.sort();
    Ok(notebooks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notebook(cells: &[(&str, &str)]) -> Notebook {
        let cells: Vec<serde_json::Value> = cells
            .iter()
            .map(|(kind, source)| serde_json::json!({ "cell_type": kind, "source": source }))
            .collect();
        let json = serde_json::json!({ "cells": cells, "nbformat": 4 }).to_string();
        Notebook::parse(Path::new("test.ipynb"), &json).unwrap()
    }

    #[test]
    fn test_source_as_list_of_lines() {
        let json = r##"{"cells": [
            {"cell_type": "markdown", "source": ["perform_grid_search"]},
            {"cell_type": "code", "source": ["import x\n", "# @ts skip-test: broken\n"]}
        ]}"##;
        let nb = Notebook::parse(Path::new("a.ipynb"), json).unwrap();
        assert_eq!(nb.code_cells, vec!["import x\n# @ts skip-test: broken\n"]);
    }

    #[test]
    fn test_marker_in_code_cells_only() {
        let nb = notebook(&[("markdown", "perform_grid_search"), ("code", "x = 1")]);
        assert_eq!(skip_decision(&nb, "perform_grid_search", false), None);

        let nb = notebook(&[("code", "results = perform_grid_search(grid)")]);
        assert_eq!(
            skip_decision(&nb, "perform_grid_search", false),
            Some(SkipReason::Marker("perform_grid_search".to_string()))
        );
    }

    #[test]
    fn test_ci_pragma_needs_ci_flag() {
        let nb = notebook(&[("code", "# @ts skip-test-ci: downloads a lot\nrun()")]);
        assert_eq!(skip_decision(&nb, "perform_grid_search", false), None);
        assert_eq!(
            skip_decision(&nb, "perform_grid_search", true),
            Some(SkipReason::Ci("downloads a lot".to_string()))
        );
    }

    #[test]
    fn test_always_pragma() {
        let nb = notebook(&[("code", "x = 1"), ("code", "  # @ts skip-test: flaky")]);
        let reason = skip_decision(&nb, "perform_grid_search", false).unwrap();
        assert_eq!(reason.to_string(), "Always skip: flaky");
    }

    #[test]
    fn test_invalid_json_is_notebook_error() {
        let err = Notebook::parse(Path::new("bad.ipynb"), "{not json").unwrap_err();
        assert!(matches!(err, PipelineError::Notebook(_)));
    }

    #[test]
    fn test_discover_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("single-backtest");
        let checkpoints = nested.join(".ipynb_checkpoints");
        std::fs::create_dir_all(&checkpoints).unwrap();
        std::fs::write(dir.path().join("b.ipynb"), "{}").unwrap();
        std::fs::write(nested.join("a.ipynb"), "{}").unwrap();
        std::fs::write(checkpoints.join("a-checkpoint.ipynb"), "{}").unwrap();
        std::fs::write(nested.join("notes.md"), "").unwrap();

        let pattern = format!("{}/**/*.ipynb", dir.path().display());
        let found = discover_notebooks(&pattern).unwrap();
        assert_eq!(found, vec![dir.path().join("b.ipynb"), nested.join("a.ipynb")]);
    }
}
