//! Notebook test runner
//!
//! Discovers notebooks with a glob, skips the ones marked as unsuitable for
//! automated runs and executes the rest through Jupyter with a timeout.

pub mod discovery;
pub mod executor;
pub mod pragma;
pub mod runner;

pub use discovery::{discover_notebooks, skip_decision, Notebook, SkipReason};
pub use executor::{JupyterExecutor, NotebookExecutor};
pub use pragma::parse_pragma;
pub use runner::{
    ci_active, run_notebook_paths, run_notebooks, NotebookResult, NotebookRunReport,
    NotebookStatus,
};
