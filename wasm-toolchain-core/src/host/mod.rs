//! The automation host a run executes inside.
//!
//! The host provides inputs, receives outputs, owns the executable search
//! path and renders log annotations. [`GithubActionsHost`] implements it for
//! GitHub Actions runners.

pub mod env;
mod github;

use std::path::Path;

pub use env::{executable_in_dir, path_separator, prepend_to_path};
pub use github::{input_env_name, GithubActionsHost};

/// Facade over the automation host.
pub trait ActionHost: Send + Sync {
    /// Returns the named input, if provided and non-empty.
    fn get_input(&self, name: &str) -> Option<String>;

    /// Publishes a named output value.
    fn set_output(&self, name: &str, value: &str) -> anyhow::Result<()>;

    /// Prepends `dir` to the executable search path for the rest of the run.
    fn add_path(&self, dir: &Path) -> anyhow::Result<()>;

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    /// Reports a fatal error. The caller is responsible for exiting.
    fn fail(&self, message: &str);
}
