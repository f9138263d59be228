//! GitHub Actions host.
//!
//! - Inputs come from `INPUT_<NAME>` environment variables.
//! - Outputs are appended to the file named by `GITHUB_OUTPUT`.
//! - Path additions are appended to the file named by `GITHUB_PATH` and
//!   applied to this process's `PATH`.
//! - Warnings and errors are printed as workflow commands.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::env::prepend_to_path;
use super::ActionHost;

/// Environment variable name GitHub uses for an action input.
///
/// `wasm-pack-version` -> `INPUT_WASM-PACK-VERSION`
pub fn input_env_name(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Escapes a message for use in a workflow command.
fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// [`super::ActionHost`] backed by the GitHub Actions runner protocol.
#[derive(Debug, Clone, Default)]
pub struct GithubActionsHost {
    output_file: Option<PathBuf>,
    path_file: Option<PathBuf>,
}

impl GithubActionsHost {
    /// Reads the runner's command files from the environment.
    pub fn from_env() -> Self {
        let file_var = |name: &str| {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            output_file: file_var("GITHUB_OUTPUT"),
            path_file: file_var("GITHUB_PATH"),
        }
    }

    /// Uses explicit command files instead of the environment.
    pub fn with_files(output_file: Option<PathBuf>, path_file: Option<PathBuf>) -> Self {
        Self {
            output_file,
            path_file,
        }
    }

    fn append_line(file: &Path, line: &str) -> Result<()> {
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .with_context(|| format!("Failed to open {}", file.display()))?;
        writeln!(handle, "{}", line)
            .with_context(|| format!("Failed to write to {}", file.display()))?;
        Ok(())
    }
}

impl ActionHost for GithubActionsHost {
    fn get_input(&self, name: &str) -> Option<String> {
        std::env::var(input_env_name(name))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        debug!(name, value, "Setting output");
        match &self.output_file {
            Some(file) if value.contains('\n') => {
                let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4().simple());
                Self::append_line(file, &format!("{}<<{}\n{}\n{}", name, delimiter, value, delimiter))
            }
            Some(file) => Self::append_line(file, &format!("{}={}", name, value)),
            None => {
                println!("::set-output name={}::{}", name, escape_data(value));
                Ok(())
            }
        }
    }

    fn add_path(&self, dir: &Path) -> Result<()> {
        if let Some(file) = &self.path_file {
            Self::append_line(file, &dir.to_string_lossy())?;
        }
        std::env::set_var("PATH", prepend_to_path(dir, None));
        info!("Added {} to PATH", dir.display());
        Ok(())
    }

    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn warn(&self, message: &str) {
        debug!(message, "Host warning");
        println!("::warning::{}", escape_data(message));
    }

    fn fail(&self, message: &str) {
        debug!(message, "Host failure");
        println!("::error::{}", escape_data(message));
    }
}
