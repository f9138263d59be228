//! Shared fixtures for unit tests: archive builders and a recording host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::host::ActionHost;

// ============================================================================
// HTTP Helpers
// ============================================================================

/// Returns a base URL nothing is listening on.
pub fn unreachable_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

// ============================================================================
// Archive Builders
// ============================================================================

/// Builds a gzip-compressed tar archive in memory from `(path, contents, mode)`.
pub fn tar_gz_bytes(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, data, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(path).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

// ============================================================================
// Recording Host
// ============================================================================

/// An [`ActionHost`] that keeps everything in memory.
#[derive(Default)]
pub struct RecordingHost {
    pub inputs: HashMap<String, String>,
    pub outputs: Mutex<Vec<(String, String)>>,
    pub paths: Mutex<Vec<PathBuf>>,
    pub warnings: Mutex<Vec<String>>,
    pub failures: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn with_input(mut self, name: &str, value: &str) -> Self {
        self.inputs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn output(&self, name: &str) -> Option<String> {
        self.outputs
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}

impl ActionHost for RecordingHost {
    fn get_input(&self, name: &str) -> Option<String> {
        self.inputs.get(name).cloned()
    }

    fn set_output(&self, name: &str, value: &str) -> anyhow::Result<()> {
        self.outputs
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn add_path(&self, dir: &Path) -> anyhow::Result<()> {
        self.paths.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }

    fn info(&self, _message: &str) {}

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn fail(&self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}
