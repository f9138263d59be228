//! One action run: install both tools, expose them on PATH, publish outputs.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::host::{executable_in_dir, ActionHost};
use crate::toolchain::{
    Dependency, FsToolCache, InstalledTool, ReleaseClient, RunDirs, ToolCache, ToolInstaller,
    ToolKind, VersionSource,
};

pub const OUTPUT_WASM_PACK_PATH: &str = "wasm-pack-path";
pub const OUTPUT_BINARYEN_PATH: &str = "binaryen-path";
pub const OUTPUT_WASM_PACK_VERSION: &str = "wasm-pack-version";
pub const OUTPUT_BINARYEN_VERSION: &str = "binaryen-version";

/// Both installed tools of a successful run.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub wasm_pack: InstalledTool,
    pub binaryen: InstalledTool,
}

/// Runs the action with the detected platform and the configured endpoints.
pub async fn run_action(host: &dyn ActionHost, settings: &Settings) -> Result<ActionOutcome> {
    let client = settings.http_client()?;
    let releases = ReleaseClient::new(
        client.clone(),
        &settings.api_base_url,
        settings.github_token.clone(),
    );
    let cache: Arc<dyn ToolCache> = Arc::new(FsToolCache::new(settings.cache_dir.clone()));
    let run_dirs = RunDirs::new().context("Failed to prepare temporary directories")?;

    info!(
        "Cache: {}, scratch: {}",
        settings.cache_dir.display(),
        run_dirs.root().display()
    );

    let installer = ToolInstaller::new(
        client,
        releases,
        cache,
        run_dirs,
        &settings.download_base_url,
    );
    run_with_installer(host, settings, &installer).await
}

/// Installs both tools with `installer`. Outputs are published only after
/// both installs succeeded.
pub async fn run_with_installer(
    host: &dyn ActionHost,
    settings: &Settings,
    installer: &ToolInstaller,
) -> Result<ActionOutcome> {
    let wasm_pack = Dependency::new(
        ToolKind::WasmPack,
        settings.requested_version(ToolKind::WasmPack),
    );
    let binaryen = Dependency::new(
        ToolKind::Binaryen,
        settings.requested_version(ToolKind::Binaryen),
    );

    let (wasm_pack, binaryen) = if settings.parallel {
        tokio::try_join!(installer.install(&wasm_pack), installer.install(&binaryen))?
    } else {
        let first = installer.install(&wasm_pack).await?;
        let second = installer.install(&binaryen).await?;
        (first, second)
    };

    for tool in [&wasm_pack, &binaryen] {
        expose(host, tool)?;
    }

    let outputs = [
        (OUTPUT_WASM_PACK_PATH, wasm_pack.bin_dir.display().to_string()),
        (OUTPUT_BINARYEN_PATH, binaryen.bin_dir.display().to_string()),
        (OUTPUT_WASM_PACK_VERSION, wasm_pack.resolved.version.clone()),
        (OUTPUT_BINARYEN_VERSION, binaryen.resolved.version.clone()),
    ];
    for (name, value) in &outputs {
        host.set_output(name, value)
            .with_context(|| format!("Failed to set output {}", name))?;
    }

    Ok(ActionOutcome {
        wasm_pack,
        binaryen,
    })
}

/// Adds the tool's directory to PATH and reports anything the user should know.
fn expose(host: &dyn ActionHost, tool: &InstalledTool) -> Result<()> {
    let name = tool.resolved.tool;

    if let VersionSource::Fallback { reason } = &tool.resolved.source {
        host.warn(&format!(
            "Could not resolve the latest {} release ({}); installed pinned version {}",
            name, reason, tool.resolved.version
        ));
    }

    host.add_path(&tool.bin_dir)
        .with_context(|| format!("Failed to add {} to PATH", tool.bin_dir.display()))?;

    if !executable_in_dir(&tool.bin_dir, &tool.executable) {
        host.warn(&format!(
            "{} was added to PATH but {} was not found in it; the archive layout may have changed",
            tool.bin_dir.display(),
            tool.executable
        ));
    }

    host.info(&format!(
        "{} {} is available at {}{}",
        name,
        tool.resolved.version,
        tool.bin_dir.display(),
        if tool.from_cache { " (cached)" } else { "" }
    ));
    Ok(())
}
