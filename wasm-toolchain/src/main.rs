//! wasm-toolchain
//!
//! Installs wasm-pack and Binaryen on a CI runner and puts them on PATH.

use wasm_toolchain_core::{run_action, ActionHost, GithubActionsHost, Settings};

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wasm_toolchain=debug".parse().expect("valid directive"))
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting wasm-toolchain v{}", wasm_toolchain_core::VERSION);

    let host = GithubActionsHost::from_env();

    if let Err(e) = run(&host) {
        host.fail(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(host: &GithubActionsHost) -> anyhow::Result<()> {
    let settings = Settings::from_host(host);
    tracing::debug!(
        wasm_pack = %settings.wasm_pack_version,
        binaryen = %settings.binaryen_version,
        cache_dir = %settings.cache_dir.display(),
        parallel = settings.parallel,
        "Loaded settings"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(run_action(host, &settings))?;

    tracing::info!(
        "Installed wasm-pack {} and Binaryen {}",
        outcome.wasm_pack.resolved.version,
        outcome.binaryen.resolved.version
    );
    Ok(())
}
