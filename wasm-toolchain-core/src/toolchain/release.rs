//! Release version resolution.
//!
//! Turns a requested version (`latest` or an explicit version in any of the
//! formats users type) into the canonical release tag for a tool.

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::catalog::get_driver;
use super::types::{Dependency, ResolvedDependency, VersionSource};
use crate::error::{InstallError, InstallResult};

/// The subset of the release API payload we read.
#[derive(Debug, Deserialize)]
struct LatestRelease {
    #[serde(default)]
    tag_name: Option<String>,
}

/// Queries the release host for release metadata.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl ReleaseClient {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn latest_url(&self, repository: &str) -> String {
        format!("{}/repos/{}/releases/latest", self.api_base, repository)
    }

    /// Returns the tag of the newest release of `owner/repo`.
    pub async fn resolve_latest(&self, repository: &str) -> InstallResult<String> {
        let url = self.latest_url(repository);
        debug!(%url, "Fetching latest release");

        let fail = |reason: String| InstallError::Resolution {
            repository: repository.to_string(),
            reason,
        };

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("release API returned status {}", status.as_u16())));
        }

        let release: LatestRelease = response
            .json()
            .await
            .map_err(|e| fail(format!("unparseable release payload: {e}")))?;

        match release.tag_name.map(|t| t.trim().to_string()) {
            Some(tag) if !tag.is_empty() => Ok(tag),
            _ => Err(fail("release payload has no tag_name".to_string())),
        }
    }
}

/// Resolves a dependency to its canonical version tag.
///
/// `latest` is looked up on the release host; if that fails the tool's pinned
/// fallback tag is used and the outcome is marked as [`VersionSource::Fallback`].
/// Explicit versions are only reformatted, without any network access.
pub async fn ensure_proper_version(
    releases: &ReleaseClient,
    dependency: &Dependency,
) -> ResolvedDependency {
    let driver = get_driver(dependency.tool);

    let (version, source) = if dependency.is_latest() {
        match releases.resolve_latest(&driver.repository()).await {
            Ok(tag) => {
                info!(tool = %dependency.tool, %tag, "Resolved latest release");
                ((driver.normalize_version)(&tag), VersionSource::Latest)
            }
            Err(e) => {
                warn!(
                    tool = %dependency.tool,
                    fallback = driver.fallback_version,
                    "Could not resolve latest release, using pinned version: {}",
                    e
                );
                (
                    driver.fallback_version.to_string(),
                    VersionSource::Fallback {
                        reason: e.to_string(),
                    },
                )
            }
        }
    } else {
        (
            (driver.normalize_version)(&dependency.requested),
            VersionSource::Explicit,
        )
    };

    ResolvedDependency {
        tool: dependency.tool,
        requested: dependency.requested.clone(),
        version,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::unreachable_base;
    use mockito::Server;
    use crate::toolchain::types::ToolKind;

    fn client_for(base: &str) -> ReleaseClient {
        ReleaseClient::new(reqwest::Client::new(), base, None)
    }

    #[test]
    fn test_latest_url() {
        let releases = client_for("https://api.github.com/");
        assert_eq!(
            releases.latest_url("rustwasm/wasm-pack"),
            "https://api.github.com/repos/rustwasm/wasm-pack/releases/latest"
        );
    }

    #[tokio::test]
    async fn test_resolve_latest_reads_tag_name() {
        let mut server = Server::new_async().await;
        let latest = server
            .mock("GET", "/repos/WebAssembly/binaryen/releases/latest")
            .match_header("accept", "application/vnd.github+json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name":"version_124","name":"v124"}"#)
            .expect(1)
            .create_async()
            .await;

        let tag = client_for(&server.url())
            .resolve_latest("WebAssembly/binaryen")
            .await
            .unwrap();
        assert_eq!(tag, "version_124");
        latest.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_latest_rejects_non_success() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/rustwasm/wasm-pack/releases/latest")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let err = client_for(&server.url())
            .resolve_latest("rustwasm/wasm-pack")
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Resolution { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_resolve_latest_rejects_missing_tag() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/rustwasm/wasm-pack/releases/latest")
            .with_status(200)
            .with_body(r#"{"name":"no tag here"}"#)
            .create_async()
            .await;

        let err = client_for(&server.url())
            .resolve_latest("rustwasm/wasm-pack")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("tag_name"));
    }

    #[tokio::test]
    async fn test_explicit_versions_are_normalized_offline() {
        let releases = client_for(&unreachable_base());

        let wasm_pack = ensure_proper_version(
            &releases,
            &Dependency::new(ToolKind::WasmPack, "0.13.1"),
        )
        .await;
        assert_eq!(wasm_pack.version, "v0.13.1");
        assert_eq!(wasm_pack.source, VersionSource::Explicit);

        for input in ["118", "v118", "version_118"] {
            let binaryen =
                ensure_proper_version(&releases, &Dependency::new(ToolKind::Binaryen, input))
                    .await;
            assert_eq!(binaryen.version, "version_118");
        }
    }

    #[tokio::test]
    async fn test_latest_falls_back_when_host_unreachable() {
        let releases = client_for(&unreachable_base());
        let resolved =
            ensure_proper_version(&releases, &Dependency::new(ToolKind::WasmPack, "latest")).await;

        assert_eq!(resolved.version, get_driver(ToolKind::WasmPack).fallback_version);
        assert!(resolved.used_fallback());
        assert_ne!(resolved.version, "latest");
    }

    #[tokio::test]
    async fn test_latest_uses_release_tag() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/rustwasm/wasm-pack/releases/latest")
            .with_status(200)
            .with_body(r#"{"tag_name":"v0.14.0"}"#)
            .create_async()
            .await;

        let resolved = ensure_proper_version(
            &client_for(&server.url()),
            &Dependency::new(ToolKind::WasmPack, "latest"),
        )
        .await;
        assert_eq!(resolved.version, "v0.14.0");
        assert_eq!(resolved.source, VersionSource::Latest);
    }

    #[tokio::test]
    async fn test_ensure_proper_version_is_idempotent() {
        let releases = client_for(&unreachable_base());
        for (tool, input) in [
            (ToolKind::Binaryen, "v118"),
            (ToolKind::WasmPack, "0.12.1"),
            (ToolKind::Binaryen, "latest"),
        ] {
            let dep = Dependency::new(tool, input);
            let first = ensure_proper_version(&releases, &dep).await;
            let second = ensure_proper_version(&releases, &dep).await;
            assert_eq!(first.version, second.version);

            // Feeding the canonical tag back in keeps it unchanged
            let again =
                ensure_proper_version(&releases, &Dependency::new(tool, first.version.clone()))
                    .await;
            assert_eq!(again.version, first.version);
        }
    }
}
