// Resolving load-time URIs into readable source locations

use crate::error::{AudioError, Result};
use crate::state::PlayerConfig;
use std::path::{Path, PathBuf};

/// A source ready to be opened by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// The URI as given to `load`; used as the notification key
    pub uri: String,
    /// Concrete location on disk
    pub location: PathBuf,
    pub is_asset: bool,
}

/// Maps an asset name (and optional owning package) to a file
pub trait AssetResolver: Send + Sync {
    /// Fails with `SourceUnavailable` when the asset does not exist
    fn resolve(&self, url: &str, package: Option<&str>) -> Result<PathBuf>;
}

/// Resolves assets below a root directory
///
/// Package assets live under `packages/<package>/`.
#[derive(Debug, Clone)]
pub struct DirectoryAssetResolver {
    root: PathBuf,
}

impl DirectoryAssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetResolver for DirectoryAssetResolver {
    fn resolve(&self, url: &str, package: Option<&str>) -> Result<PathBuf> {
        let relative = url.trim_start_matches('/');
        let path = match package {
            Some(pkg) => self.root.join("packages").join(pkg).join(relative),
            None => self.root.join(relative),
        };
        if path.is_file() {
            Ok(path)
        } else {
            Err(AudioError::SourceUnavailable(format!(
                "asset not found: {}",
                path.display()
            )))
        }
    }
}

/// Resolve the source named by a player configuration
///
/// Assets go through `resolver`; plain URIs are used as-is after stripping a
/// `file://` scheme.
pub fn resolve_source(config: &PlayerConfig, resolver: &dyn AssetResolver) -> Result<ResolvedSource> {
    let location = if config.is_asset {
        resolver.resolve(&config.source_uri, config.package_name.as_deref())?
    } else {
        let path = config
            .source_uri
            .strip_prefix("file://")
            .unwrap_or(&config.source_uri);
        PathBuf::from(path)
    };
    Ok(ResolvedSource {
        uri: config.source_uri.clone(),
        location,
        is_asset: config.is_asset,
    })
}
