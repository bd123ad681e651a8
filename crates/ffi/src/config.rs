// Engine configuration

use log::LevelFilter;
use std::path::PathBuf;

const ASSETS_ROOT_ENV: &str = "CHORUS_ASSETS_ROOT";
const LOG_LEVEL_ENV: &str = "CHORUS_LOG";

/// Settings used when the engine is built
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory that bundled assets are resolved against
    pub assets_root: PathBuf,
    pub log_level: LevelFilter,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assets_root: PathBuf::from("."),
            log_level: LevelFilter::Info,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `CHORUS_ASSETS_ROOT` and `CHORUS_LOG`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(root) = lookup(ASSETS_ROOT_ENV).filter(|root| !root.is_empty()) {
            config.assets_root = PathBuf::from(root);
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).and_then(|level| parse_level(&level)) {
            config.log_level = level;
        }
        config
    }

    pub fn with_assets_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets_root = root.into();
        self
    }

    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }
}

/// Case-insensitive level name; `None` for anything unrecognised
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    level.trim().parse().ok()
}
