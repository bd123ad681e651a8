// Host-supplied playback that replaces the built-in backends entirely

use crate::error::Result;
use crate::source::ResolvedSource;
use crate::state::{PlayerConfig, PlayerId};

/// Full bypass of the built-in backends
///
/// Once installed on a registry, every operation is forwarded here keyed by
/// player id. The delegate owns player state and lifecycle; the registry does
/// not track delegate-loaded players.
pub trait PlaybackDelegate: Send + Sync {
    /// Load `source` under the id the registry allocated
    fn load(&self, id: PlayerId, source: &ResolvedSource, config: &PlayerConfig) -> Result<()>;

    fn dispose(&self, id: PlayerId) -> Result<()>;

    fn play(&self, id: PlayerId) -> Result<()>;

    fn pause(&self, id: PlayerId) -> Result<()>;

    fn resume(&self, id: PlayerId) -> Result<()>;

    fn stop(&self, id: PlayerId) -> Result<()>;

    fn seek(&self, id: PlayerId, position_ms: u64) -> Result<()>;

    fn set_volume(&self, id: PlayerId, volume: f32) -> Result<()>;

    fn position(&self, id: PlayerId) -> Result<Option<u64>>;

    /// Hosts that manage teardown themselves return `false`; `dispose` then
    /// fails with `NotImplemented` instead of being forwarded.
    fn supports_dispose(&self) -> bool {
        true
    }
}
