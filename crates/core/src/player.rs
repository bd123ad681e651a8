// Playback backend capability and its factory

use crate::callback::PlayingObserver;
use crate::error::Result;
use crate::source::ResolvedSource;
use crate::state::{PlaybackState, PlayerConfig};
use std::sync::Arc;

/// One player's connection to a native playback primitive
///
/// Every transition is idempotent: calling it from a state where it is a
/// no-op (pausing a paused player, stopping an idle one) succeeds without
/// side effects. Positions are integer milliseconds.
pub trait PlaybackBackend: Send {
    /// Start playback (variant-specific rewind/prepare rules apply)
    fn play(&mut self) -> Result<()>;

    /// Pause playback, keeping the playhead
    fn pause(&mut self) -> Result<()>;

    /// Continue from the current playhead
    fn resume(&mut self) -> Result<()>;

    /// Pause and rewind to the start
    fn stop(&mut self) -> Result<()>;

    /// Move the playhead (in milliseconds)
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Set volume (0.0 - 1.0)
    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Current playhead, or `None` when the media has no addressable timeline
    fn position(&mut self) -> Result<Option<u64>>;

    /// Current backend playback state
    fn state(&self) -> PlaybackState;

    /// Attach a playing-state watcher
    fn start_observation(&mut self, observer: Arc<PlayingObserver>);

    /// Detach the watcher; must be safe to call when none is attached
    fn stop_observation(&mut self);

    /// Release native resources; the backend is not used afterwards
    fn release(&mut self) -> Result<()>;
}

/// Builds the backend variant for a resolved source
/// (looping or single-shot, chosen from `config.looping`)
pub trait BackendFactory: Send + Sync {
    fn create_backend(
        &self,
        source: &ResolvedSource,
        config: &PlayerConfig,
    ) -> Result<Box<dyn PlaybackBackend>>;
}
