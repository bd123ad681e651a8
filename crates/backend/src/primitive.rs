// Native playback primitives the built-in backends drive
//
// Platforms expose two kinds of player: a single-shot clip that counts in
// seconds, and a loop-capable queue that counts in timescale ticks and
// re-enqueues its item forever.

use chorus_core::{NativeTime, PlaybackState, ResolvedSource, Result};
use std::sync::Arc;

/// Native playing-state callback; `true` while the primitive is producing audio
pub type StateObserver = Arc<dyn Fn(bool) + Send + Sync>;

/// Single-shot primitive, positions in seconds
pub trait ClipPrimitive: Send {
    /// Start from the current time
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Current time in seconds
    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, secs: f64) -> Result<()>;

    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// False once paused or after reaching the end of the media
    fn is_playing(&self) -> bool;

    fn set_playing_observer(&mut self, observer: Option<StateObserver>);

    fn release(&mut self) -> Result<()>;
}

/// Looping queue primitive, positions as rational native time
pub trait QueuePrimitive: Send {
    fn status(&self) -> PlaybackState;

    /// First-time preparation of the queued item
    fn prepare(&mut self) -> Result<()>;

    /// 0.0 pauses, 1.0 plays
    fn set_rate(&mut self, rate: f32) -> Result<()>;

    fn rate(&self) -> f32;

    fn seek(&mut self, to: NativeTime) -> Result<()>;

    /// `None` when the item has no addressable timeline
    fn current_time(&self) -> Option<NativeTime>;

    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Observer fires with `rate != 0` whenever the rate changes
    fn set_rate_observer(&mut self, observer: Option<StateObserver>);

    fn release(&mut self) -> Result<()>;
}

/// Opens native primitives for resolved sources
pub trait NativePlatform: Send + Sync {
    type Clip: ClipPrimitive + 'static;
    type Queue: QueuePrimitive + 'static;

    fn open_clip(&self, source: &ResolvedSource, volume: f32) -> Result<Self::Clip>;

    fn open_queue(&self, source: &ResolvedSource, volume: f32) -> Result<Self::Queue>;
}
