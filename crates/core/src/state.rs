// Player identifiers, configuration and lifecycle states

use crate::error::{AudioError, Result};
use std::fmt;

/// Stable handle identifying one loaded player instance
///
/// Ids are handed out by the registry in strictly increasing order and are
/// never reused, even after the player is disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl PlayerId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        PlayerId(id)
    }
}

/// Load-time configuration of a player
///
/// Everything except `volume` is fixed once the player is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// The URI exactly as the caller supplied it; listeners see this string
    pub source_uri: String,
    /// Whether `source_uri` names a bundled asset rather than a file
    pub is_asset: bool,
    /// Package owning the asset, if any
    pub package_name: Option<String>,
    /// Volume (0.0 - 1.0)
    pub volume: f32,
    /// Repeat the source indefinitely
    pub looping: bool,
}

impl PlayerConfig {
    pub fn file(uri: impl Into<String>) -> Self {
        Self {
            source_uri: uri.into(),
            is_asset: false,
            package_name: None,
            volume: 1.0,
            looping: false,
        }
    }

    pub fn asset(uri: impl Into<String>, package_name: Option<String>) -> Self {
        Self {
            is_asset: true,
            package_name,
            ..Self::file(uri)
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_uri.is_empty() {
            return Err(AudioError::InvalidArgument("empty source uri".into()));
        }
        validate_volume(self.volume)
    }
}

/// Reject volumes outside [0.0, 1.0] (NaN included)
pub fn validate_volume(volume: f32) -> Result<()> {
    if (0.0..=1.0).contains(&volume) {
        Ok(())
    } else {
        Err(AudioError::InvalidArgument(format!(
            "Volume out of range: {}",
            volume
        )))
    }
}

/// Initialization state of a player handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// No backend attached yet, or the handle has been disposed
    Uninitialized,
    /// Backend attached; playback operations are accepted
    Ready,
}

/// Backend-internal playback state, mirroring the native player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Never started
    Idle,
    Playing,
    Paused,
    /// Reached the end of the media
    Ended,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        self == PlaybackState::Playing
    }
}
