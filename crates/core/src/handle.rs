// One registered player: configuration, backend and initialization state

use crate::callback::{ListenerHub, PlayingObserver};
use crate::error::{AudioError, Result};
use crate::player::PlaybackBackend;
use crate::state::{validate_volume, HandleState, PlaybackState, PlayerConfig, PlayerId};
use std::sync::Arc;

/// Wraps a backend with state checks
///
/// Nothing but `load` runs while the handle is `Uninitialized`, and `load`
/// succeeds at most once over the handle's lifetime.
pub struct PlayerHandle {
    id: PlayerId,
    config: PlayerConfig,
    backend: Option<Box<dyn PlaybackBackend>>,
    state: HandleState,
    // Still set after dispose, so a disposed handle cannot be loaded again
    loaded: bool,
    observing: bool,
}

impl PlayerHandle {
    pub fn new(id: PlayerId, config: PlayerConfig) -> Self {
        Self {
            id,
            config,
            backend: None,
            state: HandleState::Uninitialized,
            loaded: false,
            observing: false,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// The only Uninitialized -> Ready transition
    pub fn load(&mut self, backend: Box<dyn PlaybackBackend>) -> Result<()> {
        if self.loaded {
            return Err(AudioError::AlreadyInitialized(self.id));
        }
        self.backend = Some(backend);
        self.loaded = true;
        self.state = HandleState::Ready;
        log::info!("player {} ready ({})", self.id, self.config.source_uri);
        Ok(())
    }

    fn ready_backend(&mut self) -> Result<&mut Box<dyn PlaybackBackend>> {
        match (self.state, self.backend.as_mut()) {
            (HandleState::Ready, Some(backend)) => Ok(backend),
            _ => Err(AudioError::NotInitialized(self.id)),
        }
    }

    pub fn play(&mut self) -> Result<()> {
        self.ready_backend()?.play()
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ready_backend()?.pause()
    }

    pub fn resume(&mut self) -> Result<()> {
        self.ready_backend()?.resume()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.ready_backend()?.stop()
    }

    pub fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.ready_backend()?.seek(position_ms)
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        validate_volume(volume)?;
        self.ready_backend()?.set_volume(volume)?;
        self.config.volume = volume;
        Ok(())
    }

    pub fn position(&mut self) -> Result<Option<u64>> {
        self.ready_backend()?.position()
    }

    pub fn playback_state(&mut self) -> Result<PlaybackState> {
        Ok(self.ready_backend()?.state())
    }

    /// Attach a fresh watcher reporting to `hub`; no-op when already attached
    pub fn attach_observation(&mut self, hub: &Arc<ListenerHub>) -> Result<()> {
        if self.observing {
            return Ok(());
        }
        let observer = Arc::new(PlayingObserver::new(self.config.source_uri.clone(), hub));
        self.ready_backend()?.start_observation(observer);
        self.observing = true;
        log::debug!("player {} observation attached", self.id);
        Ok(())
    }

    pub fn detach_observation(&mut self) {
        if !self.observing {
            return;
        }
        if let Some(backend) = self.backend.as_mut() {
            backend.stop_observation();
        }
        self.observing = false;
        log::debug!("player {} observation detached", self.id);
    }

    /// Detach, stop and release the backend
    ///
    /// A failing stop does not prevent the release.
    pub fn dispose(&mut self) -> Result<()> {
        self.ready_backend()?;
        self.detach_observation();
        let mut backend = match self.backend.take() {
            Some(backend) => backend,
            None => return Err(AudioError::NotInitialized(self.id)),
        };
        self.state = HandleState::Uninitialized;
        if let Err(err) = backend.stop() {
            log::warn!("player {} stop during dispose failed: {}", self.id, err);
        }
        backend.release()?;
        log::info!("player {} disposed", self.id);
        Ok(())
    }
}
