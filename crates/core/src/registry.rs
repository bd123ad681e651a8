// Process-scoped player registry
//
// The id counter and the id -> handle map share one mutex that is held only
// for insert/remove/lookup. Backend calls happen under the per-player lock
// after the map lock has been released. Playing-state edges raised during a
// call are delivered once that per-player lock is dropped.

use crate::callback::{ListenerHub, NotificationScope, PlayingListener, Transition};
use crate::delegate::PlaybackDelegate;
use crate::error::{AudioError, Result};
use crate::handle::PlayerHandle;
use crate::player::BackendFactory;
use crate::source::{resolve_source, AssetResolver};
use crate::state::{validate_volume, HandleState, PlaybackState, PlayerConfig, PlayerId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered player, shared between the map and in-flight operations
pub type SharedHandle = Arc<Mutex<PlayerHandle>>;

struct PlayerTable {
    next_id: u64,
    players: HashMap<PlayerId, SharedHandle>,
}

/// Owns every player, the listener hub and the optional delegate
///
/// Listeners are called with no player locked and may call back into the
/// registry, including for the player that reported the change.
pub struct PlayerRegistry {
    table: Mutex<PlayerTable>,
    listeners: Arc<ListenerHub>,
    // Serializes subscriber-set transitions with attach/detach fan-out
    observation: Mutex<()>,
    delegate: RwLock<Option<Arc<dyn PlaybackDelegate>>>,
    factory: Arc<dyn BackendFactory>,
    resolver: Arc<dyn AssetResolver>,
}

impl PlayerRegistry {
    pub fn new(factory: Arc<dyn BackendFactory>, resolver: Arc<dyn AssetResolver>) -> Self {
        Self {
            table: Mutex::new(PlayerTable {
                next_id: 0,
                players: HashMap::new(),
            }),
            listeners: Arc::new(ListenerHub::new()),
            observation: Mutex::new(()),
            delegate: RwLock::new(None),
            factory,
            resolver,
        }
    }

    fn allocate_id(&self) -> PlayerId {
        let mut table = self.table.lock();
        let id = PlayerId(table.next_id);
        table.next_id += 1;
        id
    }

    fn delegate(&self) -> Option<Arc<dyn PlaybackDelegate>> {
        self.delegate.read().clone()
    }

    /// Install (or with `None`, remove) the delegate override
    ///
    /// Installing replaces any previous delegate. Built-in players are kept
    /// and become reachable again once the delegate is removed.
    pub fn set_delegate(&self, delegate: Option<Arc<dyn PlaybackDelegate>>) {
        let installed = delegate.is_some();
        *self.delegate.write() = delegate;
        log::info!(
            "delegate override {}",
            if installed { "installed" } else { "removed" }
        );
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.read().is_some()
    }

    /// Create a player and return its id
    pub fn load(&self, config: PlayerConfig) -> Result<PlayerId> {
        config.validate()?;
        let id = self.allocate_id();
        let source = resolve_source(&config, self.resolver.as_ref()).map_err(|err| {
            log::warn!("player {} could not resolve {}: {}", id, config.source_uri, err);
            err
        })?;

        if let Some(delegate) = self.delegate() {
            log::info!("player {} loading through delegate", id);
            delegate.load(id, &source, &config)?;
            return Ok(id);
        }

        let backend = self.factory.create_backend(&source, &config).map_err(|err| {
            log::warn!("player {} backend creation failed: {}", id, err);
            err
        })?;
        let mut handle = PlayerHandle::new(id, config);
        handle.load(backend)?;

        // Attach before publishing so a failure leaves nothing behind
        let _gate = self.observation.lock();
        if self.listeners.is_active() {
            if let Err(err) = handle.attach_observation(&self.listeners) {
                log::warn!("player {} observation failed: {}", id, err);
                if let Err(teardown) = handle.dispose() {
                    log::warn!("player {} teardown failed: {}", id, teardown);
                }
                return Err(err);
            }
        }
        self.table
            .lock()
            .players
            .insert(id, Arc::new(Mutex::new(handle)));
        Ok(id)
    }

    pub fn get(&self, id: PlayerId) -> Result<SharedHandle> {
        self.table
            .lock()
            .players
            .get(&id)
            .cloned()
            .ok_or(AudioError::UnknownPlayer(id))
    }

    fn with_player<R>(&self, id: PlayerId, f: impl FnOnce(&mut PlayerHandle) -> Result<R>) -> Result<R> {
        let handle = self.get(id)?;
        let _scope = NotificationScope::enter();
        let mut handle = handle.lock();
        f(&mut handle)
    }

    pub fn play(&self, id: PlayerId) -> Result<()> {
        match self.delegate() {
            Some(delegate) => delegate.play(id),
            None => self.with_player(id, |p| p.play()),
        }
    }

    pub fn pause(&self, id: PlayerId) -> Result<()> {
        match self.delegate() {
            Some(delegate) => delegate.pause(id),
            None => self.with_player(id, |p| p.pause()),
        }
    }

    pub fn resume(&self, id: PlayerId) -> Result<()> {
        match self.delegate() {
            Some(delegate) => delegate.resume(id),
            None => self.with_player(id, |p| p.resume()),
        }
    }

    pub fn stop(&self, id: PlayerId) -> Result<()> {
        match self.delegate() {
            Some(delegate) => delegate.stop(id),
            None => self.with_player(id, |p| p.stop()),
        }
    }

    pub fn seek(&self, id: PlayerId, position_ms: u64) -> Result<()> {
        match self.delegate() {
            Some(delegate) => delegate.seek(id, position_ms),
            None => self.with_player(id, |p| p.seek(position_ms)),
        }
    }

    pub fn set_volume(&self, id: PlayerId, volume: f32) -> Result<()> {
        match self.delegate() {
            Some(delegate) => {
                validate_volume(volume)?;
                delegate.set_volume(id, volume)
            }
            None => self.with_player(id, |p| p.set_volume(volume)),
        }
    }

    pub fn position(&self, id: PlayerId) -> Result<Option<u64>> {
        match self.delegate() {
            Some(delegate) => delegate.position(id),
            None => self.with_player(id, |p| p.position()),
        }
    }

    /// Backend playback state of a built-in player
    pub fn playback_state(&self, id: PlayerId) -> Result<PlaybackState> {
        self.with_player(id, |p| p.playback_state())
    }

    /// Tear a player down; its id is never handed out again
    pub fn dispose(&self, id: PlayerId) -> Result<()> {
        if let Some(delegate) = self.delegate() {
            if !delegate.supports_dispose() {
                return Err(AudioError::NotImplemented(format!(
                    "delegate does not dispose player {}",
                    id
                )));
            }
            return delegate.dispose(id);
        }

        let handle = self.get(id)?;
        let _scope = NotificationScope::enter();
        let (result, torn_down) = {
            let mut handle = handle.lock();
            let result = handle.dispose();
            (result, handle.state() == HandleState::Uninitialized)
        };
        // Once teardown has started the id is gone, even if release failed
        if torn_down {
            self.table.lock().players.remove(&id);
        }
        result
    }

    /// Dispose every built-in player, reporting the first failure
    pub fn dispose_all(&self) -> Result<()> {
        let handles: Vec<(PlayerId, SharedHandle)> = self.table.lock().players.drain().collect();
        let _scope = NotificationScope::enter();
        let mut first_error = None;
        for (id, handle) in handles {
            if let Err(err) = handle.lock().dispose() {
                log::warn!("player {} dispose failed: {}", id, err);
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Ids of the built-in players, ascending
    pub fn player_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.table.lock().players.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn snapshot(&self) -> Vec<SharedHandle> {
        self.table.lock().players.values().cloned().collect()
    }

    /// Subscribe a listener; the first subscriber turns observation on for
    /// every player
    pub fn add_listener(&self, subscriber_id: impl Into<String>, listener: Arc<dyn PlayingListener>) {
        let _gate = self.observation.lock();
        if self.listeners.subscribe(subscriber_id, listener) == Transition::BecameActive {
            for handle in self.snapshot() {
                let mut handle = handle.lock();
                if let Err(err) = handle.attach_observation(&self.listeners) {
                    log::debug!("skipping observation for player {}: {}", handle.id(), err);
                }
            }
        }
    }

    /// Unsubscribe a listener; the last one leaving turns observation off
    pub fn remove_listener(&self, subscriber_id: &str) {
        let _gate = self.observation.lock();
        if self.listeners.unsubscribe(subscriber_id) == Transition::BecameIdle {
            for handle in self.snapshot() {
                handle.lock().detach_observation();
            }
        }
    }

    /// Push an event to every subscriber; used by delegates that drive their
    /// own playback
    pub fn notify_listeners(&self, source_uri: &str, is_playing: bool) {
        self.listeners.notify(source_uri, is_playing);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Drop for PlayerRegistry {
    fn drop(&mut self) {
        if let Err(err) = self.dispose_all() {
            log::warn!("registry teardown: {}", err);
        }
    }
}
