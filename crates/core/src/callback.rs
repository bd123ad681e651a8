// Playing-state notifications fanned out to subscribers
//
// Backends report edge-triggered "is playing" changes through a
// `PlayingObserver`; the observer forwards to the `ListenerHub`, which calls
// every subscriber with the load-time source URI.
//
// Edges raised on a thread inside a `NotificationScope` are queued and
// delivered when the outermost scope on that thread closes, after the
// caller has released its player lock.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

type QueuedEdge = (Weak<ListenerHub>, String, bool);

#[derive(Default)]
struct Deferral {
    depth: usize,
    queued: Vec<QueuedEdge>,
}

thread_local! {
    static DEFERRAL: RefCell<Deferral> = RefCell::new(Deferral::default());
}

/// Holds back notifications raised on the current thread until dropped
///
/// Scopes nest; queued edges go out in order when the outermost one drops.
pub struct NotificationScope {
    // Tied to the thread whose queue it drains
    _thread_bound: PhantomData<*const ()>,
}

impl NotificationScope {
    pub fn enter() -> Self {
        DEFERRAL.with(|deferral| deferral.borrow_mut().depth += 1);
        Self {
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for NotificationScope {
    fn drop(&mut self) {
        let ready = DEFERRAL.with(|deferral| {
            let mut deferral = deferral.borrow_mut();
            deferral.depth = deferral.depth.saturating_sub(1);
            if deferral.depth == 0 {
                std::mem::take(&mut deferral.queued)
            } else {
                Vec::new()
            }
        });
        for (hub, source_uri, is_playing) in ready {
            if let Some(hub) = hub.upgrade() {
                hub.notify(&source_uri, is_playing);
            }
        }
    }
}

/// Deliver now, or queue when the current thread is inside a scope
fn dispatch(hub: &Weak<ListenerHub>, source_uri: &str, is_playing: bool) {
    let deferred = DEFERRAL.with(|deferral| {
        let mut deferral = deferral.borrow_mut();
        if deferral.depth > 0 {
            deferral
                .queued
                .push((hub.clone(), source_uri.to_string(), is_playing));
            true
        } else {
            false
        }
    });
    if !deferred {
        if let Some(hub) = hub.upgrade() {
            hub.notify(source_uri, is_playing);
        }
    }
}

/// Subscriber interface
/// Implementations should be lightweight; they run on whatever thread the
/// native backend reports its state change from.
pub trait PlayingListener: Send + Sync {
    fn on_playing_changed(&self, source_uri: &str, is_playing: bool);
}

impl<F> PlayingListener for F
where
    F: Fn(&str, bool) + Send + Sync,
{
    fn on_playing_changed(&self, source_uri: &str, is_playing: bool) {
        self(source_uri, is_playing)
    }
}

/// Result of changing the subscriber set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The set went from empty to non-empty
    BecameActive,
    /// The set went from non-empty to empty
    BecameIdle,
    Unchanged,
}

/// Subscriber map keyed by subscriber id
pub struct ListenerHub {
    listeners: Mutex<HashMap<String, Arc<dyn PlayingListener>>>,
}

impl ListenerHub {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Insert or replace the listener registered under `subscriber_id`
    pub fn subscribe(
        &self,
        subscriber_id: impl Into<String>,
        listener: Arc<dyn PlayingListener>,
    ) -> Transition {
        let mut listeners = self.listeners.lock();
        let was_empty = listeners.is_empty();
        listeners.insert(subscriber_id.into(), listener);
        if was_empty {
            Transition::BecameActive
        } else {
            Transition::Unchanged
        }
    }

    pub fn unsubscribe(&self, subscriber_id: &str) -> Transition {
        let mut listeners = self.listeners.lock();
        if listeners.remove(subscriber_id).is_some() && listeners.is_empty() {
            Transition::BecameIdle
        } else {
            Transition::Unchanged
        }
    }

    pub fn is_active(&self) -> bool {
        !self.listeners.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Deliver one event to every current subscriber
    ///
    /// The map is snapshotted first, so a slow subscriber never holds the
    /// lock and subscribers may (un)subscribe from inside their callback.
    pub fn notify(&self, source_uri: &str, is_playing: bool) {
        let snapshot: Vec<Arc<dyn PlayingListener>> =
            self.listeners.lock().values().cloned().collect();
        log::debug!(
            "notify {} playing={} -> {} listener(s)",
            source_uri,
            is_playing,
            snapshot.len()
        );
        for listener in snapshot {
            listener.on_playing_changed(source_uri, is_playing);
        }
    }
}

impl Default for ListenerHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge-triggered watcher attached to one backend
///
/// Repeated reports of the same value are dropped. A fresh observer is
/// created for every attach, so it holds only a weak link to the hub.
pub struct PlayingObserver {
    source_uri: String,
    hub: Weak<ListenerHub>,
    last: Mutex<Option<bool>>,
}

impl PlayingObserver {
    pub fn new(source_uri: impl Into<String>, hub: &Arc<ListenerHub>) -> Self {
        Self {
            source_uri: source_uri.into(),
            hub: Arc::downgrade(hub),
            last: Mutex::new(None),
        }
    }

    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    /// Report the current native playing state
    pub fn observe(&self, is_playing: bool) {
        {
            let mut last = self.last.lock();
            if *last == Some(is_playing) {
                return;
            }
            *last = Some(is_playing);
        }
        dispatch(&self.hub, &self.source_uri, is_playing);
    }
}

/// Recording listener for tests
#[cfg(test)]
pub struct TestListener {
    events: Mutex<Vec<(String, bool)>>,
}

#[cfg(test)]
impl TestListener {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn get_events(&self) -> Vec<(String, bool)> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
impl PlayingListener for TestListener {
    fn on_playing_changed(&self, source_uri: &str, is_playing: bool) {
        self.events.lock().push((source_uri.to_string(), is_playing));
    }
}
