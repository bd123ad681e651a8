// Adapters turning C function pointers into engine listeners and delegates

use chorus_core::{
    AudioError, PlaybackDelegate, PlayerConfig, PlayerId, PlayingListener, ResolvedSource, Result,
};
use std::ffi::{c_void, CString};
use std::os::raw::c_char;

/// Playing-state callback: `(source_uri, is_playing, user_data)`
pub type PlayingCallback = extern "C" fn(*const c_char, bool, *mut c_void);

/// Listener calling back into C
pub(crate) struct ForeignListener {
    callback: PlayingCallback,
    user_data: *mut c_void,
}

// SAFETY: the host promises `callback` may be called from any thread with
// `user_data` for as long as the listener stays subscribed.
unsafe impl Send for ForeignListener {}
unsafe impl Sync for ForeignListener {}

impl ForeignListener {
    pub(crate) fn new(callback: PlayingCallback, user_data: *mut c_void) -> Self {
        Self {
            callback,
            user_data,
        }
    }
}

impl PlayingListener for ForeignListener {
    fn on_playing_changed(&self, source_uri: &str, is_playing: bool) {
        match CString::new(source_uri) {
            Ok(uri) => (self.callback)(uri.as_ptr(), is_playing, self.user_data),
            Err(_) => log::warn!("dropping notification for uri with interior NUL"),
        }
    }
}

/// Delegate vtable supplied by the host
///
/// Every entry returns 0 on success or a negated error code. `position`
/// returns 1 when the player has no position. A null `dispose` means the
/// delegate cannot dispose players.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ChorusDelegate {
    pub user_data: *mut c_void,
    /// `(user_data, id, source_uri, location, volume, looping)`
    pub load: extern "C" fn(*mut c_void, i64, *const c_char, *const c_char, f32, bool) -> i32,
    pub dispose: Option<extern "C" fn(*mut c_void, i64) -> i32>,
    pub play: extern "C" fn(*mut c_void, i64) -> i32,
    pub pause: extern "C" fn(*mut c_void, i64) -> i32,
    pub resume: extern "C" fn(*mut c_void, i64) -> i32,
    pub stop: extern "C" fn(*mut c_void, i64) -> i32,
    pub seek: extern "C" fn(*mut c_void, i64, i64) -> i32,
    pub set_volume: extern "C" fn(*mut c_void, i64, f32) -> i32,
    pub position: extern "C" fn(*mut c_void, i64, *mut i64) -> i32,
}

pub(crate) struct ForeignDelegate {
    vtable: ChorusDelegate,
}

// SAFETY: the host promises every vtable entry is callable from any thread
// with `user_data` until the delegate is cleared.
unsafe impl Send for ForeignDelegate {}
unsafe impl Sync for ForeignDelegate {}

impl ForeignDelegate {
    pub(crate) fn new(vtable: ChorusDelegate) -> Self {
        Self { vtable }
    }
}

pub(crate) fn raw_id(id: PlayerId) -> i64 {
    i64::try_from(id.as_u64()).unwrap_or(i64::MAX)
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| AudioError::InvalidArgument(format!("interior NUL in {:?}", value)))
}

/// Map a status returned by the host back onto an engine error
pub(crate) fn status_to_result(status: i32, id: PlayerId, op: &str) -> Result<()> {
    if status >= 0 {
        return Ok(());
    }
    let detail = format!("delegate {} failed for player {}", op, id);
    Err(match status.saturating_neg() {
        AudioError::UNKNOWN_PLAYER => AudioError::UnknownPlayer(id),
        AudioError::NOT_INITIALIZED => AudioError::NotInitialized(id),
        AudioError::ALREADY_INITIALIZED => AudioError::AlreadyInitialized(id),
        AudioError::SOURCE_UNAVAILABLE => AudioError::SourceUnavailable(detail),
        AudioError::INVALID_ARGUMENT => AudioError::InvalidArgument(detail),
        AudioError::NOT_IMPLEMENTED => AudioError::NotImplemented(detail),
        _ => AudioError::BackendFailure(format!("{} (status {})", detail, status)),
    })
}

impl PlaybackDelegate for ForeignDelegate {
    fn load(&self, id: PlayerId, source: &ResolvedSource, config: &PlayerConfig) -> Result<()> {
        let uri = c_string(&source.uri)?;
        let location = c_string(&source.location.to_string_lossy())?;
        let status = (self.vtable.load)(
            self.vtable.user_data,
            raw_id(id),
            uri.as_ptr(),
            location.as_ptr(),
            config.volume,
            config.looping,
        );
        status_to_result(status, id, "load")
    }

    fn dispose(&self, id: PlayerId) -> Result<()> {
        match self.vtable.dispose {
            Some(dispose) => status_to_result(dispose(self.vtable.user_data, raw_id(id)), id, "dispose"),
            None => Err(AudioError::NotImplemented(format!(
                "delegate does not dispose player {}",
                id
            ))),
        }
    }

    fn play(&self, id: PlayerId) -> Result<()> {
        status_to_result((self.vtable.play)(self.vtable.user_data, raw_id(id)), id, "play")
    }

    fn pause(&self, id: PlayerId) -> Result<()> {
        status_to_result((self.vtable.pause)(self.vtable.user_data, raw_id(id)), id, "pause")
    }

    fn resume(&self, id: PlayerId) -> Result<()> {
        status_to_result((self.vtable.resume)(self.vtable.user_data, raw_id(id)), id, "resume")
    }

    fn stop(&self, id: PlayerId) -> Result<()> {
        status_to_result((self.vtable.stop)(self.vtable.user_data, raw_id(id)), id, "stop")
    }

    fn seek(&self, id: PlayerId, position_ms: u64) -> Result<()> {
        let position = i64::try_from(position_ms).unwrap_or(i64::MAX);
        let status = (self.vtable.seek)(self.vtable.user_data, raw_id(id), position);
        status_to_result(status, id, "seek")
    }

    fn set_volume(&self, id: PlayerId, volume: f32) -> Result<()> {
        let status = (self.vtable.set_volume)(self.vtable.user_data, raw_id(id), volume);
        status_to_result(status, id, "set_volume")
    }

    fn position(&self, id: PlayerId) -> Result<Option<u64>> {
        let mut position: i64 = 0;
        let status = (self.vtable.position)(self.vtable.user_data, raw_id(id), &mut position);
        status_to_result(status, id, "position")?;
        if status == 1 {
            return Ok(None);
        }
        u64::try_from(position)
            .map(Some)
            .map_err(|_| AudioError::BackendFailure(format!("delegate reported position {}", position)))
    }

    fn supports_dispose(&self) -> bool {
        self.vtable.dispose.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let id = PlayerId(3);
        assert_eq!(status_to_result(0, id, "play"), Ok(()));
        assert_eq!(status_to_result(1, id, "position"), Ok(()));
        assert_eq!(
            status_to_result(-AudioError::UNKNOWN_PLAYER, id, "play"),
            Err(AudioError::UnknownPlayer(id))
        );
        assert_eq!(
            status_to_result(-AudioError::NOT_INITIALIZED, id, "play"),
            Err(AudioError::NotInitialized(id))
        );
        assert!(matches!(
            status_to_result(-AudioError::SOURCE_UNAVAILABLE, id, "load"),
            Err(AudioError::SourceUnavailable(_))
        ));
        assert!(matches!(
            status_to_result(-99, id, "play"),
            Err(AudioError::BackendFailure(_))
        ));
        assert!(matches!(
            status_to_result(i32::MIN, id, "play"),
            Err(AudioError::BackendFailure(_))
        ));
    }

    #[test]
    fn test_raw_id_saturates() {
        assert_eq!(raw_id(PlayerId(7)), 7);
        assert_eq!(raw_id(PlayerId(u64::MAX)), i64::MAX);
    }
}
