// C ABI for the Chorus audio engine
//
// One process-wide `PlayerRegistry` sits behind `ENGINE`. Every entry point
// clones the registry handle out of the global and releases the global lock
// before touching players, so listener callbacks may call back into the API,
// including for the player that raised the event.
//
// Status-returning calls give 0 on success and `-code` on failure, where
// `code` is `AudioError::code`.

pub mod config;
pub mod foreign;

pub use config::{parse_level, EngineConfig};
pub use foreign::{ChorusDelegate, PlayingCallback};

use chorus_backend::headless_factory;
use chorus_core::{
    AudioError, DirectoryAssetResolver, PlaybackState, PlayerConfig, PlayerId, PlayerRegistry,
    Result,
};
use foreign::{raw_id, ForeignDelegate, ForeignListener};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::sync::{Arc, Once};

static ENGINE: Lazy<Mutex<Option<Arc<PlayerRegistry>>>> = Lazy::new(|| Mutex::new(None));
static INIT_LOGGER: Once = Once::new();

fn init_logging(level: log::LevelFilter) {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder()
            .is_test(false)
            .filter_level(level)
            .try_init();
    });
}

fn build_engine(config: &EngineConfig) -> Arc<PlayerRegistry> {
    init_logging(config.log_level);
    log::info!(
        "building engine with assets root {}",
        config.assets_root.display()
    );
    Arc::new(PlayerRegistry::new(
        Arc::new(headless_factory()),
        Arc::new(DirectoryAssetResolver::new(config.assets_root.clone())),
    ))
}

/// The global engine, built from the environment on first use
fn engine() -> Arc<PlayerRegistry> {
    ENGINE
        .lock()
        .get_or_insert_with(|| build_engine(&EngineConfig::from_env()))
        .clone()
}

fn to_code(err: &AudioError) -> i32 {
    -err.code()
}

fn status(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            log::error!("FFI error: {}", err);
            to_code(&err)
        }
    }
}

fn parse_id(raw: i64) -> Result<PlayerId> {
    u64::try_from(raw)
        .map(PlayerId)
        .map_err(|_| AudioError::InvalidArgument(format!("negative player id {}", raw)))
}

/// Borrow a C string; null and non-UTF-8 input are rejected
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the call.
unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(AudioError::InvalidArgument(format!("{} is null", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| AudioError::InvalidArgument(format!("{} is not valid UTF-8", what)))
}

unsafe fn read_optional_str<'a>(ptr: *const c_char, what: &str) -> Result<Option<&'a str>> {
    if ptr.is_null() {
        Ok(None)
    } else {
        read_str(ptr, what).map(Some)
    }
}

fn with_player(raw: i64, f: impl FnOnce(&PlayerRegistry, PlayerId) -> Result<()>) -> i32 {
    status(parse_id(raw).and_then(|id| f(&engine(), id)))
}

// -------------------------------
// Engine lifecycle
// -------------------------------

/// Build (or rebuild) the engine; null arguments fall back to the environment
///
/// A previously running engine is shut down first.
///
/// # Safety
/// Non-null arguments must be NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn chorus_engine_init(
    assets_root: *const c_char,
    log_level: *const c_char,
) -> i32 {
    let mut config = EngineConfig::from_env();
    match read_optional_str(assets_root, "assets_root") {
        Ok(Some(root)) => config = config.with_assets_root(root),
        Ok(None) => {}
        Err(err) => return to_code(&err),
    }
    match read_optional_str(log_level, "log_level") {
        Ok(Some(name)) => match parse_level(name) {
            Some(level) => config = config.with_log_level(level),
            None => {
                return to_code(&AudioError::InvalidArgument(format!(
                    "unknown log level {}",
                    name
                )))
            }
        },
        Ok(None) => {}
        Err(err) => return to_code(&err),
    }

    let previous = ENGINE.lock().replace(build_engine(&config));
    match previous {
        Some(old) => status(old.dispose_all()),
        None => 0,
    }
}

/// Dispose every player and drop the engine
#[no_mangle]
pub extern "C" fn chorus_engine_shutdown() -> i32 {
    let previous = ENGINE.lock().take();
    match previous {
        Some(engine) => {
            log::info!("shutting down engine");
            status(engine.dispose_all())
        }
        None => 0,
    }
}

// -------------------------------
// Players
// -------------------------------

/// Load a player; returns its id or a negated error code
///
/// # Safety
/// `uri` must be a NUL-terminated string; `package_name` may be null.
#[no_mangle]
pub unsafe extern "C" fn chorus_player_load(
    uri: *const c_char,
    is_asset: bool,
    package_name: *const c_char,
    volume: f32,
    looping: bool,
) -> i64 {
    let config = read_str(uri, "uri").and_then(|uri| {
        let package = read_optional_str(package_name, "package_name")?.map(str::to_string);
        let base = if is_asset {
            PlayerConfig::asset(uri, package)
        } else {
            PlayerConfig::file(uri)
        };
        Ok(base.with_volume(volume).with_looping(looping))
    });

    match config.and_then(|config| engine().load(config)) {
        Ok(id) => raw_id(id),
        Err(err) => {
            log::error!("FFI load failed: {}", err);
            i64::from(to_code(&err))
        }
    }
}

#[no_mangle]
pub extern "C" fn chorus_player_play(player_id: i64) -> i32 {
    with_player(player_id, |engine, id| engine.play(id))
}

#[no_mangle]
pub extern "C" fn chorus_player_pause(player_id: i64) -> i32 {
    with_player(player_id, |engine, id| engine.pause(id))
}

#[no_mangle]
pub extern "C" fn chorus_player_resume(player_id: i64) -> i32 {
    with_player(player_id, |engine, id| engine.resume(id))
}

#[no_mangle]
pub extern "C" fn chorus_player_stop(player_id: i64) -> i32 {
    with_player(player_id, |engine, id| engine.stop(id))
}

#[no_mangle]
pub extern "C" fn chorus_player_seek(player_id: i64, position_ms: i64) -> i32 {
    with_player(player_id, |engine, id| {
        let position = u64::try_from(position_ms).map_err(|_| {
            AudioError::InvalidArgument(format!("negative seek position {}", position_ms))
        })?;
        engine.seek(id, position)
    })
}

#[no_mangle]
pub extern "C" fn chorus_player_set_volume(player_id: i64, volume: f32) -> i32 {
    with_player(player_id, |engine, id| engine.set_volume(id, volume))
}

/// Write the position in milliseconds to `out`
///
/// Returns 0 when written, 1 when the player has no position yet, or a
/// negated error code.
///
/// # Safety
/// `out` must be null or valid for a write of one `i64`.
#[no_mangle]
pub unsafe extern "C" fn chorus_player_position(player_id: i64, out: *mut i64) -> i32 {
    if out.is_null() {
        return to_code(&AudioError::InvalidArgument("position out pointer is null".into()));
    }
    let position = parse_id(player_id).and_then(|id| engine().position(id));
    match position {
        Ok(Some(ms)) => {
            *out = i64::try_from(ms).unwrap_or(i64::MAX);
            0
        }
        Ok(None) => 1,
        Err(err) => {
            log::error!("FFI error: {}", err);
            to_code(&err)
        }
    }
}

/// Backend state of a built-in player: 0 idle, 1 playing, 2 paused, 3 ended
#[no_mangle]
pub extern "C" fn chorus_player_state(player_id: i64) -> i32 {
    match parse_id(player_id).and_then(|id| engine().playback_state(id)) {
        Ok(PlaybackState::Idle) => 0,
        Ok(PlaybackState::Playing) => 1,
        Ok(PlaybackState::Paused) => 2,
        Ok(PlaybackState::Ended) => 3,
        Err(err) => {
            log::error!("FFI error: {}", err);
            to_code(&err)
        }
    }
}

#[no_mangle]
pub extern "C" fn chorus_player_dispose(player_id: i64) -> i32 {
    with_player(player_id, |engine, id| engine.dispose(id))
}

// -------------------------------
// Listeners
// -------------------------------

/// Subscribe `callback` under `subscriber_id`, replacing any previous one
///
/// # Safety
/// `subscriber_id` must be a NUL-terminated string. `callback` must stay
/// callable from any thread with `user_data` until it is removed.
#[no_mangle]
pub unsafe extern "C" fn chorus_add_listener(
    subscriber_id: *const c_char,
    callback: Option<PlayingCallback>,
    user_data: *mut c_void,
) -> i32 {
    let subscribed = read_str(subscriber_id, "subscriber_id").and_then(|subscriber| {
        let callback = callback
            .ok_or_else(|| AudioError::InvalidArgument("listener callback is null".into()))?;
        engine().add_listener(subscriber, Arc::new(ForeignListener::new(callback, user_data)));
        Ok(())
    });
    status(subscribed)
}

/// # Safety
/// `subscriber_id` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn chorus_remove_listener(subscriber_id: *const c_char) -> i32 {
    status(read_str(subscriber_id, "subscriber_id").map(|subscriber| {
        engine().remove_listener(subscriber);
    }))
}

/// Push an event to every subscriber; for delegates driving their own playback
///
/// # Safety
/// `source_uri` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn chorus_notify_listeners(source_uri: *const c_char, is_playing: bool) -> i32 {
    status(read_str(source_uri, "source_uri").map(|uri| {
        engine().notify_listeners(uri, is_playing);
    }))
}

// -------------------------------
// Delegate override
// -------------------------------

/// Route every player operation to `delegate` instead of the built-in backends
///
/// # Safety
/// `delegate` must be null or point to a valid `ChorusDelegate`; its entries
/// must stay callable from any thread until the delegate is cleared.
#[no_mangle]
pub unsafe extern "C" fn chorus_set_delegate(delegate: *const ChorusDelegate) -> i32 {
    if delegate.is_null() {
        return to_code(&AudioError::InvalidArgument("delegate is null".into()));
    }
    engine().set_delegate(Some(Arc::new(ForeignDelegate::new(*delegate))));
    0
}

/// Return to the built-in backends
#[no_mangle]
pub extern "C" fn chorus_clear_delegate() -> i32 {
    engine().set_delegate(None);
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::path::{Path, PathBuf};
    use std::ptr;

    // The engine is process-global; tests touching it run one at a time
    static SERIAL: Mutex<()> = parking_lot::const_mutex(());

    fn assets_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("chorus-ffi-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// One second of 8 kHz mono silence
    fn write_beep(dir: &Path) {
        let frames: u32 = 8000;
        let data_len = frames * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&8000u32.to_le_bytes());
        bytes.extend_from_slice(&16000u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(44 + data_len as usize, 0);
        std::fs::write(dir.join("beep.wav"), bytes).unwrap();
    }

    fn init_engine(dir: &Path) {
        let root = CString::new(dir.to_string_lossy().as_bytes()).unwrap();
        let level = CString::new("debug").unwrap();
        assert_eq!(unsafe { chorus_engine_init(root.as_ptr(), level.as_ptr()) }, 0);
    }

    fn load_beep() -> i64 {
        let uri = CString::new("beep.wav").unwrap();
        unsafe { chorus_player_load(uri.as_ptr(), true, ptr::null(), 0.8, false) }
    }

    #[test]
    fn test_error_codes_are_negative_and_distinct() {
        let errors = [
            AudioError::UnknownPlayer(PlayerId(1)),
            AudioError::NotInitialized(PlayerId(1)),
            AudioError::AlreadyInitialized(PlayerId(1)),
            AudioError::SourceUnavailable(String::new()),
            AudioError::BackendFailure(String::new()),
            AudioError::InvalidArgument(String::new()),
            AudioError::NotImplemented(String::new()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(to_code).collect();
        assert!(codes.iter().all(|code| *code < 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_player_lifecycle_over_c_abi() {
        let _serial = SERIAL.lock();
        let dir = assets_dir("lifecycle");
        write_beep(&dir);
        init_engine(&dir);

        let id = load_beep();
        assert!(id >= 0);
        assert_eq!(chorus_player_play(id), 0);
        assert_eq!(chorus_player_state(id), 1);
        assert_eq!(chorus_player_pause(id), 0);
        assert_eq!(chorus_player_seek(id, 400), 0);

        let mut position = -1;
        assert_eq!(unsafe { chorus_player_position(id, &mut position) }, 0);
        assert_eq!(position, 400);

        assert_eq!(chorus_player_set_volume(id, 1.5), -AudioError::INVALID_ARGUMENT);
        assert_eq!(chorus_player_seek(id, -5), -AudioError::INVALID_ARGUMENT);
        assert_eq!(chorus_player_dispose(id), 0);
        assert_eq!(
            unsafe { chorus_player_position(id, &mut position) },
            -AudioError::UNKNOWN_PLAYER
        );

        assert_eq!(chorus_engine_shutdown(), 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_bad_input_is_rejected() {
        let _serial = SERIAL.lock();
        let dir = assets_dir("bad-input");
        init_engine(&dir);

        assert_eq!(
            unsafe { chorus_player_load(ptr::null(), false, ptr::null(), 1.0, false) },
            i64::from(-AudioError::INVALID_ARGUMENT)
        );
        let missing = CString::new("missing.wav").unwrap();
        assert_eq!(
            unsafe { chorus_player_load(missing.as_ptr(), true, ptr::null(), 1.0, false) },
            i64::from(-AudioError::SOURCE_UNAVAILABLE)
        );
        assert_eq!(chorus_player_play(999), -AudioError::UNKNOWN_PLAYER);
        assert_eq!(chorus_player_play(-1), -AudioError::INVALID_ARGUMENT);
        assert_eq!(
            unsafe { chorus_player_position(0, ptr::null_mut()) },
            -AudioError::INVALID_ARGUMENT
        );
        let level = CString::new("chatty").unwrap();
        assert_eq!(
            unsafe { chorus_engine_init(ptr::null(), level.as_ptr()) },
            -AudioError::INVALID_ARGUMENT
        );

        assert_eq!(chorus_engine_shutdown(), 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    static EVENTS: Mutex<Vec<(String, bool)>> = parking_lot::const_mutex(Vec::new());

    extern "C" fn record_event(uri: *const c_char, is_playing: bool, _user_data: *mut c_void) {
        let uri = unsafe { CStr::from_ptr(uri) }.to_string_lossy().into_owned();
        EVENTS.lock().push((uri, is_playing));
    }

    #[test]
    fn test_listener_receives_edges() {
        let _serial = SERIAL.lock();
        let dir = assets_dir("listener");
        write_beep(&dir);
        init_engine(&dir);
        EVENTS.lock().clear();

        let subscriber = CString::new("ui").unwrap();
        assert_eq!(
            unsafe { chorus_add_listener(subscriber.as_ptr(), Some(record_event), ptr::null_mut()) },
            0
        );
        assert_eq!(
            unsafe { chorus_add_listener(subscriber.as_ptr(), None, ptr::null_mut()) },
            -AudioError::INVALID_ARGUMENT
        );

        let id = load_beep();
        chorus_player_play(id);
        chorus_player_pause(id);
        chorus_player_pause(id);
        assert_eq!(unsafe { chorus_remove_listener(subscriber.as_ptr()) }, 0);
        chorus_player_play(id);

        assert_eq!(
            *EVENTS.lock(),
            vec![("beep.wav".to_string(), true), ("beep.wav".to_string(), false)]
        );

        assert_eq!(chorus_engine_shutdown(), 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    static STATES_SEEN: Mutex<Vec<(bool, i32)>> = parking_lot::const_mutex(Vec::new());

    /// Reads back the state of the player whose id `user_data` points at
    extern "C" fn query_own_player(_uri: *const c_char, is_playing: bool, user_data: *mut c_void) {
        let id = unsafe { *(user_data as *const i64) };
        let mut position = -1;
        unsafe { chorus_player_position(id, &mut position) };
        STATES_SEEN.lock().push((is_playing, chorus_player_state(id)));
    }

    #[test]
    fn test_listener_can_call_back_for_the_same_player() {
        let _serial = SERIAL.lock();
        let dir = assets_dir("reentry");
        write_beep(&dir);
        init_engine(&dir);
        STATES_SEEN.lock().clear();

        let mut id: i64 = load_beep();
        let subscriber = CString::new("ui").unwrap();
        let user_data = &mut id as *mut i64 as *mut c_void;
        assert_eq!(
            unsafe { chorus_add_listener(subscriber.as_ptr(), Some(query_own_player), user_data) },
            0
        );

        assert_eq!(chorus_player_play(id), 0);
        assert_eq!(chorus_player_pause(id), 0);
        assert_eq!(unsafe { chorus_remove_listener(subscriber.as_ptr()) }, 0);

        assert_eq!(*STATES_SEEN.lock(), vec![(true, 1), (false, 2)]);

        assert_eq!(chorus_engine_shutdown(), 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    static DELEGATE_CALLS: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

    extern "C" fn delegate_load(
        _user_data: *mut c_void,
        id: i64,
        uri: *const c_char,
        _location: *const c_char,
        volume: f32,
        looping: bool,
    ) -> i32 {
        let uri = unsafe { CStr::from_ptr(uri) }.to_string_lossy().into_owned();
        DELEGATE_CALLS
            .lock()
            .push(format!("load {} {} {} {}", id, uri, volume, looping));
        0
    }

    extern "C" fn delegate_play(_user_data: *mut c_void, id: i64) -> i32 {
        DELEGATE_CALLS.lock().push(format!("play {}", id));
        0
    }

    extern "C" fn delegate_missing(_user_data: *mut c_void, _id: i64) -> i32 {
        -AudioError::UNKNOWN_PLAYER
    }

    extern "C" fn delegate_seek(_user_data: *mut c_void, id: i64, position_ms: i64) -> i32 {
        DELEGATE_CALLS.lock().push(format!("seek {} {}", id, position_ms));
        0
    }

    extern "C" fn delegate_volume(_user_data: *mut c_void, _id: i64, _volume: f32) -> i32 {
        0
    }

    extern "C" fn delegate_position(_user_data: *mut c_void, _id: i64, out: *mut i64) -> i32 {
        unsafe { *out = 1234 };
        0
    }

    #[test]
    fn test_delegate_over_c_abi() {
        let _serial = SERIAL.lock();
        let dir = assets_dir("delegate");
        init_engine(&dir);
        DELEGATE_CALLS.lock().clear();

        let vtable = ChorusDelegate {
            user_data: ptr::null_mut(),
            load: delegate_load,
            dispose: None,
            play: delegate_play,
            pause: delegate_missing,
            resume: delegate_play,
            stop: delegate_play,
            seek: delegate_seek,
            set_volume: delegate_volume,
            position: delegate_position,
        };
        assert_eq!(unsafe { chorus_set_delegate(&vtable) }, 0);

        let uri = CString::new("remote.mp3").unwrap();
        let id = unsafe { chorus_player_load(uri.as_ptr(), false, ptr::null(), 0.5, true) };
        assert!(id >= 0);
        assert_eq!(chorus_player_play(id), 0);
        assert_eq!(chorus_player_pause(id), -AudioError::UNKNOWN_PLAYER);
        assert_eq!(chorus_player_seek(id, 90), 0);
        let mut position = 0;
        assert_eq!(unsafe { chorus_player_position(id, &mut position) }, 0);
        assert_eq!(position, 1234);
        assert_eq!(chorus_player_dispose(id), -AudioError::NOT_IMPLEMENTED);

        assert_eq!(
            *DELEGATE_CALLS.lock(),
            vec![
                format!("load {} remote.mp3 0.5 true", id),
                format!("play {}", id),
                format!("seek {} 90", id),
            ]
        );

        assert_eq!(chorus_clear_delegate(), 0);
        assert_eq!(chorus_player_play(id), -AudioError::UNKNOWN_PLAYER);
        assert_eq!(chorus_engine_shutdown(), 0);
        let _ = std::fs::remove_dir_all(dir);
    }
}
