// Backend that plays its source once

use crate::primitive::ClipPrimitive;
use chorus_core::{
    millis_to_secs, secs_to_millis, AudioError, PlaybackBackend, PlaybackState, PlayingObserver,
    Result,
};
use std::sync::Arc;

/// One playthrough over a [`ClipPrimitive`]
///
/// `play` always starts from the top; `resume` continues from the playhead.
pub struct SingleShotBackend<C: ClipPrimitive> {
    clip: C,
    state: PlaybackState,
    released: bool,
}

impl<C: ClipPrimitive> SingleShotBackend<C> {
    pub fn new(clip: C) -> Self {
        Self {
            clip,
            state: PlaybackState::Idle,
            released: false,
        }
    }

    /// A clip that stopped by itself while we were playing has ended
    fn current_state(&self) -> PlaybackState {
        if self.state == PlaybackState::Playing && !self.clip.is_playing() {
            PlaybackState::Ended
        } else {
            self.state
        }
    }

    fn refresh(&mut self) {
        self.state = self.current_state();
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            Err(AudioError::BackendFailure("clip already released".into()))
        } else {
            Ok(())
        }
    }
}

impl<C: ClipPrimitive> PlaybackBackend for SingleShotBackend<C> {
    fn play(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.clip.set_current_time(0.0)?;
        self.clip.play()?;
        self.state = PlaybackState::Playing;
        log::debug!("single-shot play from start");
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.refresh();
        if self.state == PlaybackState::Playing {
            self.clip.pause()?;
            self.state = PlaybackState::Paused;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.refresh();
        match self.state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Ended => self.play(),
            PlaybackState::Idle | PlaybackState::Paused => {
                self.clip.play()?;
                self.state = PlaybackState::Playing;
                Ok(())
            }
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.refresh();
        if self.state == PlaybackState::Idle {
            return Ok(());
        }
        self.clip.pause()?;
        self.clip.set_current_time(0.0)?;
        self.state = PlaybackState::Paused;
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.ensure_live()?;
        self.refresh();
        self.clip.set_current_time(millis_to_secs(position_ms))?;
        if self.state == PlaybackState::Ended {
            self.state = PlaybackState::Paused;
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.ensure_live()?;
        self.clip.set_volume(volume)
    }

    fn position(&mut self) -> Result<Option<u64>> {
        self.ensure_live()?;
        Ok(Some(secs_to_millis(self.clip.current_time())))
    }

    fn state(&self) -> PlaybackState {
        self.current_state()
    }

    fn start_observation(&mut self, observer: Arc<PlayingObserver>) {
        self.clip
            .set_playing_observer(Some(Arc::new(move |playing: bool| observer.observe(playing))));
    }

    fn stop_observation(&mut self) {
        self.clip.set_playing_observer(None);
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.clip.set_playing_observer(None);
        self.clip.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::StateObserver;
    use chorus_core::ListenerHub;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct ClipLog {
        calls: Vec<String>,
    }

    /// Clip that records calls; tests flip `finished` to simulate end of media
    struct MockClip {
        log: Arc<Mutex<ClipLog>>,
        time: f64,
        playing: bool,
        finished: Arc<Mutex<bool>>,
        observer: Option<StateObserver>,
    }

    impl MockClip {
        fn new(log: Arc<Mutex<ClipLog>>, finished: Arc<Mutex<bool>>) -> Self {
            Self {
                log,
                time: 0.0,
                playing: false,
                finished,
                observer: None,
            }
        }

        fn emit(&self, playing: bool) {
            if let Some(observer) = &self.observer {
                observer(playing);
            }
        }
    }

    impl ClipPrimitive for MockClip {
        fn play(&mut self) -> Result<()> {
            self.log.lock().calls.push("play".into());
            *self.finished.lock() = false;
            self.playing = true;
            self.emit(true);
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            self.log.lock().calls.push("pause".into());
            self.playing = false;
            self.emit(false);
            Ok(())
        }

        fn current_time(&self) -> f64 {
            self.time
        }

        fn set_current_time(&mut self, secs: f64) -> Result<()> {
            self.log.lock().calls.push(format!("time {}", secs));
            self.time = secs;
            Ok(())
        }

        fn set_volume(&mut self, volume: f32) -> Result<()> {
            self.log.lock().calls.push(format!("volume {}", volume));
            Ok(())
        }

        fn is_playing(&self) -> bool {
            self.playing && !*self.finished.lock()
        }

        fn set_playing_observer(&mut self, observer: Option<StateObserver>) {
            self.observer = observer;
        }

        fn release(&mut self) -> Result<()> {
            self.log.lock().calls.push("release".into());
            Ok(())
        }
    }

    fn backend() -> (SingleShotBackend<MockClip>, Arc<Mutex<ClipLog>>, Arc<Mutex<bool>>) {
        let log = Arc::new(Mutex::new(ClipLog::default()));
        let finished = Arc::new(Mutex::new(false));
        let clip = MockClip::new(log.clone(), finished.clone());
        (SingleShotBackend::new(clip), log, finished)
    }

    #[test]
    fn test_play_rewinds_then_starts() {
        let (mut backend, log, _finished) = backend();
        backend.seek(2500).unwrap();
        backend.play().unwrap();
        assert_eq!(log.lock().calls, vec!["time 2.5", "time 0", "play"]);
        assert_eq!(backend.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_stop_pauses_and_rewinds() {
        let (mut backend, log, _finished) = backend();
        backend.play().unwrap();
        backend.seek(900).unwrap();
        backend.stop().unwrap();
        assert_eq!(backend.position().unwrap(), Some(0));
        assert_eq!(backend.state(), PlaybackState::Paused);
        assert_eq!(
            log.lock().calls[3..],
            ["pause".to_string(), "time 0".to_string()]
        );
    }

    #[test]
    fn test_pause_is_idempotent() {
        let (mut backend, log, _finished) = backend();
        backend.pause().unwrap();
        backend.play().unwrap();
        backend.pause().unwrap();
        backend.pause().unwrap();
        let pauses = log.lock().calls.iter().filter(|c| *c == "pause").count();
        assert_eq!(pauses, 1);
        assert_eq!(backend.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_stop_when_idle_does_nothing() {
        let (mut backend, log, _finished) = backend();
        backend.stop().unwrap();
        backend.stop().unwrap();
        assert!(log.lock().calls.is_empty());
        assert_eq!(backend.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_ended_clip_restarts_from_zero() {
        let (mut backend, log, finished) = backend();
        backend.play().unwrap();
        backend.seek(4000).unwrap();
        *finished.lock() = true;
        assert_eq!(backend.state(), PlaybackState::Ended);

        // pausing an ended clip is a no-op
        backend.pause().unwrap();
        assert!(!log.lock().calls.contains(&"pause".to_string()));

        backend.resume().unwrap();
        assert_eq!(backend.position().unwrap(), Some(0));
        assert_eq!(backend.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_resume_continues_from_playhead() {
        let (mut backend, log, _finished) = backend();
        backend.play().unwrap();
        backend.pause().unwrap();
        backend.seek(1250).unwrap();
        backend.resume().unwrap();
        backend.resume().unwrap();
        assert_eq!(backend.position().unwrap(), Some(1250));
        let plays = log.lock().calls.iter().filter(|c| *c == "play").count();
        assert_eq!(plays, 2);
    }

    #[test]
    fn test_seek_then_position_round_trips() {
        let (mut backend, _log, _finished) = backend();
        for ms in [0u64, 1, 333, 1001, 123_457] {
            backend.seek(ms).unwrap();
            assert_eq!(backend.position().unwrap(), Some(ms));
        }
    }

    #[test]
    fn test_observation_forwards_native_events() {
        let (mut backend, _log, _finished) = backend();
        let hub = Arc::new(ListenerHub::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        hub.subscribe(
            "t",
            Arc::new(move |uri: &str, playing: bool| sink.lock().push((uri.to_string(), playing))),
        );

        backend.start_observation(Arc::new(PlayingObserver::new("a.mp3", &hub)));
        backend.play().unwrap();
        backend.pause().unwrap();
        backend.stop_observation();
        backend.play().unwrap();

        assert_eq!(
            *seen.lock(),
            vec![("a.mp3".to_string(), true), ("a.mp3".to_string(), false)]
        );
    }

    #[test]
    fn test_released_backend_rejects_calls() {
        let (mut backend, log, _finished) = backend();
        backend.release().unwrap();
        backend.release().unwrap();
        assert!(backend.play().is_err());
        let releases = log.lock().calls.iter().filter(|c| *c == "release").count();
        assert_eq!(releases, 1);
    }
}
