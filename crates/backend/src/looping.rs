// Backend that repeats its source indefinitely

use crate::primitive::QueuePrimitive;
use chorus_core::time::MILLIS_TIMESCALE;
use chorus_core::{AudioError, NativeTime, PlaybackBackend, PlaybackState, PlayingObserver, Result};
use std::sync::Arc;

/// Endless playback over a [`QueuePrimitive`]
///
/// `play` follows the tri-state rule: an ended queue is rewound, an idle
/// queue is prepared, anything else simply resumes.
pub struct LoopingBackend<Q: QueuePrimitive> {
    queue: Q,
    released: bool,
}

impl<Q: QueuePrimitive> LoopingBackend<Q> {
    pub fn new(queue: Q) -> Self {
        Self {
            queue,
            released: false,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            Err(AudioError::BackendFailure("queue already released".into()))
        } else {
            Ok(())
        }
    }
}

impl<Q: QueuePrimitive> PlaybackBackend for LoopingBackend<Q> {
    fn play(&mut self) -> Result<()> {
        self.ensure_live()?;
        match self.queue.status() {
            PlaybackState::Ended => self.queue.seek(NativeTime::ZERO)?,
            PlaybackState::Idle => self.queue.prepare()?,
            PlaybackState::Playing | PlaybackState::Paused => {}
        }
        self.queue.set_rate(1.0)?;
        log::debug!("looping play");
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.queue.status() == PlaybackState::Playing {
            self.queue.set_rate(0.0)?;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.queue.status() == PlaybackState::Playing {
            return Ok(());
        }
        self.play()
    }

    fn stop(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.queue.status() == PlaybackState::Idle {
            return Ok(());
        }
        if self.queue.rate() != 0.0 {
            self.queue.set_rate(0.0)?;
        }
        self.queue.seek(NativeTime::ZERO)
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.ensure_live()?;
        self.queue
            .seek(NativeTime::from_millis(position_ms, MILLIS_TIMESCALE))
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.ensure_live()?;
        self.queue.set_volume(volume)
    }

    fn position(&mut self) -> Result<Option<u64>> {
        self.ensure_live()?;
        Ok(self.queue.current_time().and_then(|time| time.to_millis()))
    }

    fn state(&self) -> PlaybackState {
        self.queue.status()
    }

    fn start_observation(&mut self, observer: Arc<PlayingObserver>) {
        self.queue
            .set_rate_observer(Some(Arc::new(move |playing: bool| observer.observe(playing))));
    }

    fn stop_observation(&mut self) {
        self.queue.set_rate_observer(None);
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.queue.set_rate_observer(None);
        self.queue.release()
    }
}
