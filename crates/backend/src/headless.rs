// Headless native platform: clock-driven timelines without audio output
//
// Sources are still opened and probed, so unreadable files fail at load
// time, and the playhead advances with the clock while playing. Useful for
// hosts without an output device and for exercising the engine in tests.

use crate::clock::Clock;
use crate::primitive::{ClipPrimitive, NativePlatform, QueuePrimitive, StateObserver};
use crate::probe::{SourceInfo, SourceProbe};
use chorus_core::{
    millis_to_secs, secs_to_millis, AudioError, NativeTime, NotificationScope, PlaybackState,
    ResolvedSource, Result,
};
use parking_lot::{Mutex, MutexGuard};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

/// Timescale reported by headless queues when the probe has no sample rate
const DEFAULT_TIMESCALE: i32 = 600;

/// How often the ticker looks for clips that ran out
const TICK: Duration = Duration::from_millis(10);

/// Playhead bookkeeping against a clock
struct Timeline<C: Clock> {
    clock: Arc<C>,
    duration_ms: u64,
    looping: bool,
    base_ms: u64,
    started_at: Option<u64>,
}

impl<C: Clock> Timeline<C> {
    fn new(clock: Arc<C>, duration_ms: u64, looping: bool) -> Self {
        Self {
            clock,
            duration_ms,
            looping,
            base_ms: 0,
            started_at: None,
        }
    }

    fn raw_position(&self) -> u64 {
        let elapsed = self
            .started_at
            .map(|start| self.clock.now_ms().saturating_sub(start))
            .unwrap_or(0);
        self.base_ms + elapsed
    }

    fn clamp(&self, position: u64) -> u64 {
        match (self.duration_ms, self.looping) {
            (0, _) => position,
            (duration, true) => position % duration,
            (duration, false) => position.min(duration),
        }
    }

    fn position_ms(&self) -> u64 {
        self.clamp(self.raw_position())
    }

    /// Single-shot timelines with a known duration can run out
    fn reached_end(&self) -> bool {
        !self.looping && self.duration_ms > 0 && self.raw_position() >= self.duration_ms
    }

    fn is_running(&self) -> bool {
        self.started_at.is_some() && !self.reached_end()
    }

    fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now_ms());
        }
    }

    fn halt(&mut self) {
        self.base_ms = self.position_ms();
        self.started_at = None;
    }

    fn set_position(&mut self, position_ms: u64) {
        self.base_ms = self.clamp(position_ms);
        if self.started_at.is_some() {
            self.started_at = Some(self.clock.now_ms());
        }
    }
}

struct ClipInner<C: Clock> {
    timeline: Timeline<C>,
    playing: bool,
    volume: f32,
    released: bool,
}

impl<C: Clock> ClipInner<C> {
    /// Fold a natural end of media into the state; returns true when the
    /// clip just stopped by itself
    fn settle(&mut self) -> bool {
        if self.playing && self.timeline.reached_end() {
            self.timeline.halt();
            self.playing = false;
            return true;
        }
        false
    }
}

/// Clip state shared between the clip and the platform ticker
struct ClipShared<C: Clock> {
    inner: Mutex<ClipInner<C>>,
    observer: Mutex<Option<StateObserver>>,
}

impl<C: Clock> ClipShared<C> {
    fn emit(&self, playing: bool) {
        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer(playing);
        }
    }

    /// Lock with any end of media already reported
    ///
    /// Edges are emitted while the state lock is held so observers see them
    /// in the order the state changed.
    fn lock_settled(&self) -> MutexGuard<'_, ClipInner<C>> {
        let mut inner = self.inner.lock();
        if inner.settle() {
            log::debug!("headless clip reached end of media");
            self.emit(false);
        }
        inner
    }
}

/// Single-shot headless clip
pub struct HeadlessClip<C: Clock> {
    shared: Arc<ClipShared<C>>,
}

impl<C: Clock> HeadlessClip<C> {
    pub fn new(clock: Arc<C>, info: SourceInfo, volume: f32) -> Self {
        Self {
            shared: Arc::new(ClipShared {
                inner: Mutex::new(ClipInner {
                    timeline: Timeline::new(clock, info.duration_ms, false),
                    playing: false,
                    volume,
                    released: false,
                }),
                observer: Mutex::new(None),
            }),
        }
    }

    pub fn volume(&self) -> f32 {
        self.shared.inner.lock().volume
    }

    fn live(inner: &ClipInner<C>) -> Result<()> {
        if inner.released {
            Err(AudioError::BackendFailure("headless clip released".into()))
        } else {
            Ok(())
        }
    }
}

impl<C: Clock> ClipPrimitive for HeadlessClip<C> {
    fn play(&mut self) -> Result<()> {
        let mut inner = self.shared.lock_settled();
        Self::live(&inner)?;
        if !inner.playing {
            inner.timeline.start();
            inner.playing = true;
            self.shared.emit(true);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut inner = self.shared.lock_settled();
        Self::live(&inner)?;
        if inner.playing {
            inner.timeline.halt();
            inner.playing = false;
            self.shared.emit(false);
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        millis_to_secs(self.shared.lock_settled().timeline.position_ms())
    }

    fn set_current_time(&mut self, secs: f64) -> Result<()> {
        let mut inner = self.shared.lock_settled();
        Self::live(&inner)?;
        inner.timeline.set_position(secs_to_millis(secs));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        Self::live(&inner)?;
        inner.volume = volume;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        let inner = self.shared.lock_settled();
        inner.playing && inner.timeline.is_running()
    }

    fn set_playing_observer(&mut self, observer: Option<StateObserver>) {
        *self.shared.observer.lock() = observer;
    }

    fn release(&mut self) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        inner.timeline.halt();
        inner.playing = false;
        inner.released = true;
        Ok(())
    }
}

/// Looping headless queue; the playhead wraps at the probed duration
pub struct HeadlessQueue<C: Clock> {
    timeline: Timeline<C>,
    timescale: i32,
    prepared: bool,
    rate: f32,
    volume: f32,
    released: bool,
    observer: Option<StateObserver>,
}

impl<C: Clock> HeadlessQueue<C> {
    pub fn new(clock: Arc<C>, info: SourceInfo, volume: f32) -> Self {
        let timescale = info
            .sample_rate
            .and_then(|rate| i32::try_from(rate).ok())
            .filter(|rate| *rate > 0)
            .unwrap_or(DEFAULT_TIMESCALE);
        Self {
            timeline: Timeline::new(clock, info.duration_ms, true),
            timescale,
            prepared: false,
            rate: 0.0,
            volume,
            released: false,
            observer: None,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn live(&self) -> Result<()> {
        if self.released {
            Err(AudioError::BackendFailure("headless queue released".into()))
        } else {
            Ok(())
        }
    }
}

impl<C: Clock> QueuePrimitive for HeadlessQueue<C> {
    fn status(&self) -> PlaybackState {
        if !self.prepared {
            PlaybackState::Idle
        } else if self.rate != 0.0 {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    fn prepare(&mut self) -> Result<()> {
        self.live()?;
        self.prepared = true;
        Ok(())
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.live()?;
        if !self.prepared {
            return Err(AudioError::BackendFailure("queue item not prepared".into()));
        }
        let was_playing = self.rate != 0.0;
        let playing = rate != 0.0;
        self.rate = rate;
        if playing {
            self.timeline.start();
        } else {
            self.timeline.halt();
        }
        if was_playing != playing {
            if let Some(observer) = &self.observer {
                observer(playing);
            }
        }
        Ok(())
    }

    fn rate(&self) -> f32 {
        self.rate
    }

    fn seek(&mut self, to: NativeTime) -> Result<()> {
        self.live()?;
        let millis = to
            .to_millis()
            .ok_or_else(|| AudioError::InvalidArgument("invalid seek timescale".into()))?;
        self.timeline.set_position(millis);
        Ok(())
    }

    fn current_time(&self) -> Option<NativeTime> {
        Some(NativeTime::from_millis(
            self.timeline.position_ms(),
            self.timescale,
        ))
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.live()?;
        self.volume = volume;
        Ok(())
    }

    fn set_rate_observer(&mut self, observer: Option<StateObserver>) {
        self.observer = observer;
    }

    fn release(&mut self) -> Result<()> {
        self.timeline.halt();
        self.rate = 0.0;
        self.released = true;
        Ok(())
    }
}

type ClipList<C> = Mutex<Vec<Weak<ClipShared<C>>>>;

/// Platform opening headless primitives after probing the source
///
/// The first clip opened starts a ticker thread that reports ends of media
/// as they happen. It exits once the platform is dropped.
pub struct HeadlessPlatform<C: Clock, P: SourceProbe> {
    clock: Arc<C>,
    probe: P,
    clips: Arc<ClipList<C>>,
    ticker_started: Mutex<bool>,
}

impl<C: Clock, P: SourceProbe> HeadlessPlatform<C, P> {
    pub fn new(clock: C, probe: P) -> Self {
        Self {
            clock: Arc::new(clock),
            probe,
            clips: Arc::new(Mutex::new(Vec::new())),
            ticker_started: Mutex::new(false),
        }
    }
}

impl<C: Clock + 'static, P: SourceProbe> HeadlessPlatform<C, P> {
    fn ensure_ticker(&self) -> Result<()> {
        let mut started = self.ticker_started.lock();
        if *started {
            return Ok(());
        }
        let clips = Arc::downgrade(&self.clips);
        thread::Builder::new()
            .name("chorus-headless-ticker".into())
            .spawn(move || run_ticker(clips))
            .map_err(|err| {
                AudioError::BackendFailure(format!("cannot start headless ticker: {}", err))
            })?;
        *started = true;
        Ok(())
    }
}

fn run_ticker<C: Clock>(clips: Weak<ClipList<C>>) {
    log::debug!("headless ticker started");
    loop {
        thread::sleep(TICK);
        let live: Vec<Arc<ClipShared<C>>> = match clips.upgrade() {
            Some(clips) => {
                let mut clips = clips.lock();
                clips.retain(|clip| clip.strong_count() > 0);
                clips.iter().filter_map(Weak::upgrade).collect()
            }
            None => break,
        };
        let _scope = NotificationScope::enter();
        for clip in live {
            drop(clip.lock_settled());
        }
    }
    log::debug!("headless ticker stopped");
}

impl<C: Clock + 'static, P: SourceProbe> NativePlatform for HeadlessPlatform<C, P> {
    type Clip = HeadlessClip<C>;
    type Queue = HeadlessQueue<C>;

    fn open_clip(&self, source: &ResolvedSource, volume: f32) -> Result<Self::Clip> {
        let info = self.probe.probe(&source.location)?;
        self.ensure_ticker()?;
        let clip = HeadlessClip::new(self.clock.clone(), info, volume);
        self.clips.lock().push(Arc::downgrade(&clip.shared));
        Ok(clip)
    }

    fn open_queue(&self, source: &ResolvedSource, volume: f32) -> Result<Self::Queue> {
        let info = self.probe.probe(&source.location)?;
        Ok(HeadlessQueue::new(self.clock.clone(), info, volume))
    }
}
