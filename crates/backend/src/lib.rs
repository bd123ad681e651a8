// Built-in playback backends for Chorus

pub mod clock;
pub mod factory;
pub mod headless;
pub mod looping;
pub mod primitive;
pub mod probe;
pub mod single_shot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use factory::NativeBackendFactory;
pub use headless::{HeadlessClip, HeadlessPlatform, HeadlessQueue};
pub use looping::LoopingBackend;
pub use primitive::{ClipPrimitive, NativePlatform, QueuePrimitive, StateObserver};
pub use probe::{SourceInfo, SourceProbe, SymphoniaProbe};
pub use single_shot::SingleShotBackend;

/// Factory for the headless platform with a wall clock and Symphonia probing
pub fn headless_factory() -> NativeBackendFactory<HeadlessPlatform<SystemClock, SymphoniaProbe>> {
    NativeBackendFactory::new(HeadlessPlatform::new(SystemClock::new(), SymphoniaProbe))
}
