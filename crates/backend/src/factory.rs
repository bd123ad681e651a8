// Backend factory over a native platform

use crate::looping::LoopingBackend;
use crate::primitive::NativePlatform;
use crate::single_shot::SingleShotBackend;
use chorus_core::{BackendFactory, PlaybackBackend, PlayerConfig, ResolvedSource, Result};

/// Picks the backend variant from the load-time loop flag
pub struct NativeBackendFactory<P: NativePlatform> {
    platform: P,
}

impl<P: NativePlatform> NativeBackendFactory<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }
}

impl<P: NativePlatform> BackendFactory for NativeBackendFactory<P> {
    fn create_backend(
        &self,
        source: &ResolvedSource,
        config: &PlayerConfig,
    ) -> Result<Box<dyn PlaybackBackend>> {
        if config.looping {
            log::debug!("opening looping backend for {}", source.uri);
            let queue = self.platform.open_queue(source, config.volume)?;
            Ok(Box::new(LoopingBackend::new(queue)))
        } else {
            log::debug!("opening single-shot backend for {}", source.uri);
            let clip = self.platform.open_clip(source, config.volume)?;
            Ok(Box::new(SingleShotBackend::new(clip)))
        }
    }
}
