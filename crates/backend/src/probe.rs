// Opening and probing media sources with Symphonia

use chorus_core::{AudioError, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// What a backend needs to know about a source before playing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    /// Total duration in milliseconds, 0 when unknown
    pub duration_ms: u64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Checks that a location holds playable media
pub trait SourceProbe: Send + Sync {
    /// Fails with `SourceUnavailable` when the source cannot be opened
    fn probe(&self, location: &Path) -> Result<SourceInfo>;
}

/// Probes the container and default track with Symphonia
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaProbe;

impl SymphoniaProbe {
    fn hint_for(location: &Path) -> Hint {
        let mut hint = Hint::new();
        if let Some(extension) = location.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }
        hint
    }
}

impl SourceProbe for SymphoniaProbe {
    fn probe(&self, location: &Path) -> Result<SourceInfo> {
        let file = File::open(location).map_err(|e| {
            AudioError::SourceUnavailable(format!("open {}: {}", location.display(), e))
        })?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Self::hint_for(location),
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                AudioError::SourceUnavailable(format!(
                    "unrecognised media {}: {}",
                    location.display(),
                    e
                ))
            })?;

        let track = probed.format.default_track().ok_or_else(|| {
            AudioError::SourceUnavailable(format!("no audio track in {}", location.display()))
        })?;
        let params = &track.codec_params;

        let duration_ms = match (params.n_frames, params.sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => frames * 1000 / rate as u64,
            _ => 0,
        };
        let info = SourceInfo {
            duration_ms,
            sample_rate: params.sample_rate,
            channels: params.channels.map(|c| c.count() as u16),
        };
        log::info!(
            "probed {}: duration_ms={} sample_rate={:?} channels={:?}",
            location.display(),
            info.duration_ms,
            info.sample_rate,
            info.channels
        );
        Ok(info)
    }
}
