//! Offline rendering to memory or to a WAV file.

use std::path::Path;
use std::sync::Arc;

use crate::core::types::ProgressMonitor;
use crate::error::IntonationError;
use crate::io::wav::{WavFormat, WavSink};
use crate::track::TrackSnapshot;

use super::provider::AudioProvider;
use super::renderer::Renderer;

/// Samples pulled from the renderer per iteration.
pub const EXPORT_BLOCK_SIZE: usize = 4096;

/// Pulls `provider` dry in blocks, handing each block to `sink`.
///
/// Progress is reported against `expected_len` after every block; the
/// monitor is polled for cancellation before each one. Returns the number
/// of samples produced.
pub fn drive<P, F>(
    provider: &mut P,
    expected_len: usize,
    monitor: &mut dyn ProgressMonitor,
    mut sink: F,
) -> Result<usize, IntonationError>
where
    P: AudioProvider + ?Sized,
    F: FnMut(&[f32]) -> Result<(), IntonationError>,
{
    let mut block = vec![0.0f32; EXPORT_BLOCK_SIZE];
    let mut total = 0usize;

    loop {
        if monitor.is_cancelled() {
            return Err(IntonationError::Cancelled);
        }
        let n = provider.provide(&mut block);
        if n == 0 {
            break;
        }
        sink(&block[..n])?;
        total += n;
        if expected_len > 0 {
            monitor.report((total as f64 / expected_len as f64).min(1.0));
        }
        if n < block.len() {
            break;
        }
    }

    monitor.report(1.0);
    Ok(total)
}

/// Renders the whole snapshot into a sample vector.
pub fn export_to_vec(
    snapshot: Arc<TrackSnapshot>,
    monitor: &mut dyn ProgressMonitor,
) -> Result<Vec<f32>, IntonationError> {
    let expected = snapshot.output_len().max(0) as usize;
    let mut renderer = Renderer::new(snapshot);
    let mut out = Vec::with_capacity(expected);
    drive(&mut renderer, expected, monitor, |block| {
        out.extend_from_slice(block);
        Ok(())
    })?;
    Ok(out)
}

/// Renders the whole snapshot straight into a mono WAV file.
pub fn export_wav_file(
    snapshot: Arc<TrackSnapshot>,
    path: impl AsRef<Path>,
    format: WavFormat,
    monitor: &mut dyn ProgressMonitor,
) -> Result<usize, IntonationError> {
    let path = path.as_ref();
    let expected = snapshot.output_len().max(0) as usize;
    let mut wav = WavSink::create(path, snapshot.sample_rate(), format)?;
    let mut renderer = Renderer::new(snapshot);
    let total = drive(&mut renderer, expected, monitor, |block| wav.write(block))?;
    wav.finalize()?;

    if renderer.dropped_grains() > 0 {
        log::warn!("export dropped {} grains", renderer.dropped_grains());
    }
    log::info!("exported {} samples to {}", total, path.display());
    Ok(total)
}
