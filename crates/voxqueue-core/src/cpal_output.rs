//! System audio output through cpal.
//!
//! Speech arrives at 24 kHz mono; most devices run at 44.1 or 48 kHz with two
//! or more channels, so buffers are resampled to the native rate and each
//! device channel is fed from the matching (or last) buffer channel.

use crate::audio_device::{ActiveSource, AudioBuffer, AudioOutput};
use crate::error::{VoxqueueError, VoxqueueResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedStreamConfig};
use rubato::{FftFixedIn, Resampler};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

const RESAMPLER_CHUNK: usize = 1024;

/// The default output device of the default host
pub struct CpalOutput {
    device: Device,
    supported_config: SupportedStreamConfig,
}

impl CpalOutput {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns a playback error if no device is available or it reports no
    /// usable configuration
    pub fn open_default() -> VoxqueueResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VoxqueueError::playback("No audio output device available"))?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| VoxqueueError::playback(format!("Failed to get output config: {e}")))?;

        debug!(
            sample_rate = supported_config.sample_rate().0,
            channels = supported_config.channels(),
            "Output device config"
        );

        Ok(Self {
            device,
            supported_config,
        })
    }

    fn build_stream<T>(
        &self,
        config: &StreamConfig,
        samples: Arc<Vec<f32>>,
        position: Arc<AtomicUsize>,
        finished: Arc<AtomicBool>,
    ) -> VoxqueueResult<Stream>
    where
        T: SizedSample + FromSample<f32> + Default + Send + 'static,
    {
        self.device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let pos = position.load(Ordering::SeqCst);
                    let remaining = samples.len().saturating_sub(pos);

                    if remaining == 0 || finished.load(Ordering::SeqCst) {
                        data.fill(T::default());
                        finished.store(true, Ordering::SeqCst);
                        return;
                    }

                    let to_copy = remaining.min(data.len());
                    for (slot, &sample) in data.iter_mut().zip(&samples[pos..pos + to_copy]) {
                        *slot = T::from_sample(sample);
                    }
                    if to_copy < data.len() {
                        data[to_copy..].fill(T::default());
                    }

                    position.store(pos + to_copy, Ordering::SeqCst);
                },
                |err| error!(error = ?err, "Playback stream error"),
                None,
            )
            .map_err(|e| VoxqueueError::playback(format!("Failed to build output stream: {e}")))
    }
}

impl AudioOutput for CpalOutput {
    fn name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown output device".to_string())
    }

    fn start(&mut self, buffer: AudioBuffer) -> VoxqueueResult<Box<dyn ActiveSource>> {
        let native_rate = self.supported_config.sample_rate().0;
        let native_channels = usize::from(self.supported_config.channels());
        let config: StreamConfig = self.supported_config.clone().into();

        let lanes = resample(buffer.channels(), buffer.sample_rate(), native_rate)?;
        let samples = Arc::new(spread_to_channels(&lanes, native_channels));
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stream = match self.supported_config.sample_format() {
            SampleFormat::F32 => {
                self.build_stream::<f32>(&config, samples, position, Arc::clone(&finished))?
            }
            SampleFormat::I16 => {
                self.build_stream::<i16>(&config, samples, position, Arc::clone(&finished))?
            }
            SampleFormat::U16 => {
                self.build_stream::<u16>(&config, samples, position, Arc::clone(&finished))?
            }
            format => {
                return Err(VoxqueueError::playback(format!(
                    "Unsupported sample format: {format:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| VoxqueueError::playback(format!("Failed to start playback stream: {e}")))?;

        Ok(Box::new(CpalSource { stream, finished }))
    }
}

/// A running cpal stream; dropping it also stops playback
struct CpalSource {
    stream: Stream,
    finished: Arc<AtomicBool>,
}

impl ActiveSource for CpalSource {
    fn stop(&mut self) {
        self.finished.store(true, Ordering::SeqCst);
        if let Err(e) = self.stream.pause() {
            debug!("Pausing stream failed, relying on drop: {e}");
        }
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

fn resample(lanes: &[Vec<f32>], source_rate: u32, target_rate: u32) -> VoxqueueResult<Vec<Vec<f32>>> {
    if source_rate == target_rate || lanes.is_empty() {
        return Ok(lanes.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        RESAMPLER_CHUNK,
        2,
        lanes.len(),
    )
    .map_err(|e| VoxqueueError::playback(format!("Failed to create resampler: {e}")))?;

    let total = lanes[0].len();
    let mut output = vec![Vec::new(); lanes.len()];
    let mut pos = 0;

    while pos < total {
        let frames_needed = resampler.input_frames_next();
        let end = (pos + frames_needed).min(total);

        let input: Vec<Vec<f32>> = lanes
            .iter()
            .map(|lane| {
                let mut chunk = lane[pos..end].to_vec();
                chunk.resize(frames_needed, 0.0);
                chunk
            })
            .collect();

        let resampled = resampler
            .process(&input, None)
            .map_err(|e| VoxqueueError::playback(format!("Resampling failed: {e}")))?;
        for (out, chunk) in output.iter_mut().zip(resampled) {
            out.extend(chunk);
        }

        pos = end;
    }

    Ok(output)
}

fn spread_to_channels(lanes: &[Vec<f32>], device_channels: usize) -> Vec<f32> {
    let frames = lanes.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(frames * device_channels);
    for frame in 0..frames {
        for channel in 0..device_channels {
            let lane = &lanes[channel.min(lanes.len() - 1)];
            out.push(lane[frame]);
        }
    }
    out
}
