//! Audio device management for playback of synthesized speech.
//!
//! [`PlaybackEngine`] owns a lazily-opened output device and a single
//! "current source" slot. Every [`PlaybackEngine::play`] stops whatever is
//! sounding before starting the new buffer, so at most one buffer is audible.

use crate::error::{VoxqueueError, VoxqueueResult};
use std::time::Duration;
use tracing::{debug, info};

/// Playback state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing is sounding
    Stopped,
    /// A buffer is currently playing
    Playing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Playing => write!(f, "Playing"),
        }
    }
}

/// Format of the PCM payloads handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    /// Sample rate of the payload in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels in the payload
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
            channels: crate::DEFAULT_CHANNELS,
        }
    }
}

/// Device-ready audio: one normalized `f32` lane per channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// De-interleave 16-bit samples into per-channel lanes.
    ///
    /// Flat sample `i` lands in channel `i % num_channels` at frame
    /// `i / num_channels`; a trailing partial frame is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_channels` or `sample_rate` is zero
    pub fn from_samples(samples: &[i16], sample_rate: u32, num_channels: u16) -> VoxqueueResult<Self> {
        if num_channels == 0 || sample_rate == 0 {
            return Err(VoxqueueError::audio_processing(
                "Sample rate and channel count must be positive",
            ));
        }

        let num_channels = usize::from(num_channels);
        let frame_count = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frame_count); num_channels];

        for (i, &sample) in samples.iter().take(frame_count * num_channels).enumerate() {
            channels[i % num_channels].push(f32::from(sample) / 32768.0);
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames per channel
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Samples of one channel
    #[must_use]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channel lanes
    #[must_use]
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Playback duration
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / f64::from(self.sample_rate))
    }

    /// Check whether the buffer holds no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Re-flatten into frame-major interleaved samples
    #[must_use]
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frame_count() * self.num_channels());
        for frame in 0..self.frame_count() {
            for lane in &self.channels {
                out.push(lane[frame]);
            }
        }
        out
    }
}

/// Decode a base64 PCM payload into a device-ready buffer
///
/// # Errors
///
/// Returns a decode error for malformed base64 and an audio processing
/// error for a zero rate or channel count
pub fn decode_audio_buffer(base64: &str, config: AudioConfig) -> VoxqueueResult<AudioBuffer> {
    let samples = crate::pcm::decode_samples(base64)?;
    AudioBuffer::from_samples(&samples, config.sample_rate, config.channels)
}

/// A buffer that has been started on an output device
pub trait ActiveSource {
    /// Stop the buffer immediately
    fn stop(&mut self);

    /// Whether the buffer has played through to the end or was stopped
    fn is_finished(&self) -> bool;
}

/// An opened audio output device
pub trait AudioOutput {
    /// Human-readable device name
    fn name(&self) -> String;

    /// Start playing a buffer and return a handle to it
    ///
    /// # Errors
    ///
    /// Returns an error if the device refuses the stream
    fn start(&mut self, buffer: AudioBuffer) -> VoxqueueResult<Box<dyn ActiveSource>>;
}

/// Opens the output device on first use
pub type DeviceOpener = Box<dyn FnMut() -> VoxqueueResult<Box<dyn AudioOutput>>>;

/// Single-slot playback engine
pub struct PlaybackEngine {
    config: AudioConfig,
    opener: DeviceOpener,
    device: Option<Box<dyn AudioOutput>>,
    current: Option<Box<dyn ActiveSource>>,
}

impl PlaybackEngine {
    /// Create an engine that opens the system's default output device
    #[must_use]
    pub fn new() -> Self {
        Self::with_opener(AudioConfig::default(), Box::new(open_default_output))
    }

    /// Create an engine with a custom device opener
    #[must_use]
    pub fn with_opener(config: AudioConfig, opener: DeviceOpener) -> Self {
        Self {
            config,
            opener,
            device: None,
            current: None,
        }
    }

    /// Stop the current buffer, then decode and start a new one.
    ///
    /// Returns as soon as playback has started. The device is opened on the
    /// first call and reused afterwards.
    ///
    /// # Errors
    ///
    /// Returns a playback error if the device cannot be opened, the payload
    /// cannot be decoded, or the device refuses the stream
    pub fn play(&mut self, base64_audio: &str) -> VoxqueueResult<()> {
        self.stop();

        let buffer = decode_audio_buffer(base64_audio, self.config)
            .map_err(|e| VoxqueueError::playback(format!("Could not decode audio: {e}")))?;
        let device = self.device_or_open()?;

        debug!(
            "Starting {} frames ({:?}) on {}",
            buffer.frame_count(),
            buffer.duration(),
            device.name()
        );
        let source = device.start(buffer).map_err(|e| match e {
            VoxqueueError::PlaybackError { .. } => e,
            other => VoxqueueError::playback(format!("Could not start audio: {other}")),
        })?;
        self.current = Some(source);
        Ok(())
    }

    /// Stop the current buffer, if any
    pub fn stop(&mut self) {
        if let Some(mut source) = self.current.take() {
            debug!("Stopping current audio source");
            source.stop();
        }
    }

    /// Get current playback state
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        match &self.current {
            Some(source) if !source.is_finished() => PlaybackState::Playing,
            _ => PlaybackState::Stopped,
        }
    }

    /// Check if audio is currently playing
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Check whether the output device has been opened
    #[must_use]
    pub fn is_device_open(&self) -> bool {
        self.device.is_some()
    }

    /// Get current audio configuration
    #[must_use]
    pub const fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Wait until the current buffer has played through
    pub async fn wait_for_completion(&self) {
        while self.is_playing() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn device_or_open(&mut self) -> VoxqueueResult<&mut Box<dyn AudioOutput>> {
        if self.device.is_none() {
            let device = (self.opener)().map_err(|e| match e {
                VoxqueueError::PlaybackError { .. } => e,
                other => VoxqueueError::playback(format!("Could not open audio device: {other}")),
            })?;
            info!("Opened audio output device: {}", device.name());
            self.device = Some(device);
        }
        self.device
            .as_mut()
            .ok_or_else(|| VoxqueueError::playback("Audio device unavailable"))
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("config", &self.config)
            .field("device_open", &self.device.is_some())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(feature = "device")]
fn open_default_output() -> VoxqueueResult<Box<dyn AudioOutput>> {
    Ok(Box::new(crate::cpal_output::CpalOutput::open_default()?))
}

#[cfg(not(feature = "device"))]
fn open_default_output() -> VoxqueueResult<Box<dyn AudioOutput>> {
    Err(VoxqueueError::playback(
        "audio output support not compiled in (enable the `device` feature)",
    ))
}
