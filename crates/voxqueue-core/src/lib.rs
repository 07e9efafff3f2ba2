//! # Voxqueue Core
//!
//! Batched text-to-speech: queue text snippets, synthesize them one at a
//! time through a remote service, then listen to or export the results as
//! WAV files and zip archives.
//!
//! ## Features
//!
//! - Base64 PCM decoding and canonical 44-byte-header WAV encoding
//! - Single-flight queue processing with per-item error isolation
//! - Zip export of every finished clip
//! - Single-slot playback through the system output device (`device` feature)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voxqueue_core::{AppConfig, GeminiGateway, SpeechQueue};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let gateway = GeminiGateway::new(config.gateway_config())?;
//!     let queue = SpeechQueue::new(Arc::new(gateway));
//!
//!     queue.enqueue("Hello, world!");
//!     queue.process_all("Kore").await?;
//!
//!     if let Some(zip) = queue.export_all().await? {
//!         std::fs::write(config.archive_path(), zip)?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod audio_device;
pub mod config;
#[cfg(feature = "device")]
pub mod cpal_output;
pub mod error;
pub mod export;
pub mod gateway;
pub mod pcm;
pub mod queue;
pub mod voice_manager;
pub mod wav_writer;

// Re-export main types for convenience
pub use audio_device::{AudioBuffer, AudioConfig, AudioOutput, ActiveSource, PlaybackEngine, PlaybackState};
pub use config::AppConfig;
pub use error::{VoxqueueError, VoxqueueResult};
pub use export::{build_archive, download_single, WavExport};
pub use gateway::{GeminiConfig, GeminiGateway, SpeechGateway};
pub use queue::{BatchSummary, ItemId, ItemStatus, QueueItem, SpeechQueue};
pub use voice_manager::{Gender, VoiceManager, VoiceOption};
pub use wav_writer::{encode_wav, WavSpec};

/// Version information for the voxqueue-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sample rate of synthesized speech (24 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Channel count of synthesized speech (mono)
pub const DEFAULT_CHANNELS: u16 = 1;

/// Bit depth of synthesized speech
pub const BITS_PER_SAMPLE: u16 = 16;

/// Default file name of the bulk archive
pub const DEFAULT_ARCHIVE_NAME: &str = "voxqueue-audios.zip";
