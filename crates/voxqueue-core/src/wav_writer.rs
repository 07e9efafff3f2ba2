//! WAV encoder
//!
//! Wraps 16-bit PCM samples in a canonical 44-byte RIFF/WAVE header. The
//! output is a pure function of its inputs, so encoding the same samples
//! twice yields byte-identical files.

use crate::error::{VoxqueueError, VoxqueueResult};
use std::path::Path;
use tracing::debug;

/// Size of the canonical PCM WAV header
pub const WAV_HEADER_LEN: usize = 44;

/// WAV stream parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Sample rate in Hz (e.g., 24000, 44100, 48000)
    pub sample_rate: u32,
    /// Bits per sample
    pub bit_depth: u16,
}

impl WavSpec {
    /// 16-bit linear PCM with the given rate and channel count
    #[must_use]
    pub const fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            channels,
            sample_rate,
            bit_depth: crate::BITS_PER_SAMPLE,
        }
    }

    /// Get bytes per sample
    #[must_use]
    pub const fn bytes_per_sample(&self) -> u16 {
        self.bit_depth / 8
    }

    /// Get byte rate (bytes per second), `None` on overflow
    #[must_use]
    pub fn byte_rate(&self) -> Option<u32> {
        self.sample_rate
            .checked_mul(u32::from(self.channels))?
            .checked_mul(u32::from(self.bytes_per_sample()))
    }

    /// Get block align (bytes per sample frame), `None` on overflow
    #[must_use]
    pub fn block_align(&self) -> Option<u16> {
        self.channels.checked_mul(self.bytes_per_sample())
    }

    fn validate(&self) -> VoxqueueResult<()> {
        if self.sample_rate == 0 {
            return Err(VoxqueueError::audio_processing("Sample rate must be positive"));
        }
        if self.channels == 0 {
            return Err(VoxqueueError::audio_processing("Channel count must be positive"));
        }
        if self.bit_depth != crate::BITS_PER_SAMPLE {
            return Err(VoxqueueError::audio_processing(format!(
                "Only 16-bit PCM is supported, got {} bits",
                self.bit_depth
            )));
        }
        Ok(())
    }

    /// Read the parameters and data size back out of a canonical header
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short or is not a PCM WAV header
    pub fn parse_header(bytes: &[u8]) -> VoxqueueResult<(Self, u32)> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(VoxqueueError::decode(format!(
                "WAV header needs {WAV_HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" || &bytes[12..16] != b"fmt " {
            return Err(VoxqueueError::decode("Missing RIFF/WAVE/fmt tags"));
        }
        if &bytes[36..40] != b"data" {
            return Err(VoxqueueError::decode("Missing data chunk tag"));
        }
        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at =
            |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        if u16_at(20) != 1 {
            return Err(VoxqueueError::decode(format!(
                "Unsupported audio format {}",
                u16_at(20)
            )));
        }

        let spec = Self {
            channels: u16_at(22),
            sample_rate: u32_at(24),
            bit_depth: u16_at(34),
        };
        Ok((spec, u32_at(40)))
    }
}

impl Default for WavSpec {
    fn default() -> Self {
        Self::pcm16(crate::DEFAULT_SAMPLE_RATE, crate::DEFAULT_CHANNELS)
    }
}

/// Encode 16-bit samples as a complete WAV file
///
/// # Errors
///
/// Returns an error if the rate or channel count is zero, or if the sizes
/// do not fit the 32-bit RIFF fields
pub fn encode_wav(samples: &[i16], sample_rate: u32, num_channels: u16) -> VoxqueueResult<Vec<u8>> {
    encode_wav_with_spec(samples, WavSpec::pcm16(sample_rate, num_channels))
}

/// Encode 16-bit samples as a complete WAV file with an explicit spec
///
/// # Errors
///
/// See [`encode_wav`]
pub fn encode_wav_with_spec(samples: &[i16], spec: WavSpec) -> VoxqueueResult<Vec<u8>> {
    spec.validate()?;

    let overflow = || VoxqueueError::audio_processing("Audio too large for a WAV container");
    let data_size = samples
        .len()
        .checked_mul(usize::from(spec.bytes_per_sample()))
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(overflow)?;
    let chunk_size = data_size.checked_add(36).ok_or_else(overflow)?;
    let byte_rate = spec.byte_rate().ok_or_else(overflow)?;
    let block_align = spec.block_align().ok_or_else(overflow)?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_size as usize);

    // RIFF chunk
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&chunk_size.to_le_bytes()); // File size - 8
    out.extend_from_slice(b"WAVE");

    // fmt chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&spec.channels.to_le_bytes());
    out.extend_from_slice(&spec.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&spec.bit_depth.to_le_bytes());

    // data chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }

    debug!("Encoded {} samples into {} WAV bytes", samples.len(), out.len());
    Ok(out)
}

/// Decode a base64 PCM payload and wrap it as 24 kHz mono WAV
///
/// # Errors
///
/// Returns a decode error if the payload is not valid base64
pub fn wav_from_base64(base64: &str) -> VoxqueueResult<Vec<u8>> {
    let samples = crate::pcm::decode_samples(base64)?;
    encode_wav_with_spec(&samples, WavSpec::default())
}

/// Write samples to a WAV file, creating parent directories
///
/// # Errors
///
/// Returns an error if encoding fails or the file cannot be written
pub async fn write_wav_file<P: AsRef<Path>>(
    path: P,
    samples: &[i16],
    spec: WavSpec,
) -> VoxqueueResult<()> {
    let path = path.as_ref();
    let bytes = encode_wav_with_spec(samples, spec)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            VoxqueueError::file(format!("Failed to create directory {}: {e}", parent.display()))
        })?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| VoxqueueError::file(format!("Failed to write WAV file {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn test_wav_spec() {
        let spec = WavSpec::pcm16(24000, 1);
        assert_eq!(spec.bytes_per_sample(), 2);
        assert_eq!(spec.byte_rate(), Some(48000));
        assert_eq!(spec.block_align(), Some(2));

        let stereo_spec = WavSpec::pcm16(44100, 2);
        assert_eq!(stereo_spec.byte_rate(), Some(176_400));
        assert_eq!(stereo_spec.block_align(), Some(4));
    }

    #[test]
    fn test_empty_samples_give_bare_header() {
        let wav = encode_wav(&[], 24000, 1).unwrap();
        assert_eq!(wav.len(), 44);
        assert_eq!(u32_at(&wav, 40), 0);
        assert_eq!(u32_at(&wav, 4), 36);
    }

    #[test]
    fn test_header_layout_is_byte_exact() {
        let wav = encode_wav(&[1, -2], 24000, 1).unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(b"RIFF");
        expected.extend_from_slice(&40u32.to_le_bytes());
        expected.extend_from_slice(b"WAVEfmt ");
        expected.extend_from_slice(&16u32.to_le_bytes());
        expected.extend_from_slice(&1u16.to_le_bytes());
        expected.extend_from_slice(&1u16.to_le_bytes());
        expected.extend_from_slice(&24000u32.to_le_bytes());
        expected.extend_from_slice(&48000u32.to_le_bytes());
        expected.extend_from_slice(&2u16.to_le_bytes());
        expected.extend_from_slice(&16u16.to_le_bytes());
        expected.extend_from_slice(b"data");
        expected.extend_from_slice(&4u32.to_le_bytes());
        expected.extend_from_slice(&[0x01, 0x00, 0xFE, 0xFF]);
        assert_eq!(wav, expected);
    }

    #[rstest]
    #[case(24000, 1, 48_000, 2)]
    #[case(44100, 2, 176_400, 4)]
    #[case(48000, 6, 576_000, 12)]
    #[case(8000, 1, 16_000, 2)]
    fn test_header_fields(
        #[case] rate: u32,
        #[case] channels: u16,
        #[case] byte_rate: u32,
        #[case] block_align: u16,
    ) {
        let wav = encode_wav(&[0; 12], rate, channels).unwrap();
        let (spec, data_size) = WavSpec::parse_header(&wav).unwrap();
        assert_eq!(spec, WavSpec::pcm16(rate, channels));
        assert_eq!(data_size, 24);
        assert_eq!(u32_at(&wav, 28), byte_rate);
        assert_eq!(u16::from_le_bytes([wav[32], wav[33]]), block_align);
    }

    #[test]
    fn test_zero_rate_or_channels_rejected() {
        assert!(encode_wav(&[0], 0, 1).is_err());
        assert!(encode_wav(&[0], 24000, 0).is_err());
    }

    #[test]
    fn test_parse_header_rejects_garbage() {
        assert!(WavSpec::parse_header(&[0u8; 10]).is_err());
        assert!(WavSpec::parse_header(&[0u8; 44]).is_err());
    }

    #[test]
    fn test_wav_from_base64() {
        let payload = crate::pcm::encode_samples(&[100, -100, 0]);
        let wav = wav_from_base64(&payload).unwrap();
        assert_eq!(wav.len(), 44 + 6);
        assert_eq!(&wav[44..], &crate::pcm::to_bytes(&[100, -100, 0])[..]);

        assert!(wav_from_base64("%%%").is_err());
    }

    #[tokio::test]
    async fn test_write_wav_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.wav");

        write_wav_file(&path, &[0, 16383, -16384], WavSpec::default())
            .await
            .unwrap();

        // 44 byte header + 6 bytes data
        let metadata = std::fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), 50);
    }

    proptest! {
        #[test]
        fn prop_encoding_is_deterministic(
            samples in proptest::collection::vec(any::<i16>(), 0..256),
            rate in 1u32..200_000,
            channels in 1u16..8,
        ) {
            let first = encode_wav(&samples, rate, channels).unwrap();
            let second = encode_wav(&samples, rate, channels).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), 44 + samples.len() * 2);
            prop_assert_eq!(u32_at(&first, 40) as usize, samples.len() * 2);
        }
    }
}
