//! Base64 PCM payload codec.
//!
//! The synthesis service returns raw little-endian 16-bit PCM wrapped in
//! standard base64. Everything downstream, WAV export and playback, starts
//! from [`decode_samples`].

use crate::error::VoxqueueResult;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Standard alphabet; padding optional, non-zero trailing bits tolerated
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a standard base64 string into raw bytes.
///
/// ASCII whitespace anywhere in the input is skipped and padding is
/// optional.
///
/// # Errors
///
/// Returns a decode error if the input is not valid base64
pub fn decode(base64: &str) -> VoxqueueResult<Vec<u8>> {
    let compact: Vec<u8> = base64
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(FORGIVING.decode(compact)?)
}

/// Reinterpret bytes as little-endian signed 16-bit samples.
///
/// A trailing odd byte is ignored.
#[must_use]
pub fn to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Decode a base64 PCM payload straight to samples
///
/// # Errors
///
/// Returns a decode error if the input is not valid base64
pub fn decode_samples(base64: &str) -> VoxqueueResult<Vec<i16>> {
    decode(base64).map(|bytes| to_samples(&bytes))
}

/// Flatten samples to little-endian bytes
#[must_use]
pub fn to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Encode samples as a base64 PCM payload, the inverse of [`decode_samples`]
#[must_use]
pub fn encode_samples(samples: &[i16]) -> String {
    STANDARD.encode(to_bytes(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_known_payload() {
        // 0x0001, 0xFFFF (-1), 0x7FFF
        let bytes = decode("AQD///9/").unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert_eq!(to_samples(&bytes), vec![1, -1, i16::MAX]);
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode("not base64!").unwrap_err();
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn test_decode_is_lenient_about_layout() {
        let expected = vec![0x01, 0x00, 0xFF, 0xFF, 0xFF, 0x7F];
        assert_eq!(decode("AQD/\n//9/\r\n").unwrap(), expected);
        assert_eq!(decode(" AQ D/ //9/ ").unwrap(), expected);

        // Unpadded payloads decode like padded ones
        assert_eq!(decode("AAA").unwrap(), decode("AAA=").unwrap());
        assert_eq!(decode("AQ").unwrap(), vec![0x01]);
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        assert!(decode("AQDAA").is_err());
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode_samples("").unwrap().is_empty());
    }

    #[test]
    fn test_odd_trailing_byte_ignored() {
        let samples = to_samples(&[0x00, 0x80, 0x42]);
        assert_eq!(samples, vec![i16::MIN]);
    }

    #[test]
    fn test_encode_samples_known_payload() {
        assert_eq!(encode_samples(&[1, -1, i16::MAX]), "AQD///9/");
    }

    proptest! {
        #[test]
        fn prop_round_trip(samples in proptest::collection::vec(any::<i16>(), 0..512)) {
            let encoded = STANDARD.encode(to_bytes(&samples));
            prop_assert_eq!(to_samples(&decode(&encoded).unwrap()), samples);
        }

        #[test]
        fn prop_sample_count_is_half_byte_count(bytes in proptest::collection::vec(any::<u8>(), 0..513)) {
            prop_assert_eq!(to_samples(&bytes).len(), bytes.len() / 2);
        }
    }
}
