//! Single-file and zip archive export of generated speech.

use crate::error::{VoxqueueError, VoxqueueResult};
use crate::wav_writer::wav_from_base64;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// MIME type of exported files
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// File name for the `k`-th exported clip, counting from 1
#[must_use]
pub fn wav_file_name(k: usize) -> String {
    format!("audio_{k}.wav")
}

/// One encoded WAV file ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavExport {
    /// Suggested file name
    pub file_name: String,
    /// Complete WAV bytes
    pub bytes: Vec<u8>,
}

impl WavExport {
    /// Write the file into `dir`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns a file error if the directory or file cannot be written
    pub async fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> VoxqueueResult<PathBuf> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            VoxqueueError::file(format!("Failed to create directory {}: {e}", dir.display()))
        })?;

        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes)
            .await
            .map_err(|e| VoxqueueError::file(format!("Failed to write {}: {e}", path.display())))?;
        Ok(path)
    }
}

/// Encode one payload for download; `index` is the item's 0-based position
/// in the queue, so the file is named `audio_<index + 1>.wav`
///
/// # Errors
///
/// Returns a decode error for a malformed payload
pub fn download_single(base64: &str, index: usize) -> VoxqueueResult<WavExport> {
    Ok(WavExport {
        file_name: wav_file_name(index + 1),
        bytes: wav_from_base64(base64)?,
    })
}

/// Build a zip archive with one `audio_<k>.wav` per payload, in order
///
/// # Errors
///
/// Returns a decode error for a malformed payload or an archive error if
/// zip encoding fails
pub fn build_archive<S: AsRef<str>>(payloads: &[S]) -> VoxqueueResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (i, payload) in payloads.iter().enumerate() {
        let wav = wav_from_base64(payload.as_ref())?;
        zip.start_file(wav_file_name(i + 1), options)?;
        zip.write_all(&wav)
            .map_err(|e| VoxqueueError::archive(format!("Failed to add {}: {e}", wav_file_name(i + 1))))?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Write archive bytes to `path`, creating parent directories
///
/// # Errors
///
/// Returns a file error if the archive cannot be written
pub async fn write_archive<P: AsRef<Path>>(bytes: &[u8], path: P) -> VoxqueueResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            VoxqueueError::file(format!("Failed to create directory {}: {e}", parent.display()))
        })?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| VoxqueueError::file(format!("Failed to write {}: {e}", path.display())))?;
    info!("Wrote archive {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
