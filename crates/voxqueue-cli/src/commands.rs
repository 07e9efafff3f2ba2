//! Subcommand implementations

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use voxqueue_core::export::{download_single, write_archive};
use voxqueue_core::wav_writer::wav_from_base64;
use voxqueue_core::{
    AppConfig, GeminiGateway, Gender, ItemStatus, PlaybackEngine, SpeechQueue, VoiceManager, WavSpec,
};

const PREVIEW_CHARS: usize = 40;

/// Options of the `generate` subcommand
#[derive(Debug, Default)]
pub struct GenerateOptions {
    pub voice: Option<String>,
    pub file: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub zip: bool,
    pub play: bool,
    pub text: Vec<String>,
}

pub fn list_voices(language: Option<&str>, accent: Option<&str>, gender: Option<Gender>) {
    let manager = VoiceManager::new();
    let voices = manager.search(language, accent, gender);

    if voices.is_empty() {
        println!("No voices match the given filters");
        return;
    }

    for voice in voices {
        println!(
            "{:<20} {:<24} {} / {}",
            voice.id,
            voice.to_string(),
            voice.language,
            voice.accent
        );
    }
}

/// Positional texts first, then each non-blank line of the file
pub fn collect_texts(positional: &[String], file_contents: Option<&str>) -> Vec<String> {
    positional
        .iter()
        .map(String::as_str)
        .chain(file_contents.into_iter().flat_map(str::lines))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect()
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS - 3).collect();
    format!("{cut}...")
}

/// Run one batch; returns whether every item succeeded.
///
/// Saving, archiving or playing a result can fail on its own; each such
/// failure is reported, counted and the remaining steps still run.
pub async fn generate(
    config: &AppConfig,
    options: GenerateOptions,
    playback: &mut PlaybackEngine,
) -> Result<bool> {
    let voice_id = options
        .voice
        .or_else(|| config.default_voice.clone())
        .context("No voice selected: pass --voice or set default_voice in the config")?;
    let voices = VoiceManager::new();
    let voice = voices.get_voice(&voice_id)?;

    let file_contents = match &options.file {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };
    let texts = collect_texts(&options.text, file_contents.as_deref());
    if texts.is_empty() {
        bail!("Nothing to synthesize: pass text arguments or --file");
    }

    let gateway = GeminiGateway::new(config.gateway_config())?;
    let queue = SpeechQueue::new(Arc::new(gateway));
    for text in &texts {
        queue.enqueue(text);
    }

    info!("Generating {} item(s) with voice {}", queue.len(), voice);
    let summary = queue.process_all(&voice.id).await?;

    let out_dir = options.out_dir.unwrap_or_else(|| config.output_dir.clone());
    let items = queue.items();
    let mut saved = 0usize;
    let mut failed = 0usize;

    for (index, item) in items.iter().enumerate() {
        match (item.status(), item.generated_audio()) {
            (ItemStatus::Done, Some(audio)) => match save_item(audio, index, &out_dir).await {
                Ok(path) => {
                    saved += 1;
                    println!("[done]  {}  ->  {}", preview(item.text()), path.display());
                }
                Err(e) => {
                    failed += 1;
                    println!("[error] {}  :  {e}", preview(item.text()));
                }
            },
            (ItemStatus::Error, _) => {
                failed += 1;
                println!(
                    "[error] {}  :  {}",
                    preview(item.text()),
                    item.error().unwrap_or("Unknown error")
                );
            }
            (status, _) => println!("[{status}] {}", preview(item.text())),
        }
    }

    if options.zip {
        let archive_path = out_dir.join(&config.archive_name);
        match save_archive(&queue, &archive_path).await {
            Ok(true) => println!("Archive written to {}", archive_path.display()),
            Ok(false) => warn!("No finished audio to archive"),
            Err(e) => {
                failed += 1;
                warn!("Archive not written: {e:#}");
            }
        }
    }

    if options.play {
        match items.iter().find_map(|item| item.generated_audio()) {
            Some(audio) => {
                if let Err(e) = play_payload(playback, audio).await {
                    failed += 1;
                    warn!("Playback failed: {e:#}");
                }
            }
            None => warn!("No finished audio to play"),
        }
    }

    println!(
        "{} succeeded, {} failed ({} of {} saved)",
        summary.succeeded,
        summary.failed,
        saved,
        items.len()
    );
    Ok(failed == 0)
}

async fn save_item(audio: &str, index: usize, out_dir: &Path) -> Result<PathBuf> {
    Ok(download_single(audio, index)?.write_to_dir(out_dir).await?)
}

/// Returns `false` when nothing was finished
async fn save_archive(queue: &SpeechQueue, path: &Path) -> Result<bool> {
    match queue.export_all().await? {
        Some(bytes) => {
            write_archive(&bytes, path).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

async fn read_payload(input: &Path) -> Result<String> {
    tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))
}

pub async fn convert(input: &Path, output: &Path) -> Result<()> {
    let payload = read_payload(input).await?;
    let wav = wav_from_base64(&payload)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(output, &wav)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote {} ({} bytes)", output.display(), wav.len());
    Ok(())
}

pub async fn play(input: &Path, playback: &mut PlaybackEngine) -> Result<()> {
    let payload = read_payload(input).await?;
    play_payload(playback, &payload).await
}

async fn play_payload(playback: &mut PlaybackEngine, payload: &str) -> Result<()> {
    playback.play(payload)?;
    playback.wait_for_completion().await;
    Ok(())
}

pub async fn inspect(input: &Path) -> Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let (spec, data_len) = WavSpec::parse_header(&bytes)?;

    let frame_bytes = u32::from(spec.channels) * u32::from(spec.bytes_per_sample());
    let frames = data_len / frame_bytes.max(1);
    println!("{}", input.display());
    println!("  channels:    {}", spec.channels);
    println!("  sample rate: {} Hz", spec.sample_rate);
    println!("  bit depth:   {}", spec.bit_depth);
    println!("  data bytes:  {data_len}");
    println!(
        "  duration:    {:.3}s",
        f64::from(frames) / f64::from(spec.sample_rate.max(1))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_texts() {
        let positional = vec!["  Hello ".to_string(), "".to_string()];
        let texts = collect_texts(&positional, Some("first line\n\n   \nsecond line\r\n"));
        assert_eq!(texts, vec!["Hello", "first line", "second line"]);
        assert!(collect_texts(&[], None).is_empty());
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short"), "short");
        let long = "a".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS);
        assert!(shown.ends_with("..."));
    }

    #[tokio::test]
    async fn test_convert_then_inspect() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("speech.b64");
        let output = dir.path().join("out").join("speech.wav");
        // 1, -1, 32767
        std::fs::write(&input, "AQD///9/\n").unwrap();

        convert(&input, &output).await.unwrap();
        let wav = std::fs::read(&output).unwrap();
        assert_eq!(wav.len(), 44 + 6);

        inspect(&output).await.unwrap();
    }

    #[tokio::test]
    async fn test_convert_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bad.b64");
        std::fs::write(&input, "not base64!").unwrap();

        assert!(convert(&input, &dir.path().join("bad.wav")).await.is_err());
    }

    #[tokio::test]
    async fn test_generate_without_voice() {
        let options = GenerateOptions {
            text: vec!["Hello".to_string()],
            ..GenerateOptions::default()
        };
        let err = generate(&AppConfig::default(), options, &mut PlaybackEngine::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No voice selected"));
    }

    #[tokio::test]
    async fn test_generate_unknown_voice() {
        let options = GenerateOptions {
            voice: Some("Nobody".to_string()),
            text: vec!["Hello".to_string()],
            ..GenerateOptions::default()
        };
        let err = generate(&AppConfig::default(), options, &mut PlaybackEngine::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Voice 'Nobody' not found");
    }

    #[tokio::test]
    async fn test_generate_without_text() {
        let options = GenerateOptions {
            voice: Some("Kore".to_string()),
            ..GenerateOptions::default()
        };
        assert!(generate(&AppConfig::default(), options, &mut PlaybackEngine::new())
            .await
            .is_err());
    }

    mod batch {
        use super::*;
        use serde_json::json;
        use std::io::Cursor;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use voxqueue_core::{
            ActiveSource, AudioBuffer, AudioConfig, AudioOutput, VoxqueueError, VoxqueueResult,
        };
        use wiremock::matchers::{body_partial_json, method};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        // 1, -1, 32767
        const GOOD_AUDIO: &str = "AQD///9/";

        struct FinishedSource;

        impl ActiveSource for FinishedSource {
            fn stop(&mut self) {}

            fn is_finished(&self) -> bool {
                true
            }
        }

        struct CountingOutput(Arc<AtomicUsize>);

        impl AudioOutput for CountingOutput {
            fn name(&self) -> String {
                "Counting Device".to_string()
            }

            fn start(&mut self, _buffer: AudioBuffer) -> VoxqueueResult<Box<dyn ActiveSource>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FinishedSource))
            }
        }

        fn counting_engine() -> (PlaybackEngine, Arc<AtomicUsize>) {
            let started = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&started);
            let engine = PlaybackEngine::with_opener(
                AudioConfig::default(),
                Box::new(move || {
                    Ok(Box::new(CountingOutput(Arc::clone(&counter))) as Box<dyn AudioOutput>)
                }),
            );
            (engine, started)
        }

        fn config_for(server: &MockServer, dir: &TempDir) -> AppConfig {
            AppConfig {
                api_key: Some("test-key".to_string()),
                endpoint: format!("{}/v1beta", server.uri()),
                output_dir: dir.path().to_path_buf(),
                ..AppConfig::default()
            }
        }

        async fn respond(server: &MockServer, text: &str, response: ResponseTemplate) {
            Mock::given(method("POST"))
                .and(body_partial_json(json!({ "contents": [{ "parts": [{ "text": text }] }] })))
                .respond_with(response)
                .mount(server)
                .await;
        }

        fn audio(data: &str) -> ResponseTemplate {
            ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "inlineData": { "data": data } }] } }]
            }))
        }

        fn options(texts: &[&str]) -> GenerateOptions {
            GenerateOptions {
                voice: Some("Kore".to_string()),
                zip: true,
                text: texts.iter().map(|t| (*t).to_string()).collect(),
                ..GenerateOptions::default()
            }
        }

        #[tokio::test]
        async fn test_all_items_saved_archived_and_played() {
            let server = MockServer::start().await;
            respond(&server, "Hello", audio(GOOD_AUDIO)).await;
            respond(&server, "World", audio(GOOD_AUDIO)).await;
            let dir = TempDir::new().unwrap();
            let config = config_for(&server, &dir);
            let (mut playback, started) = counting_engine();

            let mut opts = options(&["Hello", "World"]);
            opts.play = true;
            let ok = generate(&config, opts, &mut playback).await.unwrap();

            assert!(ok);
            let expected = wav_from_base64(GOOD_AUDIO).unwrap();
            for name in ["audio_1.wav", "audio_2.wav"] {
                assert_eq!(std::fs::read(dir.path().join(name)).unwrap(), expected);
            }

            let bytes = std::fs::read(config.archive_path()).unwrap();
            let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
            let mut names: Vec<&str> = archive.file_names().collect();
            names.sort_unstable();
            assert_eq!(names, vec!["audio_1.wav", "audio_2.wav"]);

            assert_eq!(started.load(Ordering::SeqCst), 1);
            assert!(playback.is_device_open());
        }

        #[tokio::test]
        async fn test_failures_are_isolated_per_item() {
            let server = MockServer::start().await;
            respond(&server, "first", audio("not*base64")).await;
            respond(&server, "second", ResponseTemplate::new(500).set_body_string("boom")).await;
            respond(&server, "third", audio(GOOD_AUDIO)).await;
            let dir = TempDir::new().unwrap();
            let config = config_for(&server, &dir);

            let ok = generate(&config, options(&["first", "second", "third"]), &mut PlaybackEngine::new())
                .await
                .unwrap();

            assert!(!ok);
            assert!(!dir.path().join("audio_1.wav").exists());
            assert!(!dir.path().join("audio_2.wav").exists());
            assert_eq!(
                std::fs::read(dir.path().join("audio_3.wav")).unwrap(),
                wav_from_base64(GOOD_AUDIO).unwrap()
            );
            // The undecodable payload spoils the archive, not the other files
            assert!(!config.archive_path().exists());
        }

        #[tokio::test]
        async fn test_playback_failure_keeps_saved_files() {
            let server = MockServer::start().await;
            respond(&server, "Hello", audio(GOOD_AUDIO)).await;
            let dir = TempDir::new().unwrap();
            let config = config_for(&server, &dir);
            let mut playback = PlaybackEngine::with_opener(
                AudioConfig::default(),
                Box::new(|| Err(VoxqueueError::playback("no output device"))),
            );

            let mut opts = options(&["Hello"]);
            opts.play = true;
            let ok = generate(&config, opts, &mut playback).await.unwrap();

            assert!(!ok);
            assert!(dir.path().join("audio_1.wav").is_file());
            assert!(config.archive_path().is_file());
        }
    }
}
