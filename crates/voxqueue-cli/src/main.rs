//! Voxqueue - batched text-to-speech from the command line
//!
//! This is the main entry point for the `voxqueue` binary.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use commands::GenerateOptions;
use std::process::ExitCode;
use tracing::debug;
use voxqueue_core::{AppConfig, PlaybackEngine};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    cli::init_logging(&args);
    debug!("voxqueue-core {}", voxqueue_core::VERSION);

    // One engine per process; the output device opens on first playback
    let mut playback = PlaybackEngine::new();

    match args.command {
        Command::Voices {
            language,
            accent,
            gender,
        } => commands::list_voices(language.as_deref(), accent.as_deref(), gender),
        Command::Generate {
            voice,
            file,
            out_dir,
            zip,
            play,
            text,
        } => {
            let config = AppConfig::load(args.config.as_deref())?;
            let options = GenerateOptions {
                voice,
                file,
                out_dir,
                zip,
                play,
                text,
            };
            if !commands::generate(&config, options, &mut playback).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Convert { input, output } => commands::convert(&input, &output).await?,
        Command::Play { input } => commands::play(&input, &mut playback).await?,
        Command::Inspect { input } => commands::inspect(&input).await?,
    }

    Ok(ExitCode::SUCCESS)
}
