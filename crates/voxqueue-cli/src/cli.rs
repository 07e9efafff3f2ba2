//! Command-line interface for Voxqueue
//!
//! Handles argument parsing and logging configuration.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use voxqueue_core::Gender;

/// Voxqueue - batched text-to-speech with WAV export
#[derive(Parser, Debug)]
#[command(name = "voxqueue")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List available voices
    Voices {
        /// Only voices of this language
        #[arg(long)]
        language: Option<String>,
        /// Only voices with this accent
        #[arg(long)]
        accent: Option<String>,
        /// Only voices of this gender (male, female, neutral)
        #[arg(long)]
        gender: Option<Gender>,
    },

    /// Synthesize a batch of texts and save the results
    Generate {
        /// Voice ID (falls back to `default_voice` from the config)
        #[arg(long)]
        voice: Option<String>,
        /// Read one text per non-blank line from a file
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// Where to write the WAV files (falls back to `output_dir`)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
        /// Also write every result into one zip archive
        #[arg(long)]
        zip: bool,
        /// Play the first result when the batch finishes
        #[arg(long)]
        play: bool,
        /// Texts to synthesize
        text: Vec<String>,
    },

    /// Convert a base64 PCM file into a WAV file
    Convert {
        /// File holding base64 encoded 24 kHz mono 16-bit PCM
        #[arg(long, value_name = "PCM_B64")]
        input: PathBuf,
        /// WAV file to write
        #[arg(long, value_name = "WAV")]
        output: PathBuf,
    },

    /// Play a base64 PCM file
    Play {
        /// File holding base64 encoded 24 kHz mono 16-bit PCM
        #[arg(long, value_name = "PCM_B64")]
        input: PathBuf,
    },

    /// Print the parameters of a WAV file
    Inspect {
        /// WAV file to read
        #[arg(long, value_name = "WAV")]
        input: PathBuf,
    },
}

impl Args {
    /// Default filter directive for the requested verbosity
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Initialize the logging system; `RUST_LOG` wins over `-v`
pub fn init_logging(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
