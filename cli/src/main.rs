use clap::Parser;
use hound::WavSpec;
use log::{error, info};
use qpsk_bootloader_core::{
    encode_firmware, AudioModemError, EncoderConfig, FirmwareBlocks, Pacing, QpskEncoder, Target,
    TargetOverrides, DEFAULT_BIT_RATE, DEFAULT_CARRIER_FREQUENCY, DEFAULT_PACKET_SIZE,
    DEFAULT_SAMPLE_RATE,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;

mod profile;

use profile::ProfileFile;

#[derive(Parser)]
#[command(name = "qpsk-encode")]
#[command(about = "Encode a firmware image into a QPSK audio file for audio bootloaders")]
struct Cli {
    /// Firmware image to encode
    #[arg(value_name = "FIRMWARE.BIN")]
    input: PathBuf,

    /// Randomize data stream
    #[arg(short = 'k', long)]
    scramble: bool,

    /// Sample rate in Hz
    #[arg(short = 's', long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Carrier frequency in Hz
    #[arg(short = 'c', long, default_value_t = DEFAULT_CARRIER_FREQUENCY)]
    carrier_frequency: u32,

    /// Baud rate in bps
    #[arg(short = 'b', long, default_value_t = DEFAULT_BIT_RATE)]
    baud_rate: u32,

    /// Packet size in bytes
    #[arg(short = 'p', long, default_value_t = DEFAULT_PACKET_SIZE)]
    packet_size: usize,

    /// Output WAV file (default: input path with .bin replaced by .wav)
    #[arg(short = 'o', long, value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Set page size and erase time for TARGET (stm32f1, stm32f3, stm32f4, stm32h7)
    #[arg(short = 't', long, value_name = "TARGET", default_value = "stm32f1")]
    target: String,

    /// Application starting sector number (0: target default)
    #[arg(short = 'a', long, default_value_t = 0)]
    start_sector: usize,

    /// Block size in bytes (0: target default)
    #[arg(short = 'g', long, default_value_t = 0)]
    block_size: usize,

    /// Load pacing from a JSON profile instead of a named target
    #[arg(
        long,
        value_name = "PROFILE.JSON",
        conflicts_with_all = ["target", "start_sector", "block_size"]
    )]
    profile: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Modem(#[from] AudioModemError),

    #[error("Failed to read {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid profile {}: {source}", path.display())]
    Profile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl CliError {
    /// Exit status: 2 for an unknown target, 1 for everything else
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Modem(AudioModemError::UnknownTarget(_)) => 2,
            _ => 1,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = run(cli) {
        error!("{}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    // Resolve every configuration error before touching the output file
    let pacing = resolve_pacing(&cli)?;
    let config = EncoderConfig {
        sample_rate: cli.sample_rate,
        carrier_frequency: cli.carrier_frequency,
        bit_rate: cli.baud_rate,
        packet_size: cli.packet_size,
        scramble: cli.scramble,
    };
    let mut encoder = QpskEncoder::new(config)?;

    let data = fs::read(&cli.input).map_err(|source| CliError::ReadInput {
        path: cli.input.clone(),
        source,
    })?;
    println!("Read {} bytes from {}", data.len(), cli.input.display());

    let blocks = encode_firmware(&mut encoder, &data, &pacing)?;

    let output = cli
        .output_file
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let spec = WavSpec {
        channels: 1,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    match write_wav(&output, spec, blocks) {
        Ok(num_samples) => {
            println!(
                "Encoded {} audio samples ({:.1} s)",
                num_samples,
                num_samples as f64 / config.sample_rate as f64
            );
            println!("Wrote {}", output.display());
            Ok(())
        }
        Err(e) => {
            // Never leave a truncated stream behind
            let _ = fs::remove_file(&output);
            Err(e)
        }
    }
}

fn resolve_pacing(cli: &Cli) -> Result<Pacing, CliError> {
    if let Some(path) = &cli.profile {
        info!("Using pacing profile {}", path.display());
        return ProfileFile::load(path);
    }

    let target: Target = cli.target.parse()?;
    let overrides = TargetOverrides {
        start_sector: cli.start_sector,
        block_size: cli.block_size,
    };
    info!("Target {}", target);
    Ok(target.pacing(&overrides)?)
}

/// Input path with `.bin` replaced by `.wav`, or `.wav` appended
fn default_output_path(input: &Path) -> PathBuf {
    let input = input.to_string_lossy();
    if input.contains(".bin") {
        PathBuf::from(input.replace(".bin", ".wav"))
    } else {
        PathBuf::from(format!("{}.wav", input))
    }
}

/// Stream blocks into a 16-bit mono WAV file as they are produced
fn write_wav(
    output: &Path,
    spec: WavSpec,
    blocks: FirmwareBlocks<'_, '_>,
) -> Result<usize, CliError> {
    let mut writer = hound::WavWriter::create(output, spec)?;

    let mut num_samples = 0;
    for block in blocks {
        let block = block?;
        num_samples += block.len();
        // Convert f32 samples to i16 range [-32768, 32767]
        for sample in block {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * 32767.0) as i16)?;
        }
    }
    writer.finalize()?;

    Ok(num_samples)
}
