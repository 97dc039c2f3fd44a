//! Firmware-to-audio encoder for QPSK audio bootloaders
//!
//! Splits a firmware image into CRC-protected packets, modulates them onto an
//! audio carrier with QPSK and inserts pauses sized to the target's flash
//! erase/write timing. Produces audio blocks lazily; performs no I/O.

pub mod config;
pub mod encoder;
pub mod error;
pub mod framing;
pub mod qpsk;
pub mod scrambler;
pub mod stream;
pub mod target;

pub use config::EncoderConfig;
pub use encoder::{PagedBlocks, QpskEncoder};
pub use error::{AudioModemError, Result};
pub use framing::FrameEncoder;
pub use qpsk::{bytes_to_symbols, QpskModulator};
pub use scrambler::Scrambler;
pub use stream::{encode_firmware, FirmwareBlocks};
pub use target::{Pacing, Target, TargetOverrides};

/// One contiguous run of mono samples in [-1, 1]
pub type AudioBlock = Vec<f32>;

// Modem defaults (must match the bootloader's demodulator)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;
pub const DEFAULT_CARRIER_FREQUENCY: u32 = 6000;
pub const DEFAULT_BIT_RATE: u32 = 12000;
pub const DEFAULT_PACKET_SIZE: usize = 256;

// Packet configuration
pub const PREAMBLE_SIZE: usize = 16;
pub const CRC_SIZE: usize = 4;
pub const PADDING_BYTE: u8 = 0xFF;

/// Zero-symbol carrier sent after the leading silence for receiver PLL lock
pub const INTRO_BLANK_DURATION: f64 = 1.0;
