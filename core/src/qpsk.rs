use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::config::EncoderConfig;
use crate::error::Result;

// QPSK configuration
//
// Each 2-bit symbol carries its low bit on the sine carrier and its high bit
// on the cosine carrier. Bits are bipolar (-1/+1), held for a whole symbol
// (zero-order hold) and scaled by 1/sqrt(2) so the sum peaks at 1.0.
//
// Phase is derived from an absolute sample counter that is never reset, so
// splitting a symbol stream across calls does not change a single sample.

/// Number of 2-bit symbols per byte
pub const SYMBOLS_PER_BYTE: usize = 4;

/// Expand bytes into 2-bit symbols (0..=3), most significant pair first
pub fn bytes_to_symbols(bytes: &[u8]) -> Vec<u8> {
    let mut symbols = Vec::with_capacity(bytes.len() * SYMBOLS_PER_BYTE);
    for &byte in bytes {
        symbols.push((byte >> 6) & 0x3);
        symbols.push((byte >> 4) & 0x3);
        symbols.push((byte >> 2) & 0x3);
        symbols.push(byte & 0x3);
    }
    symbols
}

/// QPSK modulator with a persistent sample counter
#[derive(Debug, Clone)]
pub struct QpskModulator {
    sample_rate: u32,
    carrier_frequency: u32,
    samples_per_symbol: usize,
    sample_index: u64,
}

impl QpskModulator {
    /// Rates must satisfy the integer-ratio rules of [`EncoderConfig::validate`]
    pub fn new(sample_rate: u32, carrier_frequency: u32, bit_rate: u32) -> Result<Self> {
        let rates = EncoderConfig {
            sample_rate,
            carrier_frequency,
            bit_rate,
            ..EncoderConfig::default()
        };
        rates.validate()?;

        Ok(Self {
            sample_rate,
            carrier_frequency,
            samples_per_symbol: rates.samples_per_symbol(),
            sample_index: 0,
        })
    }

    pub fn samples_per_symbol(&self) -> usize {
        self.samples_per_symbol
    }

    /// Absolute index of the next sample to be produced
    pub fn sample_index(&self) -> u64 {
        self.sample_index
    }

    /// Modulate symbols onto the carrier, continuing from the last call's phase
    pub fn modulate(&mut self, symbols: &[u8]) -> Vec<f32> {
        let sps = self.samples_per_symbol;
        let sample_rate = self.sample_rate as f64;
        let carrier = self.carrier_frequency as f64;

        let mut samples = Vec::with_capacity(symbols.len() * sps);
        let mut n = self.sample_index;

        for &symbol in symbols {
            let even = bipolar(symbol % 2) * FRAC_1_SQRT_2;
            let odd = bipolar((symbol / 2) % 2) * FRAC_1_SQRT_2;

            for _ in 0..sps {
                let t = n as f64 / sample_rate;
                let phase = 2.0 * PI * carrier * t;
                samples.push((even * phase.sin() + odd * phase.cos()) as f32);
                n += 1;
            }
        }

        self.sample_index = n;
        samples
    }
}

fn bipolar(bit: u8) -> f64 {
    2.0 * bit as f64 - 1.0
}
