use crate::error::{AudioModemError, Result};

/// Modem parameters shared by the encoder and the receiving bootloader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Carrier frequency in Hz
    pub carrier_frequency: u32,
    /// Bit rate in bits per second (two bits per symbol)
    pub bit_rate: u32,
    /// Payload bytes per packet
    pub packet_size: usize,
    /// Whiten payloads with the seed-0 scrambler
    pub scramble: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
            carrier_frequency: crate::DEFAULT_CARRIER_FREQUENCY,
            bit_rate: crate::DEFAULT_BIT_RATE,
            packet_size: crate::DEFAULT_PACKET_SIZE,
            scramble: false,
        }
    }
}

impl EncoderConfig {
    /// Check the integer-ratio constraints the demodulator relies on
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.carrier_frequency == 0 || self.bit_rate == 0 {
            return Err(AudioModemError::InvalidConfig(
                "sample rate, carrier frequency and bit rate must be > 0".to_string(),
            ));
        }
        if self.packet_size == 0 {
            return Err(AudioModemError::InvalidConfig(
                "packet size must be > 0".to_string(),
            ));
        }
        if self.sample_rate % self.carrier_frequency != 0 {
            return Err(AudioModemError::InvalidConfig(format!(
                "sample rate {} is not a multiple of carrier frequency {}",
                self.sample_rate, self.carrier_frequency
            )));
        }
        if self.sample_rate % self.bit_rate != 0 {
            return Err(AudioModemError::InvalidConfig(format!(
                "sample rate {} is not a multiple of bit rate {}",
                self.sample_rate, self.bit_rate
            )));
        }

        let period = self.carrier_period();
        let symbol_time = self.samples_per_symbol();
        if symbol_time % period != 0 && period % symbol_time != 0 {
            return Err(AudioModemError::InvalidConfig(format!(
                "carrier period ({} samples) and symbol duration ({} samples) must divide one another",
                period, symbol_time
            )));
        }

        Ok(())
    }

    /// Carrier period in samples
    pub fn carrier_period(&self) -> usize {
        (self.sample_rate / self.carrier_frequency) as usize
    }

    /// Symbol duration in samples
    pub fn samples_per_symbol(&self) -> usize {
        (self.sample_rate / self.bit_rate) as usize * 2
    }

    /// Zero symbols in a blank of `duration` seconds, rounded down to whole
    /// bytes. Fails for negative or non-finite durations and for blanks whose
    /// sample count does not fit in memory indices.
    pub fn blank_symbol_count(&self, duration: f64) -> Result<usize> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(AudioModemError::InvalidConfig(format!(
                "pause duration {} must be a finite, non-negative number of seconds",
                duration
            )));
        }

        let bytes = (duration * self.bit_rate as f64 / 8.0) as usize;
        bytes
            .checked_mul(crate::qpsk::SYMBOLS_PER_BYTE)
            .filter(|symbols| symbols.checked_mul(self.samples_per_symbol()).is_some())
            .ok_or_else(|| {
                AudioModemError::InvalidConfig(format!(
                    "pause duration {} s is too long",
                    duration
                ))
            })
    }
}
