use log::debug;

use crate::config::EncoderConfig;
use crate::error::Result;
use crate::framing::FrameEncoder;
use crate::qpsk::{bytes_to_symbols, QpskModulator};
use crate::scrambler::Scrambler;
use crate::target::Pacing;
use crate::AudioBlock;

/// QPSK encoding session
///
/// Owns the two pieces of state that must persist for a whole firmware
/// image: the modulator's sample counter (carrier phase) and the scrambler
/// keystream. Every block produced by one session continues exactly where
/// the previous block ended.
pub struct QpskEncoder {
    config: EncoderConfig,
    modulator: QpskModulator,
    scrambler: Option<Scrambler>,
}

impl QpskEncoder {
    pub fn new(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            modulator: QpskModulator::new(
                config.sample_rate,
                config.carrier_frequency,
                config.bit_rate,
            )?,
            scrambler: config.scramble.then(|| Scrambler::new(0)),
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn packet_size(&self) -> usize {
        self.config.packet_size
    }

    /// Absolute index of the next modulated sample
    pub fn sample_index(&self) -> u64 {
        self.modulator.sample_index()
    }

    pub fn scrambler(&self) -> Option<&Scrambler> {
        self.scrambler.as_ref()
    }

    /// Modulate raw symbols, advancing the session phase
    pub fn encode_symbols(&mut self, symbols: &[u8]) -> AudioBlock {
        self.modulator.modulate(symbols)
    }

    /// Frame, map and modulate one packet of at most `packet_size` bytes
    pub fn code_packet(&mut self, data: &[u8]) -> Result<AudioBlock> {
        let frame = FrameEncoder::encode(data, self.config.packet_size, self.scrambler.as_mut())?;
        debug!(
            "Packet: {} payload bytes, {} frame bytes, sample {}",
            data.len(),
            frame.len(),
            self.modulator.sample_index()
        );
        Ok(self.modulator.modulate(&bytes_to_symbols(&frame)))
    }

    /// Number of zero symbols in a blank of `duration` seconds, rounded down
    /// to whole bytes
    pub fn blank_symbol_count(&self, duration: f64) -> Result<usize> {
        self.config.blank_symbol_count(duration)
    }

    /// Zero-symbol carrier of `duration` seconds
    ///
    /// Goes through the modulator so the phase stays continuous across the
    /// pause; the receiver sees an unmodulated carrier, not digital silence.
    pub fn code_blank(&mut self, duration: f64) -> Result<AudioBlock> {
        let symbols = vec![0u8; self.blank_symbol_count(duration)?];
        Ok(self.modulator.modulate(&symbols))
    }

    /// One second of digital silence that precedes the carrier.
    /// Does not touch the modulator phase.
    pub fn leading_silence(&self) -> AudioBlock {
        vec![0.0; self.config.sample_rate as usize]
    }

    /// Page-paced packet walk over `data`: a `pause` blank follows every
    /// `page_size` bytes. `data` is virtually padded with 0xFF to a whole
    /// number of pages.
    pub fn code<'e, 'd>(
        &'e mut self,
        data: &'d [u8],
        page_size: usize,
        pause: f64,
    ) -> Result<PagedBlocks<'e, 'd>> {
        Pacing::PagePaced {
            page_size,
            pause_short: pause,
        }
        .validate(&self.config)?;

        let walker = PageWalker::new(data, page_size, self.config.packet_size, pause);
        Ok(PagedBlocks {
            encoder: self,
            walker,
        })
    }
}

/// Cursor over one page-paced region
///
/// Holds no reference to the encoder so it can be driven from a larger
/// stream that also owns the session.
#[derive(Debug, Clone)]
pub(crate) struct PageWalker<'d> {
    data: &'d [u8],
    padded_len: usize,
    offset: usize,
    packet_size: usize,
    packets_per_page: usize,
    packets_in_page: usize,
    pause: f64,
    pause_pending: bool,
}

impl<'d> PageWalker<'d> {
    /// `page_size` must be a non-zero multiple of `packet_size`
    pub(crate) fn new(data: &'d [u8], page_size: usize, packet_size: usize, pause: f64) -> Self {
        Self {
            data,
            padded_len: data.len().div_ceil(page_size) * page_size,
            offset: 0,
            packet_size,
            packets_per_page: page_size / packet_size,
            packets_in_page: 0,
            pause,
            pause_pending: false,
        }
    }

    pub(crate) fn next_block(&mut self, encoder: &mut QpskEncoder) -> Option<Result<AudioBlock>> {
        if self.pause_pending {
            self.pause_pending = false;
            return Some(encoder.code_blank(self.pause));
        }
        if self.offset >= self.padded_len {
            return None;
        }

        // Past the end of the image the packet is all padding
        let start = self.offset.min(self.data.len());
        let end = (self.offset + self.packet_size).min(self.data.len());
        let block = encoder.code_packet(&self.data[start..end]);

        self.offset += self.packet_size;
        self.packets_in_page += 1;
        if self.packets_in_page == self.packets_per_page {
            self.packets_in_page = 0;
            self.pause_pending = true;
        }

        Some(block)
    }
}

/// Lazy page-paced block sequence, see [`QpskEncoder::code`]
pub struct PagedBlocks<'e, 'd> {
    encoder: &'e mut QpskEncoder,
    walker: PageWalker<'d>,
}

impl Iterator for PagedBlocks<'_, '_> {
    type Item = Result<AudioBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        self.walker.next_block(self.encoder)
    }
}
