//! Target device families and the pacing strategy each one needs.
//!
//! Page-paced targets erase uniformly sized pages and only need a short
//! pause after every page. Sector-paced targets have non-uniform erase
//! sectors; a block that starts exactly on a sector base address is followed
//! by a long erase pause, every other block by a short write-settle pause.

use std::fmt;
use std::str::FromStr;

use crate::config::EncoderConfig;
use crate::error::{AudioModemError, Result};

pub const STM32F4_SECTOR_BASE_ADDRESS: [u32; 12] = [
    0x0800_0000,
    0x0800_4000,
    0x0800_8000,
    0x0800_C000,
    0x0801_0000,
    0x0802_0000,
    0x0804_0000,
    0x0806_0000,
    0x0808_0000,
    0x080A_0000,
    0x080C_0000,
    0x080E_0000,
];

pub const STM32H7_SECTOR_BASE_ADDRESS: [u32; 16] = [
    0x0800_0000,
    0x0802_0000,
    0x0804_0000,
    0x0806_0000,
    0x0808_0000,
    0x080A_0000,
    0x080C_0000,
    0x080E_0000,
    0x0810_0000,
    0x0812_0000,
    0x0814_0000,
    0x0816_0000,
    0x0818_0000,
    0x081A_0000,
    0x081C_0000,
    0x081E_0000,
];

pub const STM32F4_BLOCK_SIZE: usize = 16384;
pub const STM32F4_APPLICATION_START: u32 = 0x0800_8000;
pub const STM32F4_ERASE_PAUSE: f64 = 3.5;

pub const STM32H7_BLOCK_SIZE: usize = 0x10000;
pub const STM32H7_APPLICATION_START: u32 = 0x0802_0000;
pub const STM32H7_ERASE_PAUSE: f64 = 3.0;

/// Pause after a sector-paced block that does not start a sector
pub const WRITE_SETTLE_PAUSE: f64 = 0.2;

/// Trailing blank after page-paced data
pub const PAGE_OUTRO_DURATION: f64 = 1.0;

/// Trailing blank after sector-paced data, long enough for the last erase/write
pub const SECTOR_OUTRO_DURATION: f64 = 5.0;

/// Supported bootloader targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stm32f1,
    Stm32f3,
    Stm32f4,
    Stm32h7,
}

impl Target {
    pub const ALL: [Target; 4] = [
        Target::Stm32f1,
        Target::Stm32f3,
        Target::Stm32f4,
        Target::Stm32h7,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Target::Stm32f1 => "stm32f1",
            Target::Stm32f3 => "stm32f3",
            Target::Stm32f4 => "stm32f4",
            Target::Stm32h7 => "stm32h7",
        }
    }

    /// Resolve the pacing strategy for this target, applying user overrides
    /// to sector-paced targets
    pub fn pacing(&self, overrides: &TargetOverrides) -> Result<Pacing> {
        match self {
            Target::Stm32f1 => Ok(Pacing::PagePaced {
                page_size: 1024,
                pause_short: 0.06,
            }),
            Target::Stm32f3 => Ok(Pacing::PagePaced {
                page_size: 2048,
                pause_short: 0.15,
            }),
            Target::Stm32f4 => Pacing::sector_paced(
                &STM32F4_SECTOR_BASE_ADDRESS,
                STM32F4_APPLICATION_START,
                STM32F4_BLOCK_SIZE,
                STM32F4_ERASE_PAUSE,
                overrides,
            ),
            Target::Stm32h7 => Pacing::sector_paced(
                &STM32H7_SECTOR_BASE_ADDRESS,
                STM32H7_APPLICATION_START,
                STM32H7_BLOCK_SIZE,
                STM32H7_ERASE_PAUSE,
                overrides,
            ),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = AudioModemError;

    fn from_str(s: &str) -> Result<Self> {
        Target::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| AudioModemError::UnknownTarget(s.to_string()))
    }
}

/// Optional overrides for sector-paced targets; `0` means "use the default"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetOverrides {
    /// Index into the sector table of the first programmed sector
    pub start_sector: usize,
    /// Bytes per encoded block
    pub block_size: usize,
}

/// How the firmware image is split and where the receiver gets time to
/// erase or write flash
#[derive(Debug, Clone, PartialEq)]
pub enum Pacing {
    /// Pause `pause_short` seconds after every `page_size` bytes
    PagePaced { page_size: usize, pause_short: f64 },
    /// Walk `block_size` blocks from `start_address`; a block whose start
    /// address is in `sector_table` is followed by `pause_erase`, any other
    /// block by `pause_settle`
    SectorPaced {
        sector_table: Vec<u32>,
        start_address: u32,
        block_size: usize,
        pause_erase: f64,
        pause_settle: f64,
    },
}

impl Pacing {
    fn sector_paced(
        table: &[u32],
        default_start: u32,
        default_block_size: usize,
        pause_erase: f64,
        overrides: &TargetOverrides,
    ) -> Result<Self> {
        let start_address = if overrides.start_sector == 0 {
            default_start
        } else {
            *table.get(overrides.start_sector).ok_or_else(|| {
                AudioModemError::InvalidConfig(format!(
                    "start sector {} out of range (target has {} sectors)",
                    overrides.start_sector,
                    table.len()
                ))
            })?
        };

        let block_size = if overrides.block_size == 0 {
            default_block_size
        } else {
            overrides.block_size
        };

        Ok(Pacing::SectorPaced {
            sector_table: table.to_vec(),
            start_address,
            block_size,
            pause_erase,
            pause_settle: WRITE_SETTLE_PAUSE,
        })
    }

    /// Bytes per erase unit the packet walk is aligned to
    pub fn unit_size(&self) -> usize {
        match self {
            Pacing::PagePaced { page_size, .. } => *page_size,
            Pacing::SectorPaced { block_size, .. } => *block_size,
        }
    }

    /// Duration of the blank that ends the stream
    pub fn outro_duration(&self) -> f64 {
        match self {
            Pacing::PagePaced { .. } => PAGE_OUTRO_DURATION,
            Pacing::SectorPaced { .. } => SECTOR_OUTRO_DURATION,
        }
    }

    /// A packet may never straddle a page or block, and every pause must
    /// be a blank the encoder can produce
    pub fn validate(&self, config: &EncoderConfig) -> Result<()> {
        let unit = self.unit_size();
        let packet_size = config.packet_size;
        if unit == 0 || packet_size == 0 || unit % packet_size != 0 {
            return Err(AudioModemError::InvalidConfig(format!(
                "page/block size {} must be a non-zero multiple of packet size {}",
                unit, packet_size
            )));
        }

        for pause in self.pauses() {
            config.blank_symbol_count(pause)?;
        }
        config.blank_symbol_count(self.outro_duration())?;
        Ok(())
    }

    fn pauses(&self) -> Vec<f64> {
        match self {
            Pacing::PagePaced { pause_short, .. } => vec![*pause_short],
            Pacing::SectorPaced {
                pause_erase,
                pause_settle,
                ..
            } => vec![*pause_erase, *pause_settle],
        }
    }

    /// Pause after the block starting at absolute `address`
    pub fn block_pause(&self, address: u64) -> f64 {
        match self {
            Pacing::PagePaced { pause_short, .. } => *pause_short,
            Pacing::SectorPaced {
                sector_table,
                pause_erase,
                pause_settle,
                ..
            } => {
                if sector_table.iter().any(|&sector| sector as u64 == address) {
                    *pause_erase
                } else {
                    *pause_settle
                }
            }
        }
    }

    /// Sector base addresses inside the programmed range that no block
    /// starts on. Those sectors never get an erase pause. The range includes
    /// the 0xFF padding that fills out the last block.
    pub fn unaligned_sectors(&self, image_len: usize) -> Vec<u32> {
        let Pacing::SectorPaced {
            sector_table,
            start_address,
            block_size,
            ..
        } = self
        else {
            return Vec::new();
        };
        if *block_size == 0 {
            return Vec::new();
        }

        let start = *start_address as u64;
        let end = start + (image_len.div_ceil(*block_size) * *block_size) as u64;
        sector_table
            .iter()
            .copied()
            .filter(|&sector| {
                let sector = sector as u64;
                sector > start && sector < end && (sector - start) % *block_size as u64 != 0
            })
            .collect()
    }
}
