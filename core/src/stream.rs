use log::{info, warn};

use crate::encoder::{PageWalker, QpskEncoder};
use crate::error::Result;
use crate::target::Pacing;
use crate::{AudioBlock, INTRO_BLANK_DURATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    LeadingSilence,
    IntroBlank,
    Data,
    Outro,
    Done,
}

/// Lazy sequence of audio blocks for a complete firmware image:
/// intro, paced data packets and outro, one block per `next()`
pub struct FirmwareBlocks<'e, 'd> {
    encoder: &'e mut QpskEncoder,
    image: &'d [u8],
    pacing: Pacing,
    stage: Stage,
    walker: Option<PageWalker<'d>>,
    // Offset of the next sector-paced block
    cursor: usize,
    page_walk_started: bool,
}

/// Encode `image` for a target with the given pacing.
///
/// Configuration errors are reported here, before any block is produced.
pub fn encode_firmware<'e, 'd>(
    encoder: &'e mut QpskEncoder,
    image: &'d [u8],
    pacing: &Pacing,
) -> Result<FirmwareBlocks<'e, 'd>> {
    pacing.validate(encoder.config())?;

    match pacing {
        Pacing::PagePaced {
            page_size,
            pause_short,
        } => {
            info!(
                "Encoding {} bytes with page_size {}, pause {}",
                image.len(),
                page_size,
                pause_short
            );
        }
        Pacing::SectorPaced {
            start_address,
            block_size,
            ..
        } => {
            info!(
                "Encoding with block_size {}, starting address {:#x}",
                block_size, start_address
            );
            for sector in pacing.unaligned_sectors(image.len()) {
                warn!(
                    "Sector at {:#x} does not start a block and will not get an erase pause",
                    sector
                );
            }
        }
    }

    Ok(FirmwareBlocks {
        encoder,
        image,
        pacing: pacing.clone(),
        stage: Stage::LeadingSilence,
        walker: None,
        cursor: 0,
        page_walk_started: false,
    })
}

impl<'e, 'd> FirmwareBlocks<'e, 'd> {
    fn next_segment(&mut self) -> Option<PageWalker<'d>> {
        let packet_size = self.encoder.packet_size();
        match &self.pacing {
            Pacing::PagePaced {
                page_size,
                pause_short,
            } => {
                if self.page_walk_started {
                    return None;
                }
                self.page_walk_started = true;
                Some(PageWalker::new(self.image, *page_size, packet_size, *pause_short))
            }
            Pacing::SectorPaced {
                start_address,
                block_size,
                ..
            } => {
                if self.cursor >= self.image.len() {
                    return None;
                }
                let image = self.image;
                let offset = self.cursor;
                let end = (offset + block_size).min(image.len());
                let address = *start_address as u64 + offset as u64;
                let pause = self.pacing.block_pause(address);
                info!("Block @ {:#x}, pause = {}", address, pause);

                self.cursor += block_size;
                Some(PageWalker::new(
                    &image[offset..end],
                    *block_size,
                    packet_size,
                    pause,
                ))
            }
        }
    }

    fn next_data_block(&mut self) -> Option<Result<AudioBlock>> {
        loop {
            if let Some(walker) = self.walker.as_mut() {
                if let Some(block) = walker.next_block(self.encoder) {
                    return Some(block);
                }
            }
            self.walker = Some(self.next_segment()?);
        }
    }

    fn advance(&mut self) -> Option<Result<AudioBlock>> {
        loop {
            match self.stage {
                Stage::LeadingSilence => {
                    self.stage = Stage::IntroBlank;
                    return Some(Ok(self.encoder.leading_silence()));
                }
                Stage::IntroBlank => {
                    self.stage = Stage::Data;
                    return Some(self.encoder.code_blank(INTRO_BLANK_DURATION));
                }
                Stage::Data => match self.next_data_block() {
                    Some(block) => return Some(block),
                    None => self.stage = Stage::Outro,
                },
                Stage::Outro => {
                    self.stage = Stage::Done;
                    let duration = self.pacing.outro_duration();
                    return Some(self.encoder.code_blank(duration));
                }
                Stage::Done => return None,
            }
        }
    }
}

impl Iterator for FirmwareBlocks<'_, '_> {
    type Item = Result<AudioBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.advance();
        if let Some(Err(_)) = &item {
            self.stage = Stage::Done;
        }
        item
    }
}
