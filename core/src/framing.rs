use crate::error::{AudioModemError, Result};
use crate::scrambler::Scrambler;
use crate::{CRC_SIZE, PADDING_BYTE, PREAMBLE_SIZE};

/// Synchronization preamble prepended to every packet:
/// 8x 0x00 for the receiver PLL, 4x 0x99 for the edge detector, 4x 0xCC for frame sync
pub const PREAMBLE: [u8; PREAMBLE_SIZE] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x99, 0x99, 0x99, 0x99, //
    0xCC, 0xCC, 0xCC, 0xCC,
];

/// CRC-32 (ISO-HDLC, same as zlib) of a packet payload
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Total frame length on the wire for a given packet size
pub fn frame_len(packet_size: usize) -> usize {
    PREAMBLE_SIZE + packet_size + CRC_SIZE
}

pub struct FrameEncoder;

impl FrameEncoder {
    /// Build `preamble ++ payload ++ crc32_be` for one packet.
    ///
    /// The payload is right-padded with 0xFF to `packet_size`, scrambled if a
    /// scrambler is given, and the CRC is taken over the bytes actually sent.
    pub fn encode(
        payload: &[u8],
        packet_size: usize,
        scrambler: Option<&mut Scrambler>,
    ) -> Result<Vec<u8>> {
        if payload.len() > packet_size {
            return Err(AudioModemError::PayloadTooLarge {
                len: payload.len(),
                max: packet_size,
            });
        }

        let mut frame = Vec::with_capacity(frame_len(packet_size));
        frame.extend_from_slice(&PREAMBLE);
        frame.extend_from_slice(payload);
        frame.resize(PREAMBLE_SIZE + packet_size, PADDING_BYTE);

        let body = &mut frame[PREAMBLE_SIZE..];
        if let Some(scrambler) = scrambler {
            scrambler.apply(body);
        }

        let crc = crc32(body);
        frame.extend_from_slice(&crc.to_be_bytes());

        Ok(frame)
    }
}
