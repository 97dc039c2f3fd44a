// ============================================================================
// INTEGRATION TESTS
// ============================================================================
// Full pipeline checks: packet framing through QPSK modulation, target
// pacing, phase continuity across calls and a coherent reference demodulator
// that recovers the transmitted bytes from the samples.
// ============================================================================

use std::f64::consts::PI;

use qpsk_bootloader_core::framing::{crc32, frame_len, PREAMBLE};
use qpsk_bootloader_core::{
    bytes_to_symbols, encode_firmware, AudioBlock, EncoderConfig, FrameEncoder, QpskEncoder,
    Scrambler, Target, TargetOverrides,
};
use rand::{Rng, SeedableRng};

const SAMPLE_RATE: f64 = 48000.0;
const CARRIER: f64 = 6000.0;
const SPS: usize = 8;

/// Coherent QPSK demodulation for the default configuration, where one
/// symbol spans exactly one carrier period. `start` is the absolute sample
/// index of `samples[0]`.
fn demodulate(samples: &[f32], start: u64) -> Vec<u8> {
    samples
        .chunks(SPS)
        .enumerate()
        .map(|(k, chunk)| {
            let mut i = 0.0;
            let mut q = 0.0;
            for (j, &s) in chunk.iter().enumerate() {
                let n = start + (k * SPS + j) as u64;
                let phase = 2.0 * PI * CARRIER * (n as f64 / SAMPLE_RATE);
                i += s as f64 * phase.sin();
                q += s as f64 * phase.cos();
            }
            let even = (i > 0.0) as u8;
            let odd = (q > 0.0) as u8;
            odd * 2 + even
        })
        .collect()
}

fn symbols_to_bytes(symbols: &[u8]) -> Vec<u8> {
    symbols
        .chunks(4)
        .map(|c| (c[0] << 6) | (c[1] << 4) | (c[2] << 2) | c[3])
        .collect()
}

fn default_encoder() -> QpskEncoder {
    QpskEncoder::new(EncoderConfig::default()).expect("Failed to create encoder")
}

#[test]
fn test_single_zero_packet_scenario() {
    let mut encoder = default_encoder();
    let samples = encoder.code_packet(&[0u8; 256]).expect("Failed to encode packet");

    assert_eq!(frame_len(256), 276);
    assert_eq!(samples.len(), 1104 * SPS);

    let frame = FrameEncoder::encode(&[0u8; 256], 256, None).unwrap();
    let symbols = bytes_to_symbols(&frame);
    assert_eq!(symbols.len(), 1104);
    assert_eq!(&symbols[..4], &[0, 0, 0, 0]);
}

#[test]
fn test_demodulated_packet_matches_frame() {
    let payload: Vec<u8> = (0..200).map(|i| (i * 37 % 251) as u8).collect();

    let mut encoder = default_encoder();
    let samples = encoder.code_packet(&payload).expect("Failed to encode packet");

    let bytes = symbols_to_bytes(&demodulate(&samples, 0));
    assert_eq!(bytes.len(), 276);
    assert_eq!(&bytes[..16], &PREAMBLE);
    assert_eq!(&bytes[16..216], &payload[..]);
    assert!(bytes[216..272].iter().all(|&b| b == 0xFF));

    let crc = u32::from_be_bytes([bytes[272], bytes[273], bytes[274], bytes[275]]);
    assert_eq!(crc, crc32(&bytes[16..272]));
}

#[test]
fn test_demodulation_after_pause_keeps_phase() {
    let mut encoder = default_encoder();
    let pause = encoder.code_blank(0.06).unwrap();
    let start = encoder.sample_index();
    assert_eq!(start, pause.len() as u64);

    let samples = encoder.code_packet(b"after pause").unwrap();
    let bytes = symbols_to_bytes(&demodulate(&samples, start));
    assert_eq!(&bytes[16..27], b"after pause");

    // The blank itself demodulates to zero symbols
    assert!(demodulate(&pause, 0).iter().all(|&s| s == 0));
}

#[test]
fn test_scrambled_stream_descrambles_in_order() {
    let config = EncoderConfig {
        packet_size: 64,
        scramble: true,
        ..EncoderConfig::default()
    };
    let mut encoder = QpskEncoder::new(config).unwrap();
    let image: Vec<u8> = (0..128).map(|i| i as u8).collect();

    let packets: Vec<AudioBlock> = encoder
        .code(&image, 128, 0.06)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    // Two packets and one pause
    assert_eq!(packets.len(), 3);

    let mut receiver = Scrambler::new(0);
    let mut start = 0u64;
    let mut recovered = Vec::new();
    for samples in &packets[..2] {
        let bytes = symbols_to_bytes(&demodulate(samples, start));
        start += samples.len() as u64;

        let body = &bytes[16..80];
        let crc = u32::from_be_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]);
        assert_eq!(crc, crc32(body), "CRC must cover the scrambled bytes");
        recovered.extend(receiver.scramble(body));
    }
    assert_eq!(recovered, image);
}

#[test]
fn test_phase_continuity_random_split() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);

    for _ in 0..20 {
        let len: usize = rng.gen_range(1..400);
        let symbols: Vec<u8> = (0..len).map(|_| rng.gen_range(0..4u8)).collect();
        let split = rng.gen_range(0..=len);

        let mut whole = default_encoder();
        let expected = whole.encode_symbols(&symbols);

        let mut parts = default_encoder();
        let mut actual = parts.encode_symbols(&symbols[..split]);
        actual.extend(parts.encode_symbols(&symbols[split..]));

        assert_eq!(actual, expected, "Split at {} of {} changed samples", split, len);
    }
}

#[test]
fn test_packets_match_single_modulation() {
    let mut per_packet = default_encoder();
    let mut samples = per_packet.code_packet(b"first").unwrap();
    samples.extend(per_packet.code_blank(0.06).unwrap());
    samples.extend(per_packet.code_packet(b"second").unwrap());

    let mut symbols = bytes_to_symbols(&FrameEncoder::encode(b"first", 256, None).unwrap());
    symbols.extend(vec![0u8; 360]);
    symbols.extend(bytes_to_symbols(&FrameEncoder::encode(b"second", 256, None).unwrap()));

    let mut single = default_encoder();
    assert_eq!(samples, single.encode_symbols(&symbols));
}

#[test]
fn test_full_stream_is_deterministic() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let image: Vec<u8> = (0..3000).map(|_| rng.gen()).collect();
    let pacing = Target::Stm32f3.pacing(&TargetOverrides::default()).unwrap();

    let config = EncoderConfig {
        scramble: true,
        ..EncoderConfig::default()
    };

    let mut first = QpskEncoder::new(config).unwrap();
    let a: Vec<AudioBlock> = encode_firmware(&mut first, &image, &pacing)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let mut second = QpskEncoder::new(config).unwrap();
    let b: Vec<AudioBlock> = encode_firmware(&mut second, &image, &pacing)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(first.sample_index(), second.sample_index());
}

#[test]
fn test_uniform_pacing_never_pauses_mid_page() {
    let mut encoder = default_encoder();
    let pacing = Target::Stm32f1.pacing(&TargetOverrides::default()).unwrap();
    let packet_len = frame_len(256) * 4 * SPS;
    let pause_len = encoder.blank_symbol_count(0.06).unwrap() * SPS;

    let blocks: Vec<usize> = encode_firmware(&mut encoder, &[0x42; 3 * 1024], &pacing)
        .unwrap()
        .map(|b| b.unwrap().len())
        .collect();

    // Skip intro (2 blocks) and outro (1 block)
    let data = &blocks[2..blocks.len() - 1];
    assert_eq!(data.len(), 3 * 5);
    for page in data.chunks(5) {
        assert_eq!(&page[..4], &[packet_len; 4]);
        assert_eq!(page[4], pause_len);
    }
}

#[test]
fn test_stream_total_length_matches_sample_counter() {
    let mut encoder = default_encoder();
    let pacing = Target::Stm32f1.pacing(&TargetOverrides::default()).unwrap();

    let total: usize = encode_firmware(&mut encoder, &[1, 2, 3], &pacing)
        .unwrap()
        .map(|b| b.unwrap().len())
        .sum();

    // Only the leading digital silence is outside the modulator's counter
    assert_eq!(total as u64, encoder.sample_index() + 48000);
}

#[test]
fn test_unknown_target_reported_before_encoding() {
    let result = "stm32g0".parse::<Target>();
    assert!(result.is_err());
    assert_eq!(
        result.unwrap_err().to_string(),
        "Unknown target: stm32g0"
    );
}

#[test]
fn test_sector_boundary_inside_block_gets_no_erase_pause() {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = EncoderConfig {
        packet_size: 3072,
        ..EncoderConfig::default()
    };
    let mut encoder = QpskEncoder::new(config).unwrap();
    // 12 KiB blocks from 0x0800C000: 0x0800C000, 0x0800F000, 0x08012000.
    // The 0x08010000 sector base falls inside the second block.
    let pacing = Target::Stm32f4
        .pacing(&TargetOverrides {
            start_sector: 3,
            block_size: 0x3000,
        })
        .unwrap();
    assert_eq!(pacing.unaligned_sectors(3 * 0x3000), vec![0x0801_0000]);

    let erase = encoder.blank_symbol_count(3.5).unwrap() * SPS;
    let settle = encoder.blank_symbol_count(0.2).unwrap() * SPS;
    let packet = frame_len(3072) * 4 * SPS;

    let blocks: Vec<usize> = encode_firmware(&mut encoder, &vec![0u8; 3 * 0x3000], &pacing)
        .unwrap()
        .map(|b| b.unwrap().len())
        .collect();

    let data = &blocks[2..blocks.len() - 1];
    let pauses: Vec<usize> = data.chunks(5).map(|block| block[4]).collect();
    assert_eq!(pauses, vec![erase, settle, settle]);
    assert!(data.chunks(5).all(|block| block[..4] == [packet; 4]));
}
