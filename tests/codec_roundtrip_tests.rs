//! Encode → quantize → decode round-trip tests

mod common;

use common::{decode_duties, encoded_adc_codes, tc};
use ltc_node::codec::{frame_len, CodecFactory, DecodeEngine, EncodeEngine, LtcCodec};
use ltc_node::sample::{duty_to_adc, Sample};
use ltc_node::Timecode;

fn expected_sequence(start: Timecode, fps: u32, count: usize) -> Vec<Timecode> {
    std::iter::successors(Some(start), |tc| Some(tc.next(fps)))
        .take(count)
        .collect()
}

/// Decode ADC codes directly (the same quantization the decoder task uses).
fn decode_codes<S: Sample>(codes: &[u16], rate: u32, fps: u32) -> Vec<Timecode> {
    let mut dec = LtcCodec.create_decoder(rate, fps, 64).unwrap();
    let samples: Vec<S> = codes.iter().map(|&c| S::from_adc(c)).collect();
    dec.write(&samples);
    std::iter::from_fn(|| dec.read()).map(|f| f.timecode).collect()
}

#[test]
fn test_buffer_len_matches_encoded_len() {
    for fps in [24, 25, 30] {
        let mut enc = LtcCodec.create_encoder(48_000, fps).unwrap();
        let len = frame_len(48_000, fps);
        assert!(len > 0);
        assert_eq!(enc.frame_len(), len);

        let mut buf = vec![0i8; len];
        assert_eq!(enc.encode_frame(&mut buf), len, "fps {}", fps);
    }
}

#[test]
fn test_round_trip_i8_all_frame_rates() {
    for fps in [24, 25, 30] {
        let start = tc(23, 59, 59, (fps - 3) as u8);
        let codes = encoded_adc_codes::<i8>(start, fps, 7);
        let decoded = decode_codes::<i8>(&codes, 48_000, fps);

        // The last frame needs the next frame's first edge to complete.
        assert_eq!(decoded, expected_sequence(start, fps, 6), "fps {}", fps);
        assert_eq!(decoded[3], Timecode::ZERO, "rollover at fps {}", fps);
    }
}

#[test]
fn test_round_trip_i16() {
    let start = tc(12, 34, 56, 7);
    let codes = encoded_adc_codes::<i16>(start, 25, 5);
    let decoded = decode_codes::<i16>(&codes, 48_000, 25);
    assert_eq!(decoded, expected_sequence(start, 25, 4));
}

#[test]
fn test_round_trip_through_duty_stream() {
    let start = tc(1, 2, 3, 4);
    let mut enc = LtcCodec.create_encoder(48_000, 25).unwrap();
    enc.set_timecode(start);
    let mut buf = vec![0i8; enc.frame_len()];
    let mut duties = Vec::new();
    for _ in 0..4 {
        let n = enc.encode_frame(&mut buf);
        duties.extend(buf[..n].iter().map(|s| s.to_duty()));
        enc.advance();
    }
    assert_eq!(decode_duties::<i8>(&duties, 25), expected_sequence(start, 25, 3));
}

#[test]
fn test_round_trip_at_44k1() {
    let start = tc(0, 0, 1, 0);
    let mut enc = LtcCodec.create_encoder(44_100, 30).unwrap();
    enc.set_timecode(start);
    let mut buf = vec![0i8; enc.frame_len()];
    let mut codes = Vec::new();
    for _ in 0..4 {
        let n = enc.encode_frame(&mut buf);
        codes.extend(buf[..n].iter().map(|s| duty_to_adc(s.to_duty())));
        enc.advance();
    }
    assert_eq!(decode_codes::<i8>(&codes, 44_100, 30), expected_sequence(start, 30, 3));
}

#[test]
fn test_decoder_locks_mid_stream() {
    let start = tc(0, 0, 0, 0);
    let codes = encoded_adc_codes::<i8>(start, 25, 6);
    // Start listening a third of the way into the first frame.
    let decoded = decode_codes::<i8>(&codes[640..], 48_000, 25);
    assert_eq!(decoded, expected_sequence(tc(0, 0, 0, 1), 25, 4));
}

#[test]
fn test_user_bits_survive() {
    let mut enc = LtcCodec.create_encoder(48_000, 25).unwrap();
    enc.set_user_bits(0x1234_5678);
    let mut dec = LtcCodec.create_decoder(48_000, 25, 8).unwrap();
    let mut buf = vec![0i16; enc.frame_len()];
    for _ in 0..2 {
        enc.encode_frame(&mut buf);
        dec.write(&buf);
        enc.advance();
    }
    let frame = dec.read().unwrap();
    assert_eq!(frame.user_bits, 0x1234_5678);
    assert!(!frame.drop_frame);
}
