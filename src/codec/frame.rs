//! 80-bit LTC frame layout (SMPTE 12M).
//!
//! Bits are transmitted in index order 0..80 and held LSB-first in a `u128`:
//!
//! ```text
//!  0-3  frame units     4-7  user 1      8-9  frame tens   10 drop   11 colour
//! 12-15 user 2         16-19 sec units  20-23 user 3     24-26 sec tens  27 *
//! 28-31 user 4         32-35 min units  36-39 user 5     40-42 min tens  43 BGF0
//! 44-47 user 6         48-51 hour units 52-55 user 7     56-57 hour tens 58 BGF1 59 *
//! 60-63 user 8         64-79 sync word 0011 1111 1111 1101
//! ```
//!
//! `*` is the biphase polarity correction bit: 27 at 24/30 fps, 59 at 25 fps.

use crate::timecode::Timecode;

/// Bits per frame.
pub const FRAME_BITS: usize = 80;

/// Sync word as it appears in bits 64..80 read as a little-endian field.
pub const SYNC_WORD: u16 = 0xBFFC;

const SYNC_SHIFT: u32 = 64;

/// User-bit group start positions, group 1 first.
const USER_GROUPS: [u32; 8] = [4, 12, 20, 28, 36, 44, 52, 60];

const DROP_FRAME_BIT: u32 = 10;

/// A frame's data portion (everything except the sync word).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameFields {
    pub timecode: Timecode,
    pub user_bits: u32,
    pub drop_frame: bool,
}

#[inline]
fn put(word: &mut u128, shift: u32, width: u32, value: u32) {
    let mask = (1u128 << width) - 1;
    *word |= (u128::from(value) & mask) << shift;
}

#[inline]
fn get(word: u128, shift: u32, width: u32) -> u8 {
    ((word >> shift) & ((1u128 << width) - 1)) as u8
}

/// Position of the polarity correction bit for a frame rate.
#[inline]
pub const fn polarity_bit(fps: u32) -> u32 {
    if fps == 25 {
        59
    } else {
        27
    }
}

/// Assemble a complete 80-bit frame.
pub fn pack_frame(fields: &FrameFields, fps: u32) -> u128 {
    let tc = &fields.timecode;
    let mut word = 0u128;

    put(&mut word, 0, 4, u32::from(tc.frames % 10));
    put(&mut word, 8, 2, u32::from(tc.frames / 10));
    put(&mut word, 16, 4, u32::from(tc.seconds % 10));
    put(&mut word, 24, 3, u32::from(tc.seconds / 10));
    put(&mut word, 32, 4, u32::from(tc.minutes % 10));
    put(&mut word, 40, 3, u32::from(tc.minutes / 10));
    put(&mut word, 48, 4, u32::from(tc.hours % 10));
    put(&mut word, 56, 2, u32::from(tc.hours / 10));
    put(&mut word, DROP_FRAME_BIT, 1, u32::from(fields.drop_frame));

    for (i, &shift) in USER_GROUPS.iter().enumerate() {
        put(&mut word, shift, 4, fields.user_bits >> (i * 4));
    }

    put(&mut word, SYNC_SHIFT, 16, u32::from(SYNC_WORD));

    // Even count of ones: every frame then starts on the same level.
    if word.count_ones() % 2 == 1 {
        word |= 1u128 << polarity_bit(fps);
    }
    word
}

/// True if bits 64..80 hold the sync word.
#[inline]
pub fn has_sync(word: u128) -> bool {
    ((word >> SYNC_SHIFT) as u16) == SYNC_WORD
}

/// Decode the data portion of a received frame.
///
/// Returns `None` for BCD digits that cannot occur in a valid timecode.
pub fn unpack_frame(word: u128) -> Option<FrameFields> {
    let digit = |shift: u32, width: u32| -> Option<u8> {
        let v = get(word, shift, width);
        (v <= 9).then_some(v)
    };

    let timecode = Timecode {
        frames: digit(8, 2)? * 10 + digit(0, 4)?,
        seconds: digit(24, 3)? * 10 + digit(16, 4)?,
        minutes: digit(40, 3)? * 10 + digit(32, 4)?,
        hours: digit(56, 2)? * 10 + digit(48, 4)?,
    };
    if timecode.hours > 23 || timecode.minutes > 59 || timecode.seconds > 59 || timecode.frames > 39 {
        return None;
    }

    let mut user_bits = 0u32;
    for (i, &shift) in USER_GROUPS.iter().enumerate() {
        user_bits |= u32::from(get(word, shift, 4)) << (i * 4);
    }

    Some(FrameFields {
        timecode,
        user_bits,
        drop_frame: get(word, DROP_FRAME_BIT, 1) == 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(h: u8, m: u8, s: u8, f: u8) -> FrameFields {
        FrameFields {
            timecode: Timecode { hours: h, minutes: m, seconds: s, frames: f },
            user_bits: 0,
            drop_frame: false,
        }
    }

    #[test]
    fn test_sync_word_position() {
        let word = pack_frame(&fields(0, 0, 0, 0), 25);
        assert!(has_sync(word));
        // 0011 1111 1111 1101 in transmission order
        let expected = [0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1];
        for (i, &bit) in expected.iter().enumerate() {
            assert_eq!(((word >> (64 + i)) & 1) as u8, bit, "sync bit {}", i);
        }
    }

    #[test]
    fn test_even_parity_all_rates() {
        for fps in [24, 25, 30] {
            for f in 0..fps as u8 {
                let word = pack_frame(&fields(12, 34, 56, f), fps);
                assert_eq!(word.count_ones() % 2, 0);
            }
        }
    }

    #[test]
    fn test_bcd_layout() {
        let word = pack_frame(&fields(23, 59, 48, 17), 30);
        assert_eq!(get(word, 0, 4), 7);
        assert_eq!(get(word, 8, 2), 1);
        assert_eq!(get(word, 16, 4), 8);
        assert_eq!(get(word, 24, 3), 4);
        assert_eq!(get(word, 48, 4), 3);
        assert_eq!(get(word, 56, 2), 2);
    }

    #[test]
    fn test_user_bits_and_flags_survive() {
        let f = FrameFields {
            timecode: Timecode { hours: 1, minutes: 2, seconds: 3, frames: 4 },
            user_bits: 0xDEAD_BEEF,
            drop_frame: true,
        };
        let back = unpack_frame(pack_frame(&f, 30)).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn test_invalid_bcd_rejected() {
        let mut word = pack_frame(&fields(0, 0, 0, 0), 25);
        word |= 0xF; // frame units = 15
        assert!(unpack_frame(word).is_none());
    }
}
