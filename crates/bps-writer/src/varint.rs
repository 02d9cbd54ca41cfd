//! BPS variable-length integers
//!
//! Numbers are stored little-endian in 7-bit groups. Unlike LEB128 the high
//! bit marks the *last* byte, and every continuation subtracts one before
//! shifting so each value has exactly one encoding:
//!
//! ```text
//! 0x00        -> 80
//! 0x7f        -> ff
//! 0x80        -> 00 80
//! 0x407f      -> 7f ff
//! ```
//!
//! Signed values fold the sign into bit 0 of the magnitude before encoding:
//! `(|v| << 1) | (v < 0)`.

use crate::error::{BpsError, BpsResult};

/// Append the unsigned encoding of `value` to `out`
pub fn encode_unsigned(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let low = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(0x80 | low);
            break;
        }
        out.push(low);
        value -= 1;
    }
}

/// Append the signed encoding of `value` to `out`
pub fn encode_signed(value: i64, out: &mut Vec<u8>) {
    let sign = u64::from(value < 0);
    encode_unsigned((value.unsigned_abs() << 1) | sign, out);
}

/// Unsigned encoding of `value` as a fresh buffer
pub fn unsigned_bytes(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    encode_unsigned(value, &mut out);
    out
}

/// Read one unsigned value from the front of `input`, advancing it
pub fn decode_unsigned(input: &mut &[u8]) -> BpsResult<u64> {
    let mut value: u64 = 0;
    let mut shift: u64 = 1;
    let mut consumed = 0usize;

    loop {
        let Some((&byte, rest)) = input.split_first() else {
            return Err(BpsError::truncated(consumed + 1, consumed));
        };
        *input = rest;
        consumed += 1;

        let group = u64::from(byte & 0x7f)
            .checked_mul(shift)
            .ok_or(BpsError::VarintOverflow)?;
        value = value.checked_add(group).ok_or(BpsError::VarintOverflow)?;
        if byte & 0x80 != 0 {
            return Ok(value);
        }

        shift = shift.checked_mul(0x80).ok_or(BpsError::VarintOverflow)?;
        value = value.checked_add(shift).ok_or(BpsError::VarintOverflow)?;
    }
}

/// Read one signed value from the front of `input`, advancing it
pub fn decode_signed(input: &mut &[u8]) -> BpsResult<i64> {
    let raw = decode_unsigned(input)?;
    let magnitude = i64::try_from(raw >> 1).map_err(|_| BpsError::VarintOverflow)?;
    Ok(if raw & 1 == 1 { -magnitude } else { magnitude })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_known_encodings() {
        assert_eq!(unsigned_bytes(0), vec![0x80]);
        assert_eq!(unsigned_bytes(1), vec![0x81]);
        assert_eq!(unsigned_bytes(0x7f), vec![0xff]);
        assert_eq!(unsigned_bytes(0x80), vec![0x00, 0x80]);
        assert_eq!(unsigned_bytes(0x81), vec![0x01, 0x80]);
        assert_eq!(unsigned_bytes(0x407f), vec![0x7f, 0xff]);
        assert_eq!(unsigned_bytes(0x4080), vec![0x00, 0x00, 0x80]);
    }

    #[test]
    fn test_signed_known_encodings() {
        let mut out = Vec::new();
        encode_signed(0, &mut out);
        assert_eq!(out, vec![0x80]);

        out.clear();
        encode_signed(1, &mut out);
        assert_eq!(out, vec![0x82]);

        out.clear();
        encode_signed(-1, &mut out);
        assert_eq!(out, vec![0x83]);

        out.clear();
        encode_signed(-64, &mut out);
        // |-64| << 1 | 1 == 129
        assert_eq!(out, unsigned_bytes(129));
    }

    #[test]
    fn test_decode_advances_input() {
        let mut data = Vec::new();
        encode_unsigned(300, &mut data);
        encode_signed(-7, &mut data);
        data.push(0xaa);

        let mut input = data.as_slice();
        assert_eq!(decode_unsigned(&mut input).unwrap(), 300);
        assert_eq!(decode_signed(&mut input).unwrap(), -7);
        assert_eq!(input, &[0xaa]);
    }

    #[test]
    fn test_decode_truncated() {
        // Continuation byte with nothing after it
        let mut input: &[u8] = &[0x01];
        assert!(matches!(
            decode_unsigned(&mut input),
            Err(BpsError::Truncated { .. })
        ));

        let mut empty: &[u8] = &[];
        assert!(matches!(
            decode_unsigned(&mut empty),
            Err(BpsError::Truncated {
                needed: 1,
                available: 0
            })
        ));
    }

    #[test]
    fn test_decode_overflow() {
        let mut input: &[u8] = &[0x7f; 12];
        assert!(matches!(
            decode_unsigned(&mut input),
            Err(BpsError::VarintOverflow)
        ));
    }

    #[test]
    fn test_u64_extremes() {
        for value in [u64::from(u32::MAX), u64::MAX - 1, u64::MAX] {
            let bytes = unsigned_bytes(value);
            let mut input = bytes.as_slice();
            assert_eq!(decode_unsigned(&mut input).unwrap(), value);
            assert!(input.is_empty());
        }
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every u32 decodes back to itself and consumes its whole encoding
            #[test]
            fn unsigned_round_trip(value in any::<u32>()) {
                let bytes = unsigned_bytes(u64::from(value));
                let mut input = bytes.as_slice();
                prop_assert_eq!(decode_unsigned(&mut input).unwrap(), u64::from(value));
                prop_assert!(input.is_empty());
            }

            /// Every i32 decodes back to itself
            #[test]
            fn signed_round_trip(value in any::<i32>()) {
                let mut bytes = Vec::new();
                encode_signed(i64::from(value), &mut bytes);
                let mut input = bytes.as_slice();
                prop_assert_eq!(decode_signed(&mut input).unwrap(), i64::from(value));
                prop_assert!(input.is_empty());
            }

            /// Only the final byte of an encoding has its high bit set
            #[test]
            fn terminal_bit_only_on_last_byte(value in any::<u64>()) {
                let bytes = unsigned_bytes(value);
                let (last, rest) = bytes.split_last().unwrap();
                prop_assert!(last & 0x80 != 0);
                prop_assert!(rest.iter().all(|b| b & 0x80 == 0));
            }
        }
    }
}
