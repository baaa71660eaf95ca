//! Bounded base64 decoding
//!
//! The whole input is validated and the exact output length computed before
//! a single byte is written, so a payload that would not fit is rejected
//! without touching the destination.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base64Error {
    /// Byte outside the standard alphabet (or data after padding)
    InvalidByte(u8),
    /// Symbol count cannot come from a valid encoding
    InvalidLength,
    /// Decoded output would not fit the destination
    TooLarge { needed: usize, capacity: usize },
}

impl fmt::Display for Base64Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Base64Error::InvalidByte(b) => write!(f, "invalid base64 byte 0x{:02x}", b),
            Base64Error::InvalidLength => write!(f, "invalid base64 length"),
            Base64Error::TooLarge { needed, capacity } => {
                write!(f, "decoded size {} exceeds capacity {}", needed, capacity)
            }
        }
    }
}

fn sextet(b: u8) -> Option<u8> {
    match b {
        b'A'..=b'Z' => Some(b - b'A'),
        b'a'..=b'z' => Some(b - b'a' + 26),
        b'0'..=b'9' => Some(b - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Line breaks and JSON's `\/` escape are tolerated anywhere
#[inline]
fn is_skipped(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'\\'
}

/// Validate `input` and return the number of bytes it decodes to
pub fn decoded_len(input: &[u8]) -> Result<usize, Base64Error> {
    let mut symbols = 0usize;
    let mut padding = 0usize;

    for &b in input {
        if is_skipped(b) {
            continue;
        }
        if b == b'=' {
            padding += 1;
            if padding > 2 {
                return Err(Base64Error::InvalidLength);
            }
            continue;
        }
        if padding > 0 || sextet(b).is_none() {
            return Err(Base64Error::InvalidByte(b));
        }
        symbols += 1;
    }

    // Padding, when present, must complete the final quantum
    if padding > 0 && (symbols + padding) % 4 != 0 {
        return Err(Base64Error::InvalidLength);
    }

    let tail = match symbols % 4 {
        0 => 0,
        2 => 1,
        3 => 2,
        _ => return Err(Base64Error::InvalidLength),
    };

    Ok(symbols / 4 * 3 + tail)
}

/// Decode `input` into `out`, returning the number of bytes written
///
/// Fails without writing when the decoded size exceeds `out.len()`.
pub fn decode_into(input: &[u8], out: &mut [u8]) -> Result<usize, Base64Error> {
    let needed = decoded_len(input)?;
    if needed > out.len() {
        return Err(Base64Error::TooLarge {
            needed,
            capacity: out.len(),
        });
    }

    let mut acc: u32 = 0;
    let mut bits = 0u32;
    let mut written = 0usize;

    for value in input.iter().filter_map(|&b| sextet(b)) {
        acc = ((acc << 6) | value as u32) & 0x00FF_FFFF;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            if written < needed {
                out[written] = (acc >> bits) as u8;
                written += 1;
            }
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_len_quanta() {
        assert_eq!(decoded_len(b""), Ok(0));
        assert_eq!(decoded_len(b"TWFu"), Ok(3));
        assert_eq!(decoded_len(b"TWE="), Ok(2));
        assert_eq!(decoded_len(b"TQ=="), Ok(1));
        assert_eq!(decoded_len(b"TWE"), Ok(2));
    }

    #[test]
    fn test_decode_basic() {
        let mut out = [0u8; 8];
        let n = decode_into(b"TWFueQ==", &mut out).unwrap();
        assert_eq!(&out[..n], b"Many");
    }

    #[test]
    fn test_decode_skips_whitespace_and_json_escapes() {
        let mut out = [0u8; 8];
        let n = decode_into(b"TW\r\nFu\\/w==", &mut out).unwrap();
        assert_eq!(&out[..n], &[b'M', b'a', b'n', 0xFF]);
    }

    #[test]
    fn test_invalid_byte() {
        let mut out = [0u8; 8];
        assert_eq!(decode_into(b"TW*u", &mut out), Err(Base64Error::InvalidByte(b'*')));
    }

    #[test]
    fn test_data_after_padding_rejected() {
        assert_eq!(decoded_len(b"TQ==TWFu"), Err(Base64Error::InvalidByte(b'T')));
    }

    #[test]
    fn test_impossible_length_rejected() {
        assert_eq!(decoded_len(b"TWFuT"), Err(Base64Error::InvalidLength));
        assert_eq!(decoded_len(b"TWE=="), Err(Base64Error::InvalidLength));
        assert_eq!(decoded_len(b"T==="), Err(Base64Error::InvalidLength));
    }

    #[test]
    fn test_too_large_leaves_destination_untouched() {
        let mut out = [0xAAu8; 2];
        let result = decode_into(b"TWFueQ==", &mut out);
        assert_eq!(
            result,
            Err(Base64Error::TooLarge {
                needed: 4,
                capacity: 2
            })
        );
        assert_eq!(out, [0xAA, 0xAA]);
    }

    #[test]
    fn test_exact_fit() {
        let mut out = [0u8; 3];
        assert_eq!(decode_into(b"TWFu", &mut out), Ok(3));
        assert_eq!(&out, b"Man");
    }
}
