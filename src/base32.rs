//! RFC 4648 base32, as used for secrets in `otpauth://` URLs.
//!
//! Decoding is lenient in the same way authenticator apps are: input is
//! case-insensitive, trailing `=` padding is optional and bits that do not
//! fill a whole byte are dropped.

use crate::OtpError;

const RFC4648_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const PADDING: char = '=';

/// Encodes `input` into base32, padding the output with `=` up to a multiple
/// of 8 characters when `padding` is set.
pub fn encode(input: &[u8], padding: bool) -> String {
    let mut output = String::with_capacity((input.len() * 8).div_ceil(5) + 6);

    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for byte in input {
        buffer = (buffer << 8) | u32::from(*byte);
        bits += 8;

        while bits >= 5 {
            let index = (buffer >> (bits - 5)) & 0x1f;
            output.push(RFC4648_ALPHABET[index as usize] as char);
            bits -= 5;
        }

        // Only the low `bits` bits are still pending
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        let index = (buffer << (5 - bits)) & 0x1f;
        output.push(RFC4648_ALPHABET[index as usize] as char);
    }

    if padding {
        while output.len() % 8 != 0 {
            output.push(PADDING);
        }
    }

    output
}

/// Decodes base32 `input` into bytes.
///
/// Fails with [`OtpError::InvalidCharacter`] on the first character outside
/// the alphabet.
pub fn decode(input: &str) -> Result<Vec<u8>, OtpError> {
    let cleaned = input.trim_end_matches(PADDING);
    let mut output = Vec::with_capacity(cleaned.len() * 5 / 8);

    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for c in cleaned.chars() {
        buffer = (buffer << 5) | read_char(c)?;
        bits += 5;

        if bits >= 8 {
            output.push((buffer >> (bits - 8)) as u8);
            bits -= 8;
            buffer &= (1 << bits) - 1;
        }
    }

    Ok(output)
}

fn read_char(c: char) -> Result<u32, OtpError> {
    let upper = c.to_ascii_uppercase();

    match upper {
        'A'..='Z' => Ok(upper as u32 - 'A' as u32),
        '2'..='7' => Ok(upper as u32 - '2' as u32 + 26),
        _ => Err(OtpError::InvalidCharacter(c)),
    }
}
