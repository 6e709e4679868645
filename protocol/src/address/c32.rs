//! c32 and c32check encodings.
//!
//! c32 is Crockford's base-32 alphabet, encoded from the least significant
//! end so that the output sorts like the input. c32check prepends a version
//! character and appends a 4-byte double-SHA-256 checksum over
//! `version || payload`.

use crate::crypto::hash::double_sha256;

use super::AddressError;

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Maps an ASCII byte to its 5-bit c32 value. Lowercase letters and the
/// Crockford aliases (`O` for 0, `I`/`L` for 1) are accepted on input.
fn c32_digit(c: u8) -> Option<u8> {
    let c = c.to_ascii_uppercase();
    let c = match c {
        b'O' => b'0',
        b'I' | b'L' => b'1',
        other => other,
    };
    C32_ALPHABET.iter().position(|&a| a == c).map(|p| p as u8)
}

/// Encodes bytes as a c32 string. Leading zero bytes become leading `0`s.
pub fn c32_encode(input: &[u8]) -> String {
    let mut result: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for &byte in input.iter().rev() {
        carry |= (byte as u16) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            result.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        result.push(C32_ALPHABET[(carry & 0x1f) as usize]);
    }

    // `result` is little-endian here: strip high-order zero digits, then
    // restore one zero digit per leading zero byte of the input.
    while result.last() == Some(&C32_ALPHABET[0]) {
        result.pop();
    }
    for _ in input.iter().take_while(|&&b| b == 0) {
        result.push(C32_ALPHABET[0]);
    }

    result.reverse();
    // Alphabet is pure ASCII.
    result.into_iter().map(char::from).collect()
}

/// Decodes a c32 string. Inverse of [`c32_encode`].
pub fn c32_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    if !input.is_ascii() {
        return Err(AddressError::InvalidCharacter);
    }

    let digits = input
        .bytes()
        .map(c32_digit)
        .collect::<Option<Vec<u8>>>()
        .ok_or(AddressError::InvalidCharacter)?;

    let mut result: Vec<u8> = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for &digit in digits.iter().rev() {
        carry |= (digit as u16) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            result.push((carry & 0xff) as u8);
            carry >>= 8;
            carry_bits -= 8;
        }
    }
    if carry_bits > 0 {
        result.push(carry as u8);
    }

    while result.last() == Some(&0) {
        result.pop();
    }
    for _ in digits.iter().take_while(|&&d| d == 0) {
        result.push(0);
    }

    result.reverse();
    Ok(result)
}

/// `c32(version) || c32(payload || checksum)`.
pub fn c32check_encode(version: u8, payload: &[u8]) -> Result<String, AddressError> {
    if version >= 32 {
        return Err(AddressError::InvalidVersion(version));
    }

    let mut check_data = Vec::with_capacity(payload.len() + 1);
    check_data.push(version);
    check_data.extend_from_slice(payload);
    let checksum = double_sha256(&check_data);

    let mut encoding_data = payload.to_vec();
    encoding_data.extend_from_slice(&checksum[..4]);

    let mut out = String::with_capacity(encoding_data.len() * 8 / 5 + 2);
    out.push(C32_ALPHABET[version as usize] as char);
    out.push_str(&c32_encode(&encoding_data));
    Ok(out)
}

/// Returns `(version, payload)` after verifying the checksum.
pub fn c32check_decode(input: &str) -> Result<(u8, Vec<u8>), AddressError> {
    if input.len() < 2 || !input.is_ascii() {
        return Err(AddressError::InvalidLength(input.len()));
    }

    let (version_char, data) = input.split_at(1);
    let version = c32_digit(version_char.as_bytes()[0]).ok_or(AddressError::InvalidCharacter)?;
    let decoded = c32_decode(data)?;
    if decoded.len() < 4 {
        return Err(AddressError::InvalidLength(decoded.len()));
    }

    let (payload, checksum) = decoded.split_at(decoded.len() - 4);
    let mut check_data = Vec::with_capacity(payload.len() + 1);
    check_data.push(version);
    check_data.extend_from_slice(payload);
    if double_sha256(&check_data)[..4] != *checksum {
        return Err(AddressError::BadChecksum);
    }

    Ok((version, payload.to_vec()))
}
