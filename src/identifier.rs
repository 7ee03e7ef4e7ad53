// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Slot identifiers.
//!
//! A slot identifier is a `u64` packed from a short string so that it can be
//! used as a const generic argument:
//!
//! * the low 4 bits hold the encoded length (0..=12)
//! * byte `i` of the string occupies bits `4 + 5 * i .. 9 + 5 * i`
//!
//! Every byte maps to a 5-bit code from a 32 symbol alphabet. Letters are case
//! folded, five punctuation symbols have their own code and everything else
//! shares the code of `_`. Only the first [`MAX_ID_LEN`] bytes are encoded.
//!
//! ```
//! use the_conduit::identifier::{decode, id};
//!
//! assert_eq!(id("value"), id("VALUE"));
//! assert_eq!(decode(id("abc")), "ABC");
//! assert_eq!(id(""), 0);
//! ```

/// Number of bytes that contribute to an identifier.
pub const MAX_ID_LEN: usize = 12;

const LENGTH_BITS: u32 = 4;
const CODE_BITS: u32 = 5;
const CODE_MASK: u64 = 0x1F;
const LENGTH_MASK: u64 = 0xF;

/// Code shared by `_` and every unsupported byte.
pub const FALLBACK_CODE: u64 = 26;

const ALPHABET: [u8; 32] = *b"ABCDEFGHIJKLMNOPQRSTUVWXYZ_-.:/ ";

/// Maps a single byte to its 5-bit code.
pub const fn encode_byte(byte: u8) -> u64 {
    match byte {
        b'A'..=b'Z' => (byte - b'A') as u64,
        b'a'..=b'z' => (byte - b'a') as u64,
        b'-' => 27,
        b'.' => 28,
        b':' => 29,
        b'/' => 30,
        b' ' => 31,
        _ => FALLBACK_CODE,
    }
}

/// Packs a string into a slot identifier.
///
/// Usable in const context, which is how slot ids are written in task
/// signatures: `Slot<u32, { id("count") }>`.
pub const fn id(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let len = if bytes.len() > MAX_ID_LEN {
        MAX_ID_LEN
    } else {
        bytes.len()
    };

    let mut packed = len as u64;
    let mut i = 0;
    while i < len {
        packed |= encode_byte(bytes[i]) << (LENGTH_BITS + CODE_BITS * i as u32);
        i += 1;
    }
    packed
}

/// Reconstructs the folded string an identifier was packed from.
///
/// Round-trips for upper case strings of at most [`MAX_ID_LEN`] bytes drawn
/// from the supported alphabet.
pub fn decode(packed: u64) -> String {
    let len = ((packed & LENGTH_MASK) as usize).min(MAX_ID_LEN);
    (0..len)
        .map(|i| {
            let code = (packed >> (LENGTH_BITS + CODE_BITS * i as u32)) & CODE_MASK;
            ALPHABET[code as usize] as char
        })
        .collect()
}

/// Human readable form of an identifier.
///
/// Ids that round-trip through [`decode`] render as their name, anything else
/// (`Slot<T, 0>`, lengths above 12) renders as the number.
pub fn describe(packed: u64) -> String {
    let name = decode(packed);
    if !name.is_empty() && id(&name) == packed {
        name
    } else {
        format!("#{}", packed)
    }
}
