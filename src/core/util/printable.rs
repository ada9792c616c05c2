//! The 64-character printable alphabet used by isomorphism signatures.
//!
//! Values `0..64` map to `a–z`, `A–Z`, `0–9`, `+` and `-` in that order. Multi-character
//! values are written little-endian, six bits per character.
//!
//! # Examples
//!
//! ```rust
//! use simplicial::core::util::printable;
//!
//! let mut out = String::new();
//! printable::append_value(&mut out, 4_000, 2);
//! assert_eq!(out, "G+");
//! assert_eq!(printable::decode(b'G'), Some(32));
//! ```

use crate::core::perm::factorial;

/// The printable alphabet, indexed by value.
pub const ALPHABET: &[u8; 64] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+-";

/// The character encoding `value` (taken modulo 64).
#[inline]
#[must_use]
pub const fn encode(value: u64) -> char {
    ALPHABET[(value & 63) as usize] as char
}

/// The value of a printable character, or `None` for characters outside the alphabet.
#[inline]
#[must_use]
pub const fn decode(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64),
        b'A'..=b'Z' => Some((c - b'A') as u64 + 26),
        b'0'..=b'9' => Some((c - b'0') as u64 + 52),
        b'+' => Some(62),
        b'-' => Some(63),
        _ => None,
    }
}

/// Appends `value` using exactly `chars` characters.
pub fn append_value(out: &mut String, mut value: u64, chars: usize) {
    for _ in 0..chars {
        out.push(encode(value));
        value >>= 6;
    }
}

/// Number of base-64 digits needed to write `value` (at least one).
#[must_use]
pub const fn digits_needed(mut value: u64) -> usize {
    let mut digits = 1;
    value >>= 6;
    while value > 0 {
        digits += 1;
        value >>= 6;
    }
    digits
}

/// Characters needed to write the index of any permutation of `size` elements.
#[must_use]
pub const fn chars_per_perm(size: usize) -> usize {
    let total = factorial(size);
    let mut chars = 1;
    while chars < 10 && (1_u64 << (6 * chars)) < total {
        chars += 1;
    }
    chars
}
