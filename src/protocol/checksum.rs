//! Sensirion word checksum.
//!
//! CRC-8 with polynomial 0x31, initial value 0xFF, no reflection and no
//! final XOR (catalogued as CRC-8/NRSC-5), computed over the two data bytes
//! of every word on the wire.

use crc::{CRC_8_NRSC_5, Crc};

const SENSIRION_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// Data bytes per word.
pub const WORD_LEN: usize = 2;

/// Data bytes plus the trailing checksum byte.
pub const TRIPLET_LEN: usize = 3;

/// Checksum of one big-endian data word.
pub fn checksum(word: [u8; WORD_LEN]) -> u8 {
    SENSIRION_CRC.checksum(&word)
}

/// `true` when `crc` matches the checksum of `word`.
pub fn verify(word: [u8; WORD_LEN], crc: u8) -> bool {
    checksum(word) == crc
}
