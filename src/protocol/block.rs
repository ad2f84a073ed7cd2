//! Response block validation and data-word encoding.
//!
//! A block is accepted only when every triplet passes its checksum. One
//! bad triplet voids the whole block: a single bit error can shift the
//! byte alignment of everything after it.

use heapless::Vec;

use super::checksum::{TRIPLET_LEN, WORD_LEN, checksum, verify};
use crate::error::{Error, Result};

/// Longest response any supported model returns (9 words).
pub const MAX_BLOCK_LEN: usize = 27;

/// Longest data payload written after a command (6 words).
pub const MAX_DATA_LEN: usize = 18;

/// A response whose every triplet has passed its checksum.
#[derive(Debug, Clone, Copy)]
pub struct ResponseBlock<'a> {
    bytes: &'a [u8],
}

impl<'a> ResponseBlock<'a> {
    /// Check every triplet of `bytes`.
    ///
    /// Fails with [`Error::Checksum`] carrying the offset of the first bad
    /// triplet, or of the dangling tail when the length is not a whole
    /// number of triplets.
    pub fn validate(bytes: &'a [u8]) -> Result<Self> {
        let tail = bytes.len() % TRIPLET_LEN;
        if tail != 0 {
            return Err(Error::Checksum {
                offset: bytes.len() - tail,
            });
        }

        for (index, triplet) in bytes.chunks_exact(TRIPLET_LEN).enumerate() {
            if !verify([triplet[0], triplet[1]], triplet[2]) {
                return Err(Error::Checksum {
                    offset: index * TRIPLET_LEN,
                });
            }
        }

        Ok(Self { bytes })
    }

    /// Total length in bytes, checksums included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The two data bytes of the triplet starting at `offset`.
    ///
    /// `None` if `offset` is not triplet-aligned or lies past the end.
    pub fn word(&self, offset: usize) -> Option<[u8; WORD_LEN]> {
        if offset % TRIPLET_LEN != 0 || offset + TRIPLET_LEN > self.bytes.len() {
            return None;
        }
        Some([self.bytes[offset], self.bytes[offset + 1]])
    }

    /// Iterate over the raw 16-bit words in order.
    pub fn words(self) -> impl Iterator<Item = u16> + 'a {
        self.bytes
            .chunks_exact(TRIPLET_LEN)
            .map(|t| u16::from_be_bytes([t[0], t[1]]))
    }
}

/// Encode `words` as checksummed triplets.
///
/// Returns `None` if the encoding does not fit in `N` bytes.
pub fn encode_words<const N: usize>(words: &[u16]) -> Option<Vec<u8, N>> {
    let mut out = Vec::new();
    for word in words {
        let bytes = word.to_be_bytes();
        out.extend_from_slice(&bytes).ok()?;
        out.push(checksum(bytes)).ok()?;
    }
    Some(out)
}
