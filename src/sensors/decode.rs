//! Raw word → physical value conversion.
//!
//! Sentinel handling is ordinary control flow: a word equal to the
//! device's "value unavailable" pattern decodes to [`Value::Missing`],
//! never to zero and never to an error.

use super::Value;
use crate::protocol::{ResponseBlock, WORD_LEN};

/// "Value unavailable" pattern for unsigned channels.
pub const UNSIGNED_SENTINEL: u16 = 0xFFFF;

/// "Value unavailable" pattern for signed channels (RH, T, VOC/NOx index).
pub const SIGNED_SENTINEL: u16 = 0x7FFF;

/// How a channel's value is derived from its word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantics {
    /// The word itself, scaled.
    Raw,
    /// This word minus the word at `previous_offset`, scaled. Turns a
    /// cumulative count into the count of its own size bucket.
    BucketDifference { previous_offset: usize },
}

/// Where a channel lives in a response block and how to scale it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    /// Byte offset of the word's triplet within the block.
    pub offset: usize,
    /// Reinterpret the word as two's-complement `i16`.
    pub signed: bool,
    /// Divisor applied to the raw integer.
    pub scale: f32,
    pub semantics: Semantics,
}

impl Recipe {
    pub const fn unsigned(offset: usize, scale: f32) -> Self {
        Self {
            offset,
            signed: false,
            scale,
            semantics: Semantics::Raw,
        }
    }

    pub const fn signed(offset: usize, scale: f32) -> Self {
        Self {
            offset,
            signed: true,
            scale,
            semantics: Semantics::Raw,
        }
    }

    /// The same recipe, subtracting the word at `previous_offset`.
    pub const fn minus(self, previous_offset: usize) -> Self {
        Self {
            semantics: Semantics::BucketDifference { previous_offset },
            ..self
        }
    }

    /// The raw pattern this recipe treats as "missing".
    pub const fn sentinel(&self) -> u16 {
        if self.signed {
            SIGNED_SENTINEL
        } else {
            UNSIGNED_SENTINEL
        }
    }

    fn integer(&self, raw: u16) -> i32 {
        if self.signed {
            i32::from(raw as i16)
        } else {
            i32::from(raw)
        }
    }
}

/// Decode a single big-endian word with raw semantics.
pub fn decode(word: [u8; WORD_LEN], recipe: &Recipe) -> Value {
    let raw = u16::from_be_bytes(word);
    if raw == recipe.sentinel() {
        return Value::Missing;
    }
    Value::Measured(recipe.integer(raw) as f32 / recipe.scale)
}

/// Decode `word` as a bucket: `(word - previous) / scale`.
///
/// Missing if either word is the sentinel.
pub fn decode_difference(word: [u8; WORD_LEN], previous: [u8; WORD_LEN], recipe: &Recipe) -> Value {
    let raw = u16::from_be_bytes(word);
    let prev = u16::from_be_bytes(previous);
    let sentinel = recipe.sentinel();
    if raw == sentinel || prev == sentinel {
        return Value::Missing;
    }
    Value::Measured((recipe.integer(raw) - recipe.integer(prev)) as f32 / recipe.scale)
}

/// Apply `recipe` to an already validated block.
///
/// A recipe whose offset falls outside the block decodes to missing.
pub fn decode_block(block: &ResponseBlock<'_>, recipe: &Recipe) -> Value {
    let Some(word) = block.word(recipe.offset) else {
        return Value::Missing;
    };
    match recipe.semantics {
        Semantics::Raw => decode(word, recipe),
        Semantics::BucketDifference { previous_offset } => match block.word(previous_offset) {
            Some(previous) => decode_difference(word, previous, recipe),
            None => Value::Missing,
        },
    }
}
