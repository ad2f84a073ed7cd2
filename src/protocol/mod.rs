//! Wire protocol shared by every supported model.
//!
//! ```text
//! command:   ┌──────────────┐
//!            │ code (2B BE) │
//!            └──────────────┘
//! with data: ┌──────────────┬─────────────┬─────┬─────────────┬─────┐
//!            │ code (2B BE) │ word 0 (BE) │ CRC │ word 1 (BE) │ CRC │ ...
//!            └──────────────┴─────────────┴─────┴─────────────┴─────┘
//! response:  ┌─────────────┬─────┬─────────────┬─────┐
//!            │ word 0 (BE) │ CRC │ word 1 (BE) │ CRC │ ...
//!            └─────────────┴─────┴─────────────┴─────┘
//! ```
//!
//! Every data word travels as a 3-byte triplet; see [`checksum`].

pub mod block;
pub mod checksum;

pub use block::{ResponseBlock, encode_words};
pub use checksum::{TRIPLET_LEN, WORD_LEN, checksum, verify};
