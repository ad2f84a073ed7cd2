//! Fuzz target: `ResponseBlock::validate` + recipe decoding
//!
//! Feeds arbitrary bytes through block validation and, when a block
//! passes, decodes it with every recipe of every model. Asserts that
//! validation is all-or-nothing and that decoding never panics.
//!
//! cargo fuzz run fuzz_response_block

#![no_main]

use libfuzzer_sys::fuzz_target;
use sen6x::protocol::{ResponseBlock, TRIPLET_LEN, verify};
use sen6x::sensors::decode::decode_block;
use sen6x::{BucketMode, ModelId};

fuzz_target!(|data: &[u8]| {
    let Ok(block) = ResponseBlock::validate(data) else {
        return;
    };

    // A validated block has a whole number of good triplets.
    assert_eq!(data.len() % TRIPLET_LEN, 0);
    for triplet in data.chunks_exact(TRIPLET_LEN) {
        assert!(verify([triplet[0], triplet[1]], triplet[2]));
    }
    assert_eq!(block.words().count(), data.len() / TRIPLET_LEN);

    for model in ModelId::ALL {
        for mode in [BucketMode::Cumulative, BucketMode::PerBucket] {
            let d = model.descriptor(mode);
            let blocks = core::iter::once(d.main).chain(d.count);
            for spec in blocks {
                for (_, recipe) in spec.recipes {
                    let _ = decode_block(&block, recipe);
                }
            }
        }
    }
});
