//! Codebooks compiled into the binary.
//!
//! The source-of-truth lives in `target-loc-tags/data/*_CODES.json`.
//! Codes are MSB-first, row-major as seen from the front, 1 = white cell.

#![allow(clippy::unreadable_literal)]

use crate::{Dictionary, TagFamily};

include!(concat!(env!("OUT_DIR"), "/builtins.rs"));

/// Embedded codebook for `family`.
pub fn builtin_dictionary(family: TagFamily) -> Dictionary {
    let codes = match family {
        TagFamily::Tag16h5 => TAG16H5_CODES,
        TagFamily::Tag25h7 => TAG25H7_CODES,
        TagFamily::Tag25h9 => TAG25H9_CODES,
        TagFamily::Tag36h9 => TAG36H9_CODES,
        TagFamily::Tag36h11 => TAG36H11_CODES,
    };
    Dictionary::from_static(family, codes)
}
