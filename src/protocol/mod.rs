//! Protocol module - fragment wire format, framing, and fragmentation.
//!
//! This module implements the peer-visible binary format:
//! - 21-byte fragment header encoding/decoding
//! - Fragment struct with typed accessors
//! - Fragmentor splitting serialized objects into bounded fragments

mod fragment;
mod fragmentor;
mod wire_format;

pub use fragment::{build_fragment, BlobPreview, Fragment};
pub use fragmentor::Fragmentor;
pub use wire_format::{
    flags, FragmentHeader, ObjectIdSequence, DEFAULT_FRAGMENT_SIZE, HEADER_LEN, MAX_FRAGMENT_TOTAL,
};
