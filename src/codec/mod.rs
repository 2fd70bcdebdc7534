//! Codec module - serialization/deserialization of object payloads.
//!
//! The engine itself moves opaque blobs; these codecs sit at its seams:
//! a producer serializes an object before handing it to the send queue,
//! and the delivered-object callback deserializes the reassembled blob.
//!
//! - [`RawCodec`] - pass-through for already-serialized bytes (zero-copy)
//! - [`MsgPackCodec`] - MessagePack for self-describing object messages
//!
//! Codecs are marker structs with static methods rather than trait
//! objects, so codec selection happens at compile time and zero-copy
//! paths stay monomorphic.
//!
//! # Example
//!
//! ```
//! use fragwire::codec::{MsgPackCodec, RawCodec};
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//!
//! let raw = RawCodec::serialize(b"pre-serialized");
//! assert_eq!(RawCodec::deserialize(&raw), b"pre-serialized");
//! ```

mod msgpack;
mod raw;

pub use msgpack::MsgPackCodec;
pub use raw::RawCodec;
