//! Raw codec - pass-through for binary data.
//!
//! Used when the higher protocol has already serialized its objects and
//! the engine should fragment the bytes untouched. Zero-copy where the
//! caller already holds a `Bytes`.

use bytes::Bytes;

/// Raw codec that passes bytes through without transformation.
pub struct RawCodec;

impl RawCodec {
    /// Serialize raw bytes (copies the slice into `Bytes`).
    ///
    /// For true zero-copy, use `serialize_bytes` with an existing `Bytes`.
    #[inline]
    pub fn serialize(data: &[u8]) -> Bytes {
        Bytes::copy_from_slice(data)
    }

    /// Serialize `Bytes` (zero-copy, returns the input).
    #[inline]
    pub fn serialize_bytes(data: Bytes) -> Bytes {
        data
    }

    /// Deserialize - returns the input slice unchanged.
    #[inline]
    pub fn deserialize(data: &[u8]) -> &[u8] {
        data
    }
}
