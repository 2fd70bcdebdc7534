//! Priority-tagged chunk framing for a single duplex byte stream.
//!
//! The fragment framing in [`crate::protocol`] is priority-agnostic; the
//! engine expects the transport to convey each fragment's priority out of
//! band. When both priority streams share one byte pipe, each fragment is
//! wrapped in a 5-byte chunk header:
//!
//! ```text
//! ┌──────────┬───────────┐
//! │ Priority │ Length    │
//! │ 1 byte   │ 4 bytes   │
//! │          │ uint32 BE │
//! └──────────┴───────────┘
//! ```
//!
//! This framing never reaches the peer's defragmentation engine - the
//! receiver pump strips it and hands the inner bytes, tagged with their
//! priority, to the demuxer.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FragwireError, Result};
use crate::priority::Priority;

/// Chunk header size in bytes (fixed, exactly 5).
pub const CHUNK_HEADER_LEN: usize = 5;

/// Decoded chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Priority stream this chunk belongs to.
    pub priority: Priority,
    /// Chunk body length in bytes.
    pub length: u32,
}

impl ChunkHeader {
    /// Create a new chunk header.
    pub fn new(priority: Priority, length: u32) -> Self {
        Self { priority, length }
    }

    /// Encode the header to bytes.
    pub fn encode(&self) -> [u8; CHUNK_HEADER_LEN] {
        let mut buf = [0u8; CHUNK_HEADER_LEN];
        buf[0] = self.priority.index() as u8;
        buf[1..5].copy_from_slice(&self.length.to_be_bytes());
        buf
    }

    /// Decode a header from bytes.
    ///
    /// Returns `Ok(None)` when the buffer is too short and an error when
    /// the priority tag is unknown.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < CHUNK_HEADER_LEN {
            return Ok(None);
        }
        let priority = Priority::from_index(buf[0]).ok_or_else(|| {
            FragwireError::Protocol(format!("unknown priority tag {:#04x}", buf[0]))
        })?;
        let length = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        Ok(Some(Self { priority, length }))
    }
}

/// Build a complete chunk as a single contiguous buffer.
pub fn build_chunk(priority: Priority, body: &[u8]) -> Bytes {
    let header = ChunkHeader::new(priority, body.len() as u32);
    let mut buf = BytesMut::with_capacity(CHUNK_HEADER_LEN + body.len());
    buf.put_slice(&header.encode());
    buf.put_slice(body);
    buf.freeze()
}

/// Accumulates stream bytes and yields complete `(priority, body)` chunks.
///
/// Handles arbitrarily fragmented reads; partial data is buffered for the
/// next push.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    buffer: BytesMut,
}

impl ChunkBuffer {
    /// Create an empty chunk buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push data into the buffer and extract all complete chunks.
    ///
    /// # Errors
    ///
    /// Returns an error on an unknown priority tag; the stream is not
    /// recoverable past that point.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<(Priority, Bytes)>> {
        self.buffer.extend_from_slice(data);

        let mut chunks = Vec::new();
        while let Some(header) = ChunkHeader::decode(&self.buffer)? {
            let total = CHUNK_HEADER_LEN + header.length as usize;
            if self.buffer.len() < total {
                break;
            }
            let mut chunk = self.buffer.split_to(total);
            let body = chunk.split_off(CHUNK_HEADER_LEN).freeze();
            chunks.push((header.priority, body));
        }
        Ok(chunks)
    }

    /// Number of buffered bytes awaiting a complete chunk.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
