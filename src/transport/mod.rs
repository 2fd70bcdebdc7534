//! Transport adapters - chunk framing and async pumps.

pub mod chunk;
pub mod pump;

pub use chunk::{build_chunk, ChunkBuffer, ChunkHeader, CHUNK_HEADER_LEN};
pub use pump::{spawn_receiver_pump, spawn_sender_pump};
