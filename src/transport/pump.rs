//! Async bridges between the synchronous engine and a byte transport.
//!
//! The engine is callback-driven and transport-agnostic; these pumps adapt
//! it to a tokio `AsyncRead`/`AsyncWrite` pair:
//!
//! ```text
//! SendQueue ─ read_or_register ─► sender pump ─► AsyncWrite
//! AsyncRead ─► receiver pump ─ process_raw_data ─► ReceiveDemux ─► objects
//! ```
//!
//! The sender pump pulls one fragment at a time; when the queue is empty
//! it parks a callback and suspends on a capacity-1 handoff channel until
//! the callback fires with the next fragment. Each fragment travels inside
//! a priority-tagged chunk (see [`super::chunk`]).

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{FragwireError, Result};
use crate::priority::Priority;
use crate::receive::ReceiveDemux;
use crate::send_queue::{SendQueue, SendReadyCallback};
use crate::transport::chunk::{ChunkBuffer, ChunkHeader};

/// Read buffer size for the receiver pump.
const READ_BUF_LEN: usize = 8 * 1024;

/// Spawn a task draining `queue` into `writer`, one chunk per fragment.
///
/// Runs until the task is aborted or the writer fails; an idle queue
/// parks the task without polling.
pub fn spawn_sender_pump<W>(queue: Arc<SendQueue>, mut writer: W) -> JoinHandle<Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let (bytes, priority) = next_fragment(&queue).await;
            let header = ChunkHeader::new(priority, bytes.len() as u32);
            writer.write_all(&header.encode()).await?;
            writer.write_all(&bytes).await?;
            writer.flush().await?;
        }
    })
}

/// Pull the next fragment, suspending while the queue is empty.
async fn next_fragment(queue: &SendQueue) -> (Bytes, Priority) {
    loop {
        let (tx, mut rx) = mpsc::channel(1);
        let callback: SendReadyCallback = Box::new(move |bytes, priority| {
            // One-shot handoff; capacity 1 guarantees the send succeeds.
            let _ = tx.try_send((bytes, priority));
        });
        if let Some(hit) = queue.read_or_register(callback) {
            return hit;
        }
        if let Some(hit) = rx.recv().await {
            return hit;
        }
        // The parked callback was dropped without firing; re-register.
    }
}

/// Spawn a task feeding `demux` from `reader` and forwarding each
/// completed serialized object, tagged with its priority, into `objects`.
///
/// Returns cleanly on EOF. Framing and size-cap violations abort the task
/// with the corresponding error.
pub fn spawn_receiver_pump<R>(
    mut reader: R,
    demux: Arc<ReceiveDemux>,
    objects: mpsc::UnboundedSender<(Priority, Bytes)>,
) -> JoinHandle<Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunks = ChunkBuffer::new();
        let mut buf = vec![0u8; READ_BUF_LEN];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            for (priority, body) in chunks.push(&buf[..n])? {
                let sink = objects.clone();
                demux.process_raw_data(&body, priority, &mut |blob| {
                    sink.send((priority, blob))
                        .map_err(|_| FragwireError::ConnectionClosed)
                })?;
            }
        }
    })
}
