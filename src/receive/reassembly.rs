//! Receive-side reassembly of fragmented objects.
//!
//! One [`ReassemblyBuffer`] exists per priority stream. Raw bytes arrive in
//! arbitrary slices, unaware of fragment boundaries; the parser validates
//! the framing invariants, accumulates blob bytes and hands each completed
//! serialized object to the caller's callback.
//!
//! # State machine
//!
//! The buffer is either idle (no object in progress) or mid-object with a
//! current object id, the next expected fragment id, the partial blob and
//! the running size. A start fragment unconditionally begins a new object,
//! discarding any prior partial; a continuation must match both the object
//! id and the expected fragment id or the buffer resets and fails. The
//! `ignore_off_sync` mode (armed by [`prepare_for_stream_connect`]) instead
//! silently discards off-sequence fragments until the next start fragment.
//!
//! [`prepare_for_stream_connect`]: ReassemblyBuffer::prepare_for_stream_connect

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use crate::error::{FragwireError, Origin, Result};
use crate::protocol::{Fragment, FragmentHeader, HEADER_LEN, MAX_FRAGMENT_TOTAL};

/// Sentinel for "no cap configured".
const NO_LIMIT: u64 = u64::MAX;

/// Callback receiving each completed serialized object.
///
/// The callee deserializes and consumes the blob; any error it returns
/// propagates out of `process_raw_data` after the buffer state has been
/// reset.
pub type ObjectCallback<'a> = &'a mut dyn FnMut(Bytes) -> Result<()>;

/// Outcome of consuming one parsed fragment.
enum Step {
    /// Not enough buffered bytes for the next fragment.
    NeedMore,
    /// A fragment was consumed (appended or discarded); keep parsing.
    Consumed,
    /// An object completed; deliver this blob.
    Deliver(Bytes),
}

#[derive(Debug, Default)]
struct Control {
    parsers: usize,
    disposed: bool,
}

#[derive(Debug)]
struct ParseState {
    /// Raw inbound bytes, unaware of fragment boundaries.
    pending: BytesMut,
    /// Object currently being reassembled; 0 when idle.
    current_object_id: u64,
    /// Fragment id the next continuation must carry.
    next_fragment_id: u64,
    /// Blob bytes accumulated for the current object.
    assembled: BytesMut,
    /// Header+blob bytes consumed for the current object.
    received_size: u64,
    /// Discard off-sequence fragments until the next start fragment.
    ignore_off_sync: bool,
}

impl ParseState {
    fn new() -> Self {
        Self {
            pending: BytesMut::new(),
            current_object_id: 0,
            next_fragment_id: 0,
            assembled: BytesMut::new(),
            received_size: 0,
            ignore_off_sync: false,
        }
    }

    /// Discard the partial object, keeping pending bytes and the
    /// off-sync mode.
    fn reset_object(&mut self) {
        self.current_object_id = 0;
        self.next_fragment_id = 0;
        self.assembled.clear();
        self.received_size = 0;
    }
}

/// Per-priority stream parser reassembling fragments into whole objects.
pub struct ReassemblyBuffer {
    origin: Origin,
    control: Mutex<Control>,
    state: Mutex<ParseState>,
    /// Parser concurrency limit; 1 unless reentrant processing is enabled.
    max_parsers: AtomicUsize,
    /// Per-object size cap; `NO_LIMIT` when unset.
    max_object_size: AtomicU64,
}

impl ReassemblyBuffer {
    /// Create an idle buffer. `origin` scopes the size-cap error variants.
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            control: Mutex::new(Control::default()),
            state: Mutex::new(ParseState::new()),
            max_parsers: AtomicUsize::new(1),
            max_object_size: AtomicU64::new(NO_LIMIT),
        }
    }

    /// Cap the cumulative reassembled size of one object. `None` removes
    /// the cap.
    pub fn set_max_object_size(&self, limit: Option<u64>) {
        self.max_object_size
            .store(limit.unwrap_or(NO_LIMIT), Ordering::Release);
    }

    /// Tolerate trailing off-sequence fragments from a prior connection.
    ///
    /// Until the next start fragment arrives, off-sequence fragments are
    /// silently discarded instead of failing the stream.
    pub fn prepare_for_stream_connect(&self) {
        self.state.lock().ignore_off_sync = true;
    }

    /// Permit one synchronous reentry into `process_raw_data` from the
    /// delivered-object callback.
    pub fn allow_reentrant_processing(&self, allowed: bool) {
        self.max_parsers
            .store(if allowed { 2 } else { 1 }, Ordering::Release);
    }

    /// Mark the buffer disposed.
    ///
    /// A parser currently inside the buffer finishes its current
    /// iteration; buffered state is released by the last parser out. Later
    /// `process_raw_data` calls return without effect.
    pub fn dispose(&self) {
        let mut control = self.control.lock();
        control.disposed = true;
        if control.parsers == 0 {
            drop(control);
            self.release_buffers();
        }
    }

    /// Feed received bytes into the buffer and deliver any objects they
    /// complete.
    ///
    /// Invokes `on_object` once per completed object, in arrival order,
    /// with no buffer locks held. On any framing error the partial object
    /// is discarded before the error surfaces; the next well-formed start
    /// fragment begins a fresh object.
    pub fn process_raw_data(&self, data: &[u8], on_object: ObjectCallback<'_>) -> Result<()> {
        {
            let mut control = self.control.lock();
            if control.disposed {
                return Ok(());
            }
            control.parsers += 1;
            debug_assert!(
                control.parsers <= self.max_parsers.load(Ordering::Acquire),
                "too many threads processing raw data"
            );
        }

        let result = self.run_parser(data, on_object);

        let mut control = self.control.lock();
        control.parsers -= 1;
        if control.disposed && control.parsers == 0 {
            drop(control);
            self.release_buffers();
        }
        result
    }

    fn run_parser(&self, data: &[u8], on_object: ObjectCallback<'_>) -> Result<()> {
        self.state.lock().pending.extend_from_slice(data);

        loop {
            let step = {
                let mut state = self.state.lock();
                self.consume_one(&mut state)?
            };
            match step {
                Step::NeedMore => return Ok(()),
                Step::Consumed => {}
                Step::Deliver(blob) => {
                    on_object(blob)?;
                    if self.control.lock().disposed {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Parse and apply at most one fragment from the pending bytes.
    ///
    /// Every error path discards the partial object before returning.
    /// Sequence and size violations consume the failing fragment first, so
    /// the stream position stays coherent for callers that keep feeding
    /// data; header-level violations leave the stream unrecoverable and
    /// the transport is expected to terminate the channel.
    fn consume_one(&self, state: &mut ParseState) -> Result<Step> {
        if state.pending.len() < HEADER_LEN {
            return Ok(Step::NeedMore);
        }
        let header =
            FragmentHeader::decode(&state.pending[..HEADER_LEN]).expect("length checked above");

        if !header.has_valid_object_id() {
            state.reset_object();
            return Err(FragwireError::InvalidObjectId);
        }

        let total = header.total_len();
        if total > MAX_FRAGMENT_TOTAL {
            state.reset_object();
            return Err(FragwireError::FragmentTooLarge { length: total });
        }

        if (state.pending.len() as u64) < total {
            return Ok(Step::NeedMore);
        }

        let mut fragment_bytes = state.pending.split_to(total as usize);
        let blob = fragment_bytes.split_off(HEADER_LEN).freeze();
        let fragment = Fragment::new(header, blob);

        tracing::trace!(
            target: "fragwire::recv",
            object_id = fragment.object_id(),
            fragment_id = fragment.fragment_id(),
            start = fragment.is_start(),
            end = fragment.is_end(),
            blob_len = fragment.blob_len(),
            preview = %fragment.blob_preview(),
            "fragment consumed"
        );

        // Size accounting follows the transition: a start fragment opens a
        // fresh object, a continuation extends the running total.
        let next_size = if fragment.is_start() {
            total
        } else {
            state.received_size.checked_add(total).unwrap_or(u64::MAX)
        };
        let max = self.max_object_size.load(Ordering::Acquire);
        if max != NO_LIMIT && next_size > max {
            state.reset_object();
            return Err(FragwireError::ObjectTooLarge {
                origin: self.origin,
                limit: max,
            });
        }

        if fragment.is_start() {
            state.ignore_off_sync = false;
            state.current_object_id = fragment.object_id();
            state.next_fragment_id = 1;
            state.assembled.clear();
            state.assembled.extend_from_slice(fragment.blob());
            state.received_size = next_size;
        } else {
            let in_sequence = state.current_object_id == fragment.object_id()
                && state.next_fragment_id == fragment.fragment_id();
            if !in_sequence {
                if state.ignore_off_sync {
                    // Trailing fragment of a connection that went away;
                    // drop it and keep parsing.
                    state.reset_object();
                    return Ok(Step::Consumed);
                }
                let error = if state.current_object_id != fragment.object_id() {
                    FragwireError::ObjectIdMismatch {
                        expected: state.current_object_id,
                        actual: fragment.object_id(),
                    }
                } else {
                    FragwireError::FragmentOutOfSequence {
                        object_id: fragment.object_id(),
                        expected: state.next_fragment_id,
                        actual: fragment.fragment_id(),
                    }
                };
                state.reset_object();
                return Err(error);
            }
            state.next_fragment_id += 1;
            state.assembled.extend_from_slice(fragment.blob());
            state.received_size = next_size;
        }

        if fragment.is_end() {
            let blob = state.assembled.split().freeze();
            // Reset before delivery so a reentrant parser sees a clean
            // buffer.
            state.reset_object();
            return Ok(Step::Deliver(blob));
        }
        Ok(Step::Consumed)
    }

    fn release_buffers(&self) {
        let mut state = self.state.lock();
        state.pending = BytesMut::new();
        state.reset_object();
    }
}

impl std::fmt::Debug for ReassemblyBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReassemblyBuffer")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
