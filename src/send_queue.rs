//! Priority send queue - per-priority fragment buffers and the
//! single-reader pull interface.
//!
//! Outbound objects are fragmented into one of two per-priority buffers.
//! The transport drains the queue one fragment at a time via
//! [`SendQueue::read_or_register`]: `PromptResponse` is checked first, then
//! `Default`, and when both buffers are empty the provided callback is
//! parked and fired at most once, with the next fragment, as soon as a
//! writer appends one.
//!
//! # Ordering
//!
//! - Within one priority fragments come back in strict append order, which
//!   equals fragmentor emission order.
//! - `PromptResponse` preempts `Default` at fragment boundaries only: each
//!   pull returns exactly one fragment and the next pull re-checks
//!   `PromptResponse` first.
//! - `add` appends a whole fragment sequence under one store lock, so the
//!   fragments of one object are always contiguous within their priority
//!   buffer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::priority::Priority;
use crate::protocol::Fragmentor;

/// One-shot callback handed to [`SendQueue::read_or_register`].
///
/// Invoked with the next available fragment and its priority after a pull
/// that found both buffers empty. Runs on whichever thread appended the
/// data, with no queue locks held.
pub type SendReadyCallback = Box<dyn FnOnce(Bytes, Priority) + Send + 'static>;

/// Ordered queue of whole encoded fragments for one priority.
#[derive(Debug, Default)]
struct FragmentStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    fragments: VecDeque<Bytes>,
    /// A one-shot waiter is parked on this store.
    waiting: bool,
}

impl FragmentStore {
    /// Append a whole fragment sequence atomically.
    ///
    /// Returns `true` when a parked waiter must be fired, i.e. on an
    /// empty-to-non-empty transition with a waiter registered. The waiter
    /// slot is cleared before the store lock is released.
    fn append(&self, fragments: Vec<Bytes>) -> bool {
        if fragments.is_empty() {
            return false;
        }
        let mut inner = self.inner.lock();
        let was_empty = inner.fragments.is_empty();
        inner.fragments.extend(fragments);
        let fire = was_empty && inner.waiting;
        if fire {
            inner.waiting = false;
        }
        fire
    }

    /// Pop the next fragment, or park a waiter when empty.
    fn read_or_wait(&self) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        let fragment = inner.fragments.pop_front();
        if fragment.is_none() {
            inner.waiting = true;
        }
        fragment
    }

    /// Pop the next fragment without parking a waiter.
    fn try_read(&self) -> Option<Bytes> {
        self.inner.lock().fragments.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.inner.lock().fragments.is_empty()
    }

    fn clear(&self) {
        self.inner.lock().fragments.clear();
    }
}

/// Send-side engine: fragments objects and serves them to a single reader
/// across two priority classes.
pub struct SendQueue {
    stores: [FragmentStore; Priority::COUNT],
    fragmentor: Fragmentor,
    /// Parked consumer callback; the mutex doubles as the read-side lock
    /// serializing pulls and registration.
    pending_reader: Mutex<Option<SendReadyCallback>>,
    /// Guards against concurrent notification dispatch from both
    /// priorities; a swallowed signal is recovered by the post-release
    /// re-scan in `notify_data_available`.
    handling_callback: AtomicBool,
}

impl SendQueue {
    /// Create a queue fragmenting through the given fragmentor.
    pub fn new(fragmentor: Fragmentor) -> Self {
        Self {
            stores: Default::default(),
            fragmentor,
            pending_reader: Mutex::new(None),
            handling_callback: AtomicBool::new(false),
        }
    }

    /// The fragmentor this queue splits objects with.
    pub fn fragmentor(&self) -> &Fragmentor {
        &self.fragmentor
    }

    /// Fragment `data` and append the whole sequence to `priority`'s
    /// buffer.
    ///
    /// Thread-safe; concurrent adds to the same priority serialize on the
    /// store lock, so two objects never interleave within one buffer.
    pub fn add(&self, data: &[u8], priority: Priority) {
        let fragments = self.fragmentor.fragment(data);
        if self.stores[priority.index()].append(fragments) {
            self.notify_data_available();
        }
    }

    /// Discard all pending fragments, each priority drained atomically.
    pub fn clear(&self) {
        for store in &self.stores {
            store.clear();
        }
    }

    /// Pull the next fragment, or park `callback` until one is appended.
    ///
    /// `PromptResponse` is checked before `Default`. Returns `None` when
    /// both buffers are empty, in which case `callback` fires exactly once
    /// with the next appended fragment. May be called from inside a firing
    /// callback.
    pub fn read_or_register(
        &self,
        callback: SendReadyCallback,
    ) -> Option<(Bytes, Priority)> {
        let mut pending = self.pending_reader.lock();
        for priority in Priority::SERVICE_ORDER {
            if let Some(bytes) = self.stores[priority.index()].read_or_wait() {
                return Some((bytes, priority));
            }
        }
        *pending = Some(callback);
        None
    }

    /// Dispatch parked reader callbacks after an empty-to-non-empty store
    /// transition.
    fn notify_data_available(&self) {
        loop {
            if self.handling_callback.swap(true, Ordering::AcqRel) {
                // Another thread is dispatching; it re-scans after
                // releasing the flag, so this signal is safe to drop.
                return;
            }
            loop {
                let handoff = {
                    let mut pending = self.pending_reader.lock();
                    match pending.take() {
                        None => None,
                        Some(callback) => match self.try_next_fragment() {
                            Some(hit) => Some((callback, hit)),
                            None => {
                                *pending = Some(callback);
                                None
                            }
                        },
                    }
                };
                match handoff {
                    Some((callback, (bytes, priority))) => callback(bytes, priority),
                    None => break,
                }
            }
            self.handling_callback.store(false, Ordering::Release);

            // A signal from the other priority may have been swallowed
            // while the flag was held; go again only if a parked reader
            // and data now coexist.
            let parked = self.pending_reader.lock().is_some();
            if !parked || !self.any_data_available() {
                return;
            }
        }
    }

    fn try_next_fragment(&self) -> Option<(Bytes, Priority)> {
        for priority in Priority::SERVICE_ORDER {
            if let Some(bytes) = self.stores[priority.index()].try_read() {
                return Some((bytes, priority));
            }
        }
        None
    }

    fn any_data_available(&self) -> bool {
        self.stores.iter().any(|store| !store.is_empty())
    }
}

impl Default for SendQueue {
    fn default() -> Self {
        Self::new(Fragmentor::default())
    }
}

impl std::fmt::Debug for SendQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendQueue")
            .field("stores", &self.stores)
            .field("fragmentor", &self.fragmentor)
            .finish_non_exhaustive()
    }
}
