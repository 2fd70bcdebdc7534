//! Priority receive demuxer.
//!
//! Routes inbound byte slices to the per-priority [`ReassemblyBuffer`]s
//! and charges every slice against the session-wide [`DataMeter`] before
//! dispatching. Each priority stream reassembles independently; there is
//! no ordering across priorities.

use bytes::Bytes;

use crate::error::{FragwireError, Origin, Result};
use crate::meter::DataMeter;
use crate::priority::Priority;
use crate::receive::reassembly::ReassemblyBuffer;

/// Receive-side engine: one reassembly buffer per priority plus the
/// aggregate inbound data cap.
#[derive(Debug)]
pub struct ReceiveDemux {
    buffers: [ReassemblyBuffer; Priority::COUNT],
    meter: DataMeter,
    origin: Origin,
}

impl ReceiveDemux {
    /// Create a demuxer with its own uncapped meter.
    pub fn new(origin: Origin) -> Self {
        Self::with_meter(origin, DataMeter::unlimited())
    }

    /// Create a demuxer charging against a shared session meter.
    pub fn with_meter(origin: Origin, meter: DataMeter) -> Self {
        Self {
            buffers: [ReassemblyBuffer::new(origin), ReassemblyBuffer::new(origin)],
            meter,
            origin,
        }
    }

    /// The meter this demuxer charges inbound bytes against.
    pub fn meter(&self) -> &DataMeter {
        &self.meter
    }

    /// Feed received bytes into `priority`'s reassembly buffer.
    ///
    /// Charges `data.len()` against the session meter first; on a breach
    /// the data is not dispatched and a [`FragwireError::TotalDataTooLarge`]
    /// scoped to this demuxer's origin is returned. `on_object` is invoked
    /// once per object the bytes complete.
    pub fn process_raw_data(
        &self,
        data: &[u8],
        priority: Priority,
        on_object: &mut dyn FnMut(Bytes) -> Result<()>,
    ) -> Result<()> {
        if !self.meter.try_charge(data.len() as u64) {
            return Err(FragwireError::TotalDataTooLarge {
                origin: self.origin,
                limit: self.meter.limit().unwrap_or(u64::MAX),
            });
        }
        self.buffers[priority.index()].process_raw_data(data, on_object)
    }

    /// Cap the reassembled size of any single object, on every priority.
    pub fn set_max_object_size(&self, limit: Option<u64>) {
        for buffer in &self.buffers {
            buffer.set_max_object_size(limit);
        }
    }

    /// Cap the aggregate inbound raw data for the session.
    pub fn set_max_received_data_size(&self, limit: Option<u64>) {
        self.meter.set_limit(limit);
    }

    /// Tolerate trailing off-sequence fragments from a prior connection on
    /// every priority stream.
    pub fn prepare_for_stream_connect(&self) {
        for buffer in &self.buffers {
            buffer.prepare_for_stream_connect();
        }
    }

    /// Permit one synchronous reentry into `process_raw_data` from the
    /// delivered-object callback, on every priority stream.
    pub fn allow_reentrant_processing(&self, allowed: bool) {
        for buffer in &self.buffers {
            buffer.allow_reentrant_processing(allowed);
        }
    }

    /// Dispose every reassembly buffer. Late-arriving data is ignored.
    pub fn dispose(&self) {
        for buffer in &self.buffers {
            buffer.dispose();
        }
    }
}
