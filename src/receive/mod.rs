//! Receive side - per-priority reassembly and the priority demuxer.

mod demux;
mod reassembly;

pub use demux::ReceiveDemux;
pub use reassembly::{ObjectCallback, ReassemblyBuffer};
