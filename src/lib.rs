//! # fragwire
//!
//! Priority-based fragmentation and defragmentation engine for remoting
//! protocols that move serialized objects over byte-oriented transports
//! (named pipes, SSH subsystems, HTTP-carried envelopes).
//!
//! The engine is the middle layer between a higher protocol
//! producing/consuming self-describing object messages and a transport
//! that moves opaque blobs in bounded chunks:
//!
//! - **Send**: [`SendQueue::add`] fragments one serialized object into its
//!   priority buffer; the transport drains fragments one at a time via
//!   [`SendQueue::read_or_register`], with `PromptResponse` traffic
//!   preempting `Default` at fragment boundaries.
//! - **Receive**: the transport feeds [`ReceiveDemux::process_raw_data`];
//!   each priority stream reassembles independently and completed objects
//!   surface through a callback, subject to per-object and session-wide
//!   size caps.
//!
//! The engine is synchronous and callback-driven; [`transport`] provides
//! async pumps adapting it to tokio `AsyncRead`/`AsyncWrite` halves.
//!
//! ## Example
//!
//! ```
//! use fragwire::{Fragmentor, Origin, Priority, ReceiveDemux, SendQueue};
//!
//! let queue = SendQueue::new(Fragmentor::new(1024));
//! queue.add(b"hello remote object", Priority::Default);
//!
//! let demux = ReceiveDemux::new(Origin::Client);
//! let mut delivered = Vec::new();
//! while let Some((fragment, priority)) = queue.read_or_register(Box::new(|_, _| {})) {
//!     demux.process_raw_data(&fragment, priority, &mut |blob| {
//!         delivered.push(blob);
//!         Ok(())
//!     })?;
//! }
//! assert_eq!(&delivered[0][..], b"hello remote object");
//! # Ok::<(), fragwire::FragwireError>(())
//! ```

pub mod codec;
pub mod error;
pub mod meter;
pub mod priority;
pub mod protocol;
pub mod receive;
pub mod transport;

mod send_queue;

pub use error::{FragwireError, Origin, Result};
pub use meter::DataMeter;
pub use priority::Priority;
pub use protocol::{Fragmentor, DEFAULT_FRAGMENT_SIZE, HEADER_LEN};
pub use receive::{ReassemblyBuffer, ReceiveDemux};
pub use send_queue::{SendQueue, SendReadyCallback};
