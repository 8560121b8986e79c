//! Receiver-side reassembly: the two wire-compatible reassembler variants,
//! the residual byte buffer handed to the consumer, and the statistics and
//! metadata bookkeeping that ride along with them.

pub mod error;
pub mod meta_lifecycle;
pub mod network;
pub mod reassembler;
pub mod residual;
pub mod sliding;
pub mod slot;
pub mod stats;

pub use error::{Error, Result};
pub use meta_lifecycle::MetaLifecycle;
pub use network::NetworkReader;
pub use reassembler::{DrainedFrame, Reassembler, SingleSlotReassembler};
pub use residual::ResidualBuffer;
pub use sliding::SlidingWindowReassembler;
pub use stats::ReassemblyStats;
