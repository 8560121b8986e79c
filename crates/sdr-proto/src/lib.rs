//! Wire types for the FEC-protected I/Q streaming datagram protocol:
//! fixed-size datagrams, the per-frame metadata record, and the complex
//! sample encoding carried inside them.

pub mod block;
pub mod constants;
pub mod error;
pub mod header;
pub mod metadata;
pub mod sample;

pub use block::Datagram;
pub use error::{Error, Result};
pub use header::Header;
pub use metadata::MetaData;
pub use sample::Sample;
