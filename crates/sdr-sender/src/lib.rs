//! Sender-side framer, Tx staging ring and transmit task.

pub mod error;
pub mod framer;
pub mod ring;
pub mod tuning;
pub mod tx_task;

pub use error::{Error, Result};
pub use framer::{Framer, SenderControls};
pub use ring::TxRing;
pub use tuning::TuningSnapshot;
pub use tx_task::TxTask;
