pub mod control;
pub mod error;
pub mod file;
pub mod values;

pub use control::{ControlClient, ControlCommand, ControlServer, ControlSink, FcPos};
pub use error::{Error, Result};
pub use file::DaemonConfig;
pub use values::{parse_duration, parse_size, ConfigValue, Size};
