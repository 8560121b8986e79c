use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed datagram: {0}")]
    MalformedDatagram(String),
    #[error("metadata CRC mismatch")]
    MetadataCrcMismatch,
    #[error("invalid block index {0}")]
    InvalidBlockIndex(u8),
}

pub type Result<T> = std::result::Result<T, Error>;
