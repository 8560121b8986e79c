use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid codec parameters: {0}")]
    InvalidParams(String),
    #[error("too few blocks to reconstruct: need {need}, have {have}")]
    TooFewBlocks { need: usize, have: usize },
    #[error("underlying erasure codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, Error>;
