use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("framer error: {0}")]
    Framer(String),
    #[error(transparent)]
    Fec(#[from] sdr_fec::Error),
    #[error(transparent)]
    Proto(#[from] sdr_proto::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
