use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(String),

    #[error("missing required option: {0}")]
    MissingOption(String),

    #[error("malformed key=value request: {0}")]
    MalformedRequest(String),

    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
