use ibc_merkle::codec::DecodeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("invalid account name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("malformed input: {0}")]
    Decode(#[from] DecodeError),
}
