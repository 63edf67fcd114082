use std::io;
use thiserror::Error;

/// Errors surfaced by the binary codec. A codec error terminates the stream;
/// partially produced values are discarded by the caller.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("unexpected EOF while decoding a value")]
    UnexpectedEof,

    #[error("invalid bool value: {0}")]
    InvalidBool(u8),

    #[error("invalid stop field: {0}")]
    InvalidStopField(i8),

    #[error("negative length {0} specified for a value")]
    InvalidLength(i32),

    #[error("unknown wire type {0}")]
    UnknownType(i8),

    #[error("value of {size} bytes exceeds the size limit of {limit} bytes")]
    LimitExceeded { size: usize, limit: usize },

    #[error("unknown envelope type {0}")]
    UnknownEnvelopeType(i8),

    #[error("unknown envelope version {0:#010x}")]
    EnvelopeVersionMismatch(u32),
}

impl From<io::Error> for WireError {
    fn from(err: io::Error) -> WireError {
        // All short reads are unexpected EOFs when streaming.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            WireError::UnexpectedEof
        } else {
            WireError::Io(err)
        }
    }
}
