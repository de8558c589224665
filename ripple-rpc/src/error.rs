use crate::codec::CodecType;
use tokio_util::codec::{AnyDelimiterCodecError, LinesCodecError};

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Lines(#[from] LinesCodecError),

    #[error(transparent)]
    Delimiter(#[from] AnyDelimiterCodecError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A single frame was over the size limit and has been skipped.
    #[error("frame exceeds {} bytes", crate::codec::MAX_FRAME_LENGTH)]
    FrameTooLong,

    /// The peer ended the stream between two messages.
    #[error("connection closed")]
    Closed,

    #[error("invalid magic number {0:#x}")]
    InvalidMagicNumber(u64),

    #[error("invalid codec type {0}")]
    InvalidCodecType(CodecType),

    #[error("unexpected reply seq {actual}, expected {expected}")]
    UnexpectedSeq { expected: u64, actual: u64 },

    #[error("{0}")]
    Remote(String),
}

impl Error {
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }
}
