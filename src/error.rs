use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LyricsError {
    /// A string that never matched the `[m:ss.ff]` grammar was handed to the codec.
    #[error("malformed timestamp token: {token:?}")]
    MalformedTimestamp { token: String },

    #[error("line index {index} out of range (lyrics have {len} lines)")]
    LineOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, LyricsError>;
