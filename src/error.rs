use crate::types::Timestamp;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The stream has fewer than two frames or its timestamps are not
    /// strictly increasing.
    #[error("invalid stream: {0}")]
    InvalidStream(String),

    /// The query maps to a negative frame estimate.
    #[error("query time {query} resolves to negative frame estimate {estimate}")]
    InvalidQuery { query: Timestamp, estimate: i64 },

    /// Combining a frame timestamp with an offset leaves the timestamp
    /// range.
    #[error("timestamp {timestamp} combined with offset {offset} is out of range")]
    TimestampOverflow { timestamp: Timestamp, offset: Timestamp },

    #[error("no file matching `{pattern}` in {}", dir.display())]
    EmptyDirectory { dir: PathBuf, pattern: String },

    /// The directory carries the completion sentinel of a previous
    /// renormalization pass.
    #[error("{} is already renormalized, remove {} to force another pass", dir.display(), sentinel.display())]
    AlreadySynced { dir: PathBuf, sentinel: PathBuf },

    #[error("cannot rename {} to {}: target already exists", from.display(), to.display())]
    RenameCollision { from: PathBuf, to: PathBuf },

    #[error("unable to load or save frame {}", path.display())]
    DecodeFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("frame {} has color type {color}, expected three color channels", path.display())]
    UnsupportedColor { path: PathBuf, color: String },

    #[error("stream {0} is not registered")]
    UnknownStream(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("frame worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

macro_rules! ensure_stream {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::InvalidStream(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_stream;
