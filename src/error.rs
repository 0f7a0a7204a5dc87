use thiserror::Error;

/// Errors raised while building, reading or replaying a fragment map.
///
/// `Format` covers malformed user data (alignment, map or annotation rows)
/// and carries the offending line number. The three `Missing*` kinds signal
/// inconsistent inputs: a name referenced by one input is absent from
/// another.
#[derive(Debug, Error)]
pub enum Error {
    #[error("line {line}: {msg}")]
    Format { line: usize, msg: String },

    #[error("the fragment {0} length is missing")]
    MissingFragmentLength(String),

    #[error("the fragment {0} sequence is missing")]
    MissingFragmentSequence(String),

    #[error("{0} missing in the fragment map")]
    MissingChromosome(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn format(line: usize, msg: impl Into<String>) -> Self {
        Error::Format {
            line,
            msg: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
