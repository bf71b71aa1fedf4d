//! This module provides the top-level error type for this crate.

use std::io;

use thiserror::Error;

use crate::codec::CodecError;
use crate::graph::GraphError;

pub type Result<T> = std::result::Result<T, Error>;

/// The top-level error type for this crate.
///
/// `Data` and `IncompleteWrite` only ever poison the folder job they occurred in,
/// everything `Fatal` aborts the whole extraction.
#[derive(Debug, Error)]
pub enum Error {
    /// A method spec, bind directive or property could not be compiled,
    /// or a coder record doesn't have the arity of its method.
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: String, reason: String },
    /// The packed bytes don't match what the codec expects.
    #[error("data error in folder {folder:?}: {reason}")]
    Data {
        folder: Option<usize>,
        reason: String,
    },
    /// The decoders produced fewer bytes than the files of the folder need.
    #[error("incomplete write: expected {expected} bytes, got {written}")]
    IncompleteWrite { expected: u64, written: u64 },
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// Failures that can't be recovered from by skipping a folder.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("operation cancelled")]
    Cancelled,
    #[error("invalid coder graph: {0}")]
    Graph(#[from] GraphError),
    #[error("codec failure: {0}")]
    Codec(String),
}

impl Error {
    pub(crate) fn invalid<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        return Error::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        };
    }

    /// Whether extraction may continue with the next folder job.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Data { .. } | Error::IncompleteWrite { .. })
    }

    /// Attach the folder index to a data error raised without one.
    pub(crate) fn in_folder(self, index: usize) -> Self {
        match self {
            Error::Data { folder: None, reason } => Error::Data {
                folder: Some(index),
                reason,
            },
            other => other,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        return Error::Fatal(FatalError::Io(e));
    }
}

impl From<GraphError> for Error {
    fn from(e: GraphError) -> Self {
        return Error::Fatal(FatalError::Graph(e));
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::DataMismatch(reason) => Error::Data {
                folder: None,
                reason,
            },
            CodecError::Io(e) => Error::Fatal(FatalError::Io(e)),
            CodecError::ArityMismatch {
                method,
                expected,
                got,
            } => Error::invalid(
                method.to_string(),
                format!("method has arity {:?}, coder declares {:?}", expected, got),
            ),
            other => Error::Fatal(FatalError::Codec(other.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::method::MethodId;

    #[test]
    fn codec_data_mismatch_is_recoverable() {
        let e = Error::from(CodecError::DataMismatch("bad literal".into())).in_folder(3);
        assert!(e.is_recoverable());
        match e {
            Error::Data { folder, .. } => assert_eq!(folder, Some(3)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn arity_mismatch_is_an_invalid_argument() {
        let e = Error::from(CodecError::ArityMismatch {
            method: MethodId(vec![0x00]),
            expected: (1, 1),
            got: (2, 1),
        });
        match e {
            Error::InvalidArgument { field, .. } => assert_eq!(field, "00"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn other_codec_failures_are_fatal() {
        let e = Error::from(CodecError::Other("out of memory".into()));
        assert!(!e.is_recoverable());
        assert!(matches!(e, Error::Fatal(FatalError::Codec(_))));
    }
}
