// A backtrace-carrying error wrapper plus a tracing event fired at
// construction time, so a failure is visible in logs even if the caller
// only propagates the `Result` upward. `ErrorKind` lets callers tell an
// out-of-bounds lookup apart from a corrupted archive, which a bare
// opaque error can't express.

use backtrace_error::DynBacktraceError;
use std::borrow::Cow;
use std::fmt;
use tracing::error;

#[cfg(test)]
use test_log::test;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Sample index past num_samples - 1 or below -num_samples, or any
    // lookup on an empty encoder.
    OutOfBounds,
    // num_samples <= 0 on append, a negative byte width, mismatched shape
    // arity, or a malformed hex chunk name.
    InvalidArgument,
    // A chunk-id operation whose precondition failed.
    InvalidState,
    // Version mismatch, truncated buffer, or a decoded archive whose
    // shape violates an encoder's invariants.
    CorruptedSerialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::OutOfBounds => "out of bounds",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::CorruptedSerialization => "corrupted serialization",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    inner: DynBacktraceError,
}

pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);

impl fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.inner)
    }
}
impl std::error::Error for Error {}

impl Error {
    pub fn new(kind: ErrorKind, err: impl std::error::Error + Send + Sync + 'static) -> Error {
        error!(target: "sample_index", kind = %kind, "{:?}", err);
        Error {
            kind,
            inner: DynBacktraceError::from(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub fn err(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    Error::new(kind, SimpleErr(msg.into()))
}

pub(crate) fn out_of_bounds(msg: impl Into<Cow<'static, str>>) -> Error {
    err(ErrorKind::OutOfBounds, msg)
}

pub(crate) fn invalid_argument(msg: impl Into<Cow<'static, str>>) -> Error {
    err(ErrorKind::InvalidArgument, msg)
}

pub(crate) fn invalid_state(msg: impl Into<Cow<'static, str>>) -> Error {
    err(ErrorKind::InvalidState, msg)
}

pub(crate) fn corrupted(msg: impl Into<Cow<'static, str>>) -> Error {
    err(ErrorKind::CorruptedSerialization, msg)
}

#[test]
fn test_error_kind_round_trips() {
    let e = out_of_bounds("index 5 out of bounds for 3 samples");
    assert_eq!(e.kind(), ErrorKind::OutOfBounds);
    assert!(e.to_string().contains("out of bounds"));
}
