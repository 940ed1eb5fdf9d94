use std::{error::Error as StdError, fmt, io};

/// The different kinds of error that can occur in this library.
///
/// Malformed version or dependency text is deliberately *not* here: parsing
/// is lenient and degrades to unset fields, matching the tolerance of the
/// native tool. Lookup misses are normal results, not errors.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Could not detect the host architecture.
    HostArch,
    /// A query could not be encoded for the fact source.
    QueryEncode,
    /// The fact source did not answer within its deadline.
    SourceTimeout,
    /// The fact source went away (broken pipe or end of stream).
    SourceClosed,
    /// There was an unexpected i/o error talking to the fact source.
    SourceIo,
    /// The fact source answered with something the protocol does not allow.
    SourceProtocol(String),
    /// The fact source kept failing; gave up after this many attempts.
    SourceRetriesExhausted(usize),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::HostArch => write!(f, "could not detect the host architecture"),
            ErrorKind::QueryEncode => write!(f, "could not encode a query for the fact source"),
            ErrorKind::SourceTimeout => write!(f, "the fact source did not answer in time"),
            ErrorKind::SourceClosed => {
                write!(f, "the fact source closed its end of the connection")
            }
            ErrorKind::SourceIo => write!(f, "there was an unexpected i/o error on the fact source"),
            ErrorKind::SourceProtocol(reply) => {
                write!(f, "unexpected reply from the fact source: \"{}\"", reply)
            }
            ErrorKind::SourceRetriesExhausted(attempts) => write!(
                f,
                "the fact source kept failing, gave up after {} attempts",
                attempts
            ),
        }
    }
}

/// The main error type for this library.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    inner: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    #[inline]
    fn from_parts(
        kind: ErrorKind,
        inner: Option<impl Into<Box<dyn StdError + Send + Sync + 'static>>>,
    ) -> Self {
        Error {
            kind,
            inner: inner.map(Into::into),
        }
    }

    pub fn protocol(reply: impl Into<String>) -> Self {
        ErrorKind::SourceProtocol(reply.into()).into()
    }

    pub fn retries_exhausted(attempts: usize, last: Error) -> Self {
        Self::from_parts(ErrorKind::SourceRetriesExhausted(attempts), Some(last))
    }

    /// Add in a source
    pub fn with_source(
        mut self,
        inner: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        self.inner = Some(inner.into());
        self
    }

    /// Whether this failure means the package database can no longer be
    /// trusted. Stale-class errors are retried after a full reset of the
    /// database; anything else propagates immediately.
    pub fn is_stale(&self) -> bool {
        match self.kind {
            ErrorKind::SourceTimeout
            | ErrorKind::SourceClosed
            | ErrorKind::SourceIo
            | ErrorKind::SourceProtocol(_) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .as_ref()
            .map(|i| &**i as &(dyn StdError + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind, inner: None }
    }
}

impl From<io::Error> for Error {
    fn from(cause: io::Error) -> Self {
        let kind = match cause.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::SourceTimeout,
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset => ErrorKind::SourceClosed,
            _ => ErrorKind::SourceIo,
        };
        Error::from_parts(kind, Some(cause))
    }
}

/// Helper trait to help working with `Result<T, Error>` where `Error` is our error.
pub trait ErrorContext<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    /// Takes any result and wraps the error in the given context.
    fn context(self, context: ErrorKind) -> Result<T, Error>;
    /// Takes any result and wraps the error in the context given by the function.
    fn with_context<F>(self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&E) -> ErrorKind;
}

impl<T, E> ErrorContext<T, E> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context(self, context: ErrorKind) -> Result<T, Error> {
        self.map_err(|err| Error {
            kind: context,
            inner: Some(Box::new(err)),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&E) -> ErrorKind,
    {
        self.map_err(|err| {
            let kind = f(&err);
            Error {
                kind,
                inner: Some(Box::new(err)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_classes() {
        let timeout: Error = io::Error::new(io::ErrorKind::TimedOut, "deadline").into();
        assert_eq!(timeout.kind, ErrorKind::SourceTimeout);
        assert!(timeout.is_stale());

        let pipe: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert_eq!(pipe.kind, ErrorKind::SourceClosed);
        assert!(pipe.is_stale());

        let eof: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert_eq!(eof.kind, ErrorKind::SourceClosed);

        let other: Error = io::Error::new(io::ErrorKind::PermissionDenied, "no").into();
        assert_eq!(other.kind, ErrorKind::SourceIo);
    }

    #[test]
    fn fatal_classes_do_not_retry() {
        let encode: Error = ErrorKind::QueryEncode.into();
        assert!(!encode.is_stale());

        let gave_up = Error::retries_exhausted(5, ErrorKind::SourceTimeout.into());
        assert!(!gave_up.is_stale());
        assert!(gave_up.source().is_some());
    }
}
