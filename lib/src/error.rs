use std::backtrace::Backtrace;
use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub backtrace: Backtrace,
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// Wraps an unexpected failure into `ErrorKind::Internal`, prefixing the
    /// original message with `context`.
    ///
    /// Client-caused kinds (`BadInput`, `NotFound`) pass through unchanged so
    /// that they keep their status codes.
    pub fn context(self, context: &str) -> Self {
        let Error { kind, backtrace } = self;
        match kind {
            ErrorKind::BadInput(_) | ErrorKind::NotFound(_) | ErrorKind::Internal(_) => {
                Error { kind, backtrace }
            }
            kind => Error {
                kind: ErrorKind::Internal(format!("{}: {}", context, kind)),
                backtrace,
            },
        }
    }

    /// Returns true if the error was caused by the client rather than the
    /// server.
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind, ErrorKind::BadInput(_) | ErrorKind::NotFound(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            write!(f, ", {}", self.backtrace)?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ErrorKind {
    #[error("io error: {0}")]
    StdIoError(#[from] std::io::Error),

    #[error("config error: {0}")]
    ConfigError(#[from] config::ConfigError),
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("other error: {0}")]
    Other(String),

    /// Client-caused failure, e.g. a blob that isn't an image.
    #[error("{0}")]
    BadInput(String),

    #[error("{0}")]
    NotFound(String),

    /// Unexpected failure, already carrying its context.
    #[error("{0}")]
    Internal(String),

    #[error("db error: {0}")]
    DbError(String),
    #[error("filename already taken: {0}")]
    DuplicateFilename(String),

    #[cfg(feature = "sled")]
    #[error("sled db error: {0}")]
    SledError(#[from] sled::Error),

    #[cfg(feature = "redb")]
    #[error("redb error: {0}")]
    RedbError(#[from] redb::Error),

    #[error("pot decode error: {0}")]
    PotError(#[from] pot::Error),

    #[error("multipart error: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),

    #[error("url parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Self::new(ErrorKind::Other(e))
    }
}

#[cfg(feature = "sled")]
impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Self::new(ErrorKind::SledError(e))
    }
}

#[cfg(feature = "redb")]
impl From<redb::Error> for Error {
    fn from(e: redb::Error) -> Self {
        Self::new(ErrorKind::RedbError(e))
    }
}
#[cfg(feature = "redb")]
impl From<redb::DatabaseError> for Error {
    fn from(e: redb::DatabaseError) -> Self {
        Self::new(ErrorKind::RedbError(e.into()))
    }
}
#[cfg(feature = "redb")]
impl From<redb::TransactionError> for Error {
    fn from(e: redb::TransactionError) -> Self {
        Self::new(ErrorKind::RedbError(e.into()))
    }
}
#[cfg(feature = "redb")]
impl From<redb::TableError> for Error {
    fn from(e: redb::TableError) -> Self {
        Self::new(ErrorKind::RedbError(e.into()))
    }
}
#[cfg(feature = "redb")]
impl From<redb::StorageError> for Error {
    fn from(e: redb::StorageError) -> Self {
        Self::new(ErrorKind::RedbError(e.into()))
    }
}
#[cfg(feature = "redb")]
impl From<redb::CommitError> for Error {
    fn from(e: redb::CommitError) -> Self {
        Self::new(ErrorKind::RedbError(e.into()))
    }
}

impl From<pot::Error> for Error {
    fn from(e: pot::Error) -> Self {
        Self::new(ErrorKind::PotError(e))
    }
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        Self::new(ErrorKind::MultipartError(e))
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::new(ErrorKind::UrlParseError(e))
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Self::new(ErrorKind::ConfigError(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::StdIoError(e))
    }
}

impl From<ErrorKind> for Error {
    fn from(k: ErrorKind) -> Self {
        Self::new(k)
    }
}
