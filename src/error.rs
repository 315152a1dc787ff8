use serde::Serialize;
use thiserror::Error;

/// Errors raised by the recipe store while opening or reading a database.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
#[allow(clippy::upper_case_acronyms)]
pub enum DatabaseError {
    #[error("io error accessing database: {0}")]
    IO(String),

    #[error("YAML error: {0}")]
    YAML(String),

    #[error("database is locked by another instance of the app")]
    Locked,

    #[error("cannot find index.yaml")]
    MissingIndex,

    #[error("cannot find catalog.yaml")]
    MissingCatalog,

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid chunk count: expected {0}, got {1}")]
    InvalidIndexChunkCount(u32, u32),

    #[error("cannot find chunk {0}")]
    MissingChunk(u32),

    #[error("invalid chunk size: expected {0} bytes, got {1} bytes")]
    InvalidChunkSize(usize, usize),

    #[error("recipe id {0} is out of range")]
    InvalidRecipeId(u64),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("checksum mismatch in chunk {0}")]
    ChecksumMismatch(u32),

    #[error("too many temporary results, try deleting the temp directory")]
    TooManyTemporary,
}

impl From<std::io::Error> for DatabaseError {
    fn from(e: std::io::Error) -> Self {
        DatabaseError::IO(e.to_string())
    }
}

impl From<serde_yaml::Error> for DatabaseError {
    fn from(e: serde_yaml::Error) -> Self {
        DatabaseError::YAML(e.to_string())
    }
}

/// Why a scan over the store did not complete.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("scan aborted")]
    Aborted,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Errors surfaced across the host boundary.
///
/// Every operation resolves with either its payload or exactly one of these.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
#[allow(clippy::enum_variant_names)]
pub enum HostError {
    #[error("io error: {0}")]
    IOError(String),

    #[error("there are too many tasks pending, probably a leak")]
    ExecutorUnavailable,

    #[error("aborted")]
    Aborted,

    #[error("database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("no search result found. Please search first")]
    MissingSearchResult,

    #[error("invalid search filter: {0}")]
    InvalidFilter(String),

    #[error("{0}")]
    Unexpected(String),
}

impl HostError {
    /// `Aborted` is a cancellation, not a failure.
    pub fn is_aborted(&self) -> bool {
        matches!(self, HostError::Aborted)
    }
}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        HostError::IOError(e.to_string())
    }
}

impl From<ScanError> for HostError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::Aborted => HostError::Aborted,
            ScanError::Database(e) => HostError::DatabaseError(e),
        }
    }
}

/// Wire shape of a completion payload: exactly one of `val` or `err` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultInterop<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<HostError>,
}

impl<T> ResultInterop<T> {
    pub fn ok(val: T) -> Self {
        Self {
            val: Some(val),
            err: None,
        }
    }

    pub fn err<E: Into<HostError>>(err: E) -> Self {
        Self {
            val: None,
            err: Some(err.into()),
        }
    }
}

impl<T, E: Into<HostError>> From<Result<T, E>> for ResultInterop<T> {
    fn from(r: Result<T, E>) -> Self {
        match r {
            Ok(val) => Self::ok(val),
            Err(err) => Self::err(err),
        }
    }
}
