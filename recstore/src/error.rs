//! Error types and result definitions for record store operations.
//!
//! [`StoreError`] carries an [`ErrorKind`] used to decide how a failure is handled, a static
//! description, an optional dynamic detail, an optional source error and the callsite where
//! the error was created.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error returned by record store operations.
#[derive(Debug, Clone)]
pub struct StoreError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Categories of record store failures.
///
/// Only [`ErrorKind::ConnectionFailed`] is fatal for the customer tooling; every other kind
/// is logged and the caller moves on.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Connection
    ConnectionFailed,
    AuthenticationError,

    // Index management
    IndexCreationFailed,
    IndexAlreadyExists,

    // Record operations
    WriteFailed,
    RecordNotFound,
    QueryFailed,
    InvalidKey,

    // Lifecycle
    InvalidState,

    // Encoding
    SerializationError,
    DeserializationError,

    ConfigError,
    IoError,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the dynamic detail attached to this error, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns where this error was created.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Returns `true` when the error means the record or match does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::RecordNotFound
    }

    /// Attaches the originating error, exposed through [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
    ) -> Self {
        StoreError {
            kind,
            description,
            detail,
            source: None,
            location: Location::caller(),
        }
    }
}

impl PartialEq for StoreError {
    fn eq(&self, other: &StoreError) -> bool {
        self.kind == other.kind
    }
}

impl Hash for StoreError {
    /// Hashes the kind and static description only, so repeated occurrences of the same
    /// failure group together regardless of detail or callsite.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.description.hash(state);
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.description)?;

        if let Some(detail) = self.detail.as_deref() {
            if detail.trim().is_empty() {
                write!(f, ": <empty>")?;
            } else {
                write!(f, ": {detail}")?;
            }
        }

        write!(
            f,
            " @ {}:{}:{}",
            self.location.file(),
            self.location.line(),
            self.location.column()
        )
    }
}

impl error::Error for StoreError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn error::Error + 'static))
    }
}

/// Creates a [`StoreError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for StoreError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> StoreError {
        StoreError::from_components(kind, Cow::Borrowed(desc), None)
    }
}

/// Creates a [`StoreError`] from an error kind, static description and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for StoreError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> StoreError {
        StoreError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()))
    }
}

impl From<std::io::Error> for StoreError {
    #[track_caller]
    fn from(err: std::io::Error) -> StoreError {
        let detail = err.to_string();
        StoreError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
        )
        .with_source(err)
    }
}

/// Maps JSON failures onto serialization or deserialization kinds.
impl From<serde_json::Error> for StoreError {
    #[track_caller]
    fn from(err: serde_json::Error) -> StoreError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "stored record is not valid JSON",
            ),
        };

        let detail = err.to_string();
        StoreError::from_components(kind, Cow::Borrowed(description), Some(Cow::Owned(detail)))
            .with_source(err)
    }
}

impl From<config::shared::ValidationError> for StoreError {
    #[track_caller]
    fn from(err: config::shared::ValidationError) -> StoreError {
        let detail = err.to_string();
        StoreError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("invalid store configuration"),
            Some(Cow::Owned(detail)),
        )
        .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::error::Error as _;

    use super::*;
    use crate::store_error;

    fn hash_of(err: &StoreError) -> u64 {
        let mut hasher = DefaultHasher::new();
        err.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn display_includes_kind_detail_and_location() {
        let err = store_error!(ErrorKind::WriteFailed, "put failed", "key test:phones:1");
        let rendered = err.to_string();

        assert!(rendered.starts_with("[WriteFailed] put failed: key test:phones:1 @ "));
        assert!(rendered.contains("error.rs"));
    }

    #[test]
    fn empty_detail_is_rendered_explicitly() {
        let err = store_error!(ErrorKind::QueryFailed, "query failed", "  ");

        assert!(err.to_string().contains("query failed: <empty>"));
    }

    #[test]
    fn equality_and_hash_ignore_detail() {
        let a = store_error!(ErrorKind::RecordNotFound, "record not found", "id 1");
        let b = store_error!(ErrorKind::RecordNotFound, "record not found", "id 2");

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert!(a.is_not_found());
    }

    #[test]
    fn source_is_exposed() {
        let io = std::io::Error::other("socket closed");
        let err = StoreError::from(io);

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.source().unwrap().to_string(), "socket closed");
    }

    #[test]
    fn json_syntax_error_maps_to_deserialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::from(json_err);

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }
}
