//! Error type shared by every keeper component.
//!
//! [`KeeperError`] carries an [`ErrorKind`], a static description, optional dynamic detail, an
//! optional source error and the location where it was created. Several errors can be folded
//! into one aggregate with `KeeperError::from(vec![..])`.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::num::TryFromIntError;
use std::panic::Location;
use std::sync::Arc;

/// Result alias used across the crate.
pub type KeeperResult<T> = Result<T, KeeperError>;

#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Error raised by chain reads, store writes and the sync machinery.
#[derive(Debug, Clone)]
pub struct KeeperError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    /// Aggregated errors, e.g. from several failed upkeep tasks.
    Many {
        errors: Vec<KeeperError>,
        location: &'static Location<'static>,
    },
}

/// Classification of a [`KeeperError`].
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A chain reader call failed or returned undecodable data.
    ChainReadFailed,
    /// A persistence store call failed.
    StoreQueryFailed,
    /// The store is ahead of the contract.
    InvariantViolation,
    /// A chain value does not fit the stored representation.
    ConversionError,
    InvalidData,
    WorkerPanic,
    ConfigError,
    Unknown,
}

impl KeeperError {
    /// Returns the kind of this error, or of the first aggregated error.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns every kind contained in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.description.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the dynamic detail, or the first one found among aggregated errors.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches the originating error. No effect on aggregates.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        KeeperError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
            }),
        }
    }
}

impl PartialEq for KeeperError {
    fn eq(&self, other: &KeeperError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (ErrorRepr::Many { errors: a, .. }, ErrorRepr::Many { errors: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for KeeperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail:")?;
                    for line in detail.lines() {
                        write!(f, "\n    {line}")?;
                    }
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = error.to_string();
                    let mut lines = rendered.lines();
                    if let Some(first_line) = lines.next() {
                        write!(f, "\n  {}. {}", index + 1, first_line)?;
                    }
                    for line in lines {
                        write!(f, "\n     {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for KeeperError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

impl From<(ErrorKind, &'static str)> for KeeperError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> KeeperError {
        KeeperError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for KeeperError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> KeeperError {
        KeeperError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates errors. A single error is returned unwrapped.
impl<E> From<Vec<E>> for KeeperError
where
    E: Into<KeeperError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> KeeperError {
        let location = Location::caller();

        let mut errors: Vec<KeeperError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1
            && let Some(error) = errors.pop()
        {
            return error;
        }

        KeeperError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

impl From<sqlx::Error> for KeeperError {
    #[track_caller]
    fn from(err: sqlx::Error) -> KeeperError {
        let detail = err.to_string();
        KeeperError::from_components(
            ErrorKind::StoreQueryFailed,
            Cow::Borrowed("Postgres store query failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<serde_json::Error> for KeeperError {
    #[track_caller]
    fn from(err: serde_json::Error) -> KeeperError {
        let detail = err.to_string();
        KeeperError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("JSON conversion failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<hex::FromHexError> for KeeperError {
    #[track_caller]
    fn from(err: hex::FromHexError) -> KeeperError {
        let detail = err.to_string();
        KeeperError::from_components(
            ErrorKind::InvalidData,
            Cow::Borrowed("Hex decoding failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<TryFromIntError> for KeeperError {
    #[track_caller]
    fn from(err: TryFromIntError) -> KeeperError {
        let detail = err.to_string();
        KeeperError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Integer conversion failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
