//! Errors raised by warehouse loads.
//!
//! An [`EtlError`] is either a single failure, classified by an [`ErrorKind`], or a group
//! of failures collected while loading several tables. Every failure remembers the callsite
//! that raised it and, when enabled through `RUST_BACKTRACE`, a backtrace.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Result type used across the crate.
pub type EtlResult<T> = Result<T, EtlError>;

/// Main error type for warehouse loads.
#[derive(Debug, Clone)]
pub struct EtlError(Box<Inner>);

#[derive(Debug, Clone)]
enum Inner {
    Failure(Failure),
    Group {
        members: Vec<EtlError>,
        raised_at: &'static Location<'static>,
    },
}

#[derive(Debug, Clone)]
struct Failure {
    kind: ErrorKind,
    message: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    cause: Option<Arc<dyn error::Error + Send + Sync>>,
    raised_at: &'static Location<'static>,
    trace: Arc<Backtrace>,
}

/// What went wrong, coarsely.
///
/// Bad values in bronze rows are not errors: they become sentinels or rejected rows. These
/// kinds cover what aborts a load.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    StoreConnectionFailed,
    StoreQueryFailed,
    StoreWriteFailed,
    StoreIoError,
    OperationCanceled,

    SchemaError,
    MissingColumn,
    MissingTable,

    ConversionError,
    InvalidData,
    ConstraintViolation,

    ConfigError,
    IoError,
    EncryptionError,
    AuthenticationError,
    PermissionDenied,

    InvalidState,

    Unknown,
}

impl EtlError {
    #[track_caller]
    fn failure(
        kind: ErrorKind,
        message: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
    ) -> Self {
        EtlError(Box::new(Inner::Failure(Failure {
            kind,
            message,
            detail,
            cause: None,
            raised_at: Location::caller(),
            trace: Arc::new(Backtrace::capture()),
        })))
    }

    /// Wraps a foreign error. Its rendering becomes the detail.
    #[track_caller]
    fn caused_by<E>(kind: ErrorKind, message: &'static str, err: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        let detail = Cow::Owned(err.to_string());
        EtlError::failure(kind, Cow::Borrowed(message), Some(detail)).with_source(err)
    }

    /// The kind of this failure. A group reports the kind of its first member.
    pub fn kind(&self) -> ErrorKind {
        match &*self.0 {
            Inner::Failure(failure) => failure.kind,
            Inner::Group { members, .. } => {
                members.first().map_or(ErrorKind::Unknown, EtlError::kind)
            }
        }
    }

    /// Every kind in this error, groups flattened in order.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match &*self.0 {
            Inner::Failure(failure) => vec![failure.kind],
            Inner::Group { members, .. } => members.iter().flat_map(EtlError::kinds).collect(),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match &*self.0 {
            Inner::Failure(failure) => failure.detail.as_deref(),
            Inner::Group { members, .. } => members.iter().find_map(EtlError::detail),
        }
    }

    /// The backtrace of a single failure. Groups have none of their own.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match &*self.0 {
            Inner::Failure(failure) => Some(failure.trace.as_ref()),
            Inner::Group { .. } => None,
        }
    }

    pub fn location(&self) -> &'static Location<'static> {
        match &*self.0 {
            Inner::Failure(failure) => failure.raised_at,
            Inner::Group { raised_at, .. } => *raised_at,
        }
    }

    /// Attaches the error that caused this one. Ignored on groups.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let Inner::Failure(failure) = self.0.as_mut() {
            failure.cause = Some(Arc::new(source));
        }
        self
    }
}

/// Errors are equal when they carry the same kinds in the same order.
impl PartialEq for EtlError {
    fn eq(&self, other: &EtlError) -> bool {
        self.kinds() == other.kinds()
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            Inner::Failure(failure) => {
                write!(
                    f,
                    "{:?}: {} ({})",
                    failure.kind, failure.message, failure.raised_at
                )?;
                if let Some(detail) = &failure.detail {
                    write_section(f, "detail", detail)?;
                }
                if failure.trace.status() == BacktraceStatus::Captured {
                    write_section(f, "backtrace", &failure.trace.to_string())?;
                }

                Ok(())
            }
            Inner::Group { members, raised_at } => {
                write!(f, "{} errors ({raised_at})", members.len())?;
                for (position, member) in members.iter().enumerate() {
                    write!(f, "\n  #{}", position + 1)?;
                    for line in member.to_string().lines() {
                        write!(f, "\n    {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, name: &str, body: &str) -> fmt::Result {
    let mut lines = body.lines();
    match (lines.next(), lines.next()) {
        (None, _) => write!(f, "\n  {name}: <empty>"),
        (Some(only), None) => write!(f, "\n  {name}: {only}"),
        (Some(_), Some(_)) => {
            write!(f, "\n  {name}:")?;
            body.lines()
                .try_for_each(|line| write!(f, "\n    {}", line.trim_end()))
        }
    }
}

impl error::Error for EtlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &*self.0 {
            Inner::Failure(failure) => failure
                .cause
                .as_deref()
                .map(|cause| cause as &(dyn error::Error + 'static)),
            Inner::Group { members, .. } => members
                .first()
                .map(|member| member as &(dyn error::Error + 'static)),
        }
    }
}

impl From<(ErrorKind, &'static str)> for EtlError {
    #[track_caller]
    fn from((kind, message): (ErrorKind, &'static str)) -> EtlError {
        EtlError::failure(kind, Cow::Borrowed(message), None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for EtlError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, message, detail): (ErrorKind, &'static str, D)) -> EtlError {
        EtlError::failure(kind, Cow::Borrowed(message), Some(detail.into()))
    }
}

/// Groups errors. A vector holding one error yields that error.
impl<E> From<Vec<E>> for EtlError
where
    E: Into<EtlError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> EtlError {
        let raised_at = Location::caller();
        let members: Vec<EtlError> = errors.into_iter().map(Into::into).collect();

        match <[EtlError; 1]>::try_from(members) {
            Ok([only]) => only,
            Err(members) => EtlError(Box::new(Inner::Group { members, raised_at })),
        }
    }
}

impl From<std::io::Error> for EtlError {
    #[track_caller]
    fn from(err: std::io::Error) -> EtlError {
        EtlError::caused_by(ErrorKind::IoError, "I/O operation failed", err)
    }
}

impl From<std::num::TryFromIntError> for EtlError {
    #[track_caller]
    fn from(err: std::num::TryFromIntError) -> EtlError {
        EtlError::caused_by(ErrorKind::ConversionError, "Integer out of range", err)
    }
}

impl From<rustls::Error> for EtlError {
    #[track_caller]
    fn from(err: rustls::Error) -> EtlError {
        EtlError::caused_by(ErrorKind::EncryptionError, "TLS configuration failed", err)
    }
}

impl From<tokio_postgres::Error> for EtlError {
    #[track_caller]
    fn from(err: tokio_postgres::Error) -> EtlError {
        let (kind, message) = match err.code() {
            Some(state) => classify_sqlstate(state.code()),
            None if err.is_closed() => (
                ErrorKind::StoreConnectionFailed,
                "PostgreSQL connection closed",
            ),
            None => (
                ErrorKind::StoreConnectionFailed,
                "PostgreSQL connection failed",
            ),
        };

        EtlError::caused_by(kind, message, err)
    }
}

/// SQLSTATE codes that get a kind of their own, checked before their class.
const SQLSTATE_CODES: &[(&str, ErrorKind, &str)] = &[
    ("42P01", ErrorKind::MissingTable, "PostgreSQL table does not exist"),
    ("42703", ErrorKind::SchemaError, "PostgreSQL column does not exist"),
    ("42501", ErrorKind::PermissionDenied, "PostgreSQL permission denied"),
    ("57014", ErrorKind::OperationCanceled, "PostgreSQL query canceled"),
];

/// SQLSTATE classes, keyed by the first two characters of the code.
const SQLSTATE_CLASSES: &[(&str, ErrorKind, &str)] = &[
    ("08", ErrorKind::StoreConnectionFailed, "PostgreSQL connection failed"),
    ("22", ErrorKind::ConversionError, "PostgreSQL data conversion failed"),
    ("23", ErrorKind::ConstraintViolation, "PostgreSQL constraint violation"),
    ("25", ErrorKind::InvalidState, "PostgreSQL transaction failed"),
    ("28", ErrorKind::AuthenticationError, "PostgreSQL authentication failed"),
    ("40", ErrorKind::InvalidState, "PostgreSQL transaction failed"),
    ("42", ErrorKind::StoreQueryFailed, "PostgreSQL syntax or access error"),
    ("53", ErrorKind::StoreConnectionFailed, "PostgreSQL server unavailable"),
    ("55", ErrorKind::InvalidState, "PostgreSQL transaction failed"),
    ("57", ErrorKind::StoreConnectionFailed, "PostgreSQL server unavailable"),
    ("58", ErrorKind::StoreIoError, "PostgreSQL system error"),
    ("F0", ErrorKind::ConfigError, "PostgreSQL configuration error"),
    ("XX", ErrorKind::StoreIoError, "PostgreSQL system error"),
];

fn classify_sqlstate(code: &str) -> (ErrorKind, &'static str) {
    let class = code.get(..2).unwrap_or_default();

    SQLSTATE_CODES
        .iter()
        .find(|(known, ..)| *known == code)
        .or_else(|| SQLSTATE_CLASSES.iter().find(|(known, ..)| *known == class))
        .map_or((ErrorKind::StoreQueryFailed, "PostgreSQL error"), |&(_, kind, message)| {
            (kind, message)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bail, etl_error};

    #[test]
    fn display_names_kind_message_and_detail() {
        let err = etl_error!(
            ErrorKind::MissingColumn,
            "Column missing from record",
            "cst_id"
        );

        let rendered = err.to_string();
        assert!(rendered.starts_with("MissingColumn: Column missing from record ("));
        assert!(rendered.contains("\n  detail: cst_id"));
        assert_eq!(err.detail(), Some("cst_id"));
        assert!(err.location().file().ends_with("error.rs"));
    }

    #[test]
    fn single_error_vector_is_not_grouped() {
        let err: EtlError = vec![etl_error!(ErrorKind::InvalidData, "Bad value")].into();

        assert_eq!(err.kinds(), vec![ErrorKind::InvalidData]);
        assert!(err.backtrace().is_some());
    }

    #[test]
    fn grouped_errors_flatten_kinds() {
        let err: EtlError = vec![
            etl_error!(ErrorKind::StoreWriteFailed, "Write failed"),
            etl_error!(ErrorKind::InvalidState, "Bad state"),
        ]
        .into();

        assert_eq!(err.kind(), ErrorKind::StoreWriteFailed);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::StoreWriteFailed, ErrorKind::InvalidState]
        );
        assert!(err.backtrace().is_none());

        let rendered = err.to_string();
        assert!(rendered.starts_with("2 errors ("));
        assert!(rendered.contains("\n  #2\n    InvalidState: Bad state"));
    }

    #[test]
    fn wrapped_errors_expose_their_source() {
        let err = EtlError::from(std::io::Error::other("disk full"));

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.detail(), Some("disk full"));
        assert_eq!(
            error::Error::source(&err).map(ToString::to_string),
            Some("disk full".to_string())
        );
    }

    #[test]
    fn integer_range_errors_are_conversions() {
        let overflow = u8::try_from(300i32).unwrap_err();
        let err = EtlError::from(overflow);

        assert_eq!(err.kind(), ErrorKind::ConversionError);
        assert!(err.detail().is_some());
    }

    #[test]
    fn bail_returns_early_with_kind() {
        fn fails() -> EtlResult<()> {
            bail!(ErrorKind::ConfigError, "Invalid configuration", detail = "x".to_string());
        }

        let err = fails().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert_eq!(err.detail(), Some("x"));
    }

    #[test]
    fn sqlstates_map_to_kinds() {
        assert_eq!(classify_sqlstate("23505").0, ErrorKind::ConstraintViolation);
        assert_eq!(classify_sqlstate("42P01").0, ErrorKind::MissingTable);
        assert_eq!(classify_sqlstate("42601").0, ErrorKind::StoreQueryFailed);
        assert_eq!(classify_sqlstate("08006").0, ErrorKind::StoreConnectionFailed);
        assert_eq!(classify_sqlstate("28P01").0, ErrorKind::AuthenticationError);
        assert_eq!(classify_sqlstate("ZZ000").0, ErrorKind::StoreQueryFailed);
        assert_eq!(classify_sqlstate("X").0, ErrorKind::StoreQueryFailed);
    }
}
