use std::error;
use std::fmt;

/// Convenient result type for replication operations using [`TickError`] as the error type.
pub type TickResult<T> = Result<T, TickError>;

/// Main error type for replication operations.
///
/// [`TickError`] can represent a single error, an error with additional detail,
/// or multiple aggregated errors, while exposing a unified interface through
/// [`TickError::kind`] and [`TickError::detail`].
#[derive(Debug, Clone)]
pub struct TickError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Error with kind and static description.
    WithDescription(ErrorKind, &'static str),
    /// Error with kind, static description, and dynamic detail.
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    /// Multiple aggregated errors.
    Many(Vec<TickError>),
}

/// Specific categories of errors that can occur during replication.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Connection errors
    SourceConnectionFailed,
    TargetConnectionFailed,

    // Query & execution errors
    SourceQueryFailed,
    TargetQueryFailed,

    // Schema translation & reconciliation errors
    /// Two source fields resolve to the same column name with differing target kinds.
    SchemaConflict,
    /// An existing target column's type differs from the computed type.
    ExistingTableMismatch,
    /// A source field kind has no mapping rule.
    UnsupportedKind,
    MissingRecordType,
    MissingTableDeclaration,

    // Data & transformation errors
    ConversionError,
    InvalidData,

    // Configuration errors
    ConfigError,

    // IO & serialization errors
    IoError,
    SerializationError,
    DeserializationError,

    // State & workflow errors
    InvalidState,
    /// A decode/encode/execute failure inside the streaming loop; fatal for the run.
    StreamingFailed,

    // Unknown / uncategorized
    Unknown,
}

impl TickError {
    /// Creates a [`TickError`] containing multiple aggregated errors.
    pub fn many(errors: Vec<TickError>) -> TickError {
        TickError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors.iter().flat_map(|err| err.kinds()).collect(),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            _ => None,
        }
    }
}

impl PartialEq for TickError {
    fn eq(&self, other: &TickError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;
                f.write_str(" -> ")?;
                detail.fmt(f)
            }
            ErrorRepr::Many(ref errors) => {
                if errors.is_empty() {
                    write!(f, "Multiple errors occurred (empty)")
                } else if errors.len() == 1 {
                    errors[0].fmt(f)
                } else {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

impl error::Error for TickError {}

/// Creates a [`TickError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for TickError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> TickError {
        TickError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

/// Creates a [`TickError`] from an error kind, static description, and dynamic detail.
impl From<(ErrorKind, &'static str, String)> for TickError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> TickError {
        TickError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

/// Creates a [`TickError`] from a vector of errors for aggregation.
impl<E> From<Vec<E>> for TickError
where
    E: Into<TickError>,
{
    fn from(errors: Vec<E>) -> TickError {
        TickError {
            repr: ErrorRepr::Many(errors.into_iter().map(Into::into).collect()),
        }
    }
}

/// Converts [`std::io::Error`] to [`TickError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for TickError {
    fn from(err: std::io::Error) -> TickError {
        TickError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::IoError,
                "I/O error occurred",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`serde_json::Error`] to [`TickError`] with appropriate error kind.
impl From<serde_json::Error> for TickError {
    fn from(err: serde_json::Error) -> TickError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            _ => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        TickError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Converts [`clickhouse::error::Error`] to [`TickError`] with appropriate error kind.
///
/// Network-level failures map to [`ErrorKind::TargetConnectionFailed`], everything
/// else to [`ErrorKind::TargetQueryFailed`].
impl From<clickhouse::error::Error> for TickError {
    fn from(err: clickhouse::error::Error) -> TickError {
        use clickhouse::error::Error as ChError;

        let (kind, description) = match &err {
            ChError::Network(_) | ChError::TimedOut => (
                ErrorKind::TargetConnectionFailed,
                "ClickHouse connection failed",
            ),
            _ => (ErrorKind::TargetQueryFailed, "ClickHouse operation failed"),
        };

        TickError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Converts [`bigdecimal::ParseBigDecimalError`] to [`TickError`] with [`ErrorKind::ConversionError`].
impl From<bigdecimal::ParseBigDecimalError> for TickError {
    fn from(err: bigdecimal::ParseBigDecimalError) -> TickError {
        TickError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ConversionError,
                "Decimal parsing failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`chrono::ParseError`] to [`TickError`] with [`ErrorKind::ConversionError`].
impl From<chrono::ParseError> for TickError {
    fn from(err: chrono::ParseError) -> TickError {
        TickError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ConversionError,
                "Datetime parsing failed",
                err.to_string(),
            ),
        }
    }
}
