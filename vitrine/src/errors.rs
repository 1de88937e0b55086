use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for engine operations.
///
/// Kinds fall into two classes. Client-input kinds ([ErrorKind::ValidationError],
/// [ErrorKind::CastError], [ErrorKind::DuplicateKey], [ErrorKind::CycleDetected],
/// [ErrorKind::InvalidOperation], [ErrorKind::NotFound]) describe a problem with what
/// the caller sent. Every other kind is an infrastructure failure and is logged by the
/// repository layer before it is returned.
///
/// # Examples
///
/// ```rust,ignore
/// use vitrine::errors::{VitrineError, ErrorKind, VitrineResult};
///
/// fn example() -> VitrineResult<()> {
///     Err(VitrineError::new("Parent not found", ErrorKind::NotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Client input errors
    /// One or more fields failed schema rules
    ValidationError,
    /// A field received a value of the wrong shape
    CastError,
    /// A uniqueness constraint was violated
    DuplicateKey,
    /// A reparent operation would make a node its own ancestor
    CycleDetected,
    /// The operation is not valid for the given input
    InvalidOperation,
    /// A record required by the operation does not exist
    NotFound,

    // Infrastructure errors
    /// The document store could not be reached or was already closed
    ConnectionError,
    /// Generic failure reported by the document store
    StoreError,
    /// The store did not answer in time
    Timeout,
    /// Part of a batched write failed; the batch may be re-issued as a whole
    PartialWrite,
    /// Error mapping a document to or from a typed record
    ObjectMappingError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl ErrorKind {
    /// Returns `true` for kinds caused by caller input rather than by the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::ValidationError
                | ErrorKind::CastError
                | ErrorKind::DuplicateKey
                | ErrorKind::CycleDetected
                | ErrorKind::InvalidOperation
                | ErrorKind::NotFound
        )
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::CastError => write!(f, "Cast error"),
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::CycleDetected => write!(f, "Cycle detected"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::ConnectionError => write!(f, "Connection error"),
            ErrorKind::StoreError => write!(f, "Store error"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::PartialWrite => write!(f, "Partial write"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// A single field-level failure collected during schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    field: String,
    message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Engine error type.
///
/// `VitrineError` carries a message, an [ErrorKind], an optional cause and, for
/// validation failures, the list of per-field errors. Like the rest of the engine it
/// is cheap to clone so it can be logged and returned at the same time.
///
/// # Examples
///
/// ```rust,ignore
/// use vitrine::errors::{VitrineError, ErrorKind};
///
/// let cause = VitrineError::new("socket closed", ErrorKind::ConnectionError);
/// let err = VitrineError::new_with_cause("find failed", ErrorKind::StoreError, cause);
/// assert!(!err.is_client_error());
/// ```
#[derive(Clone)]
pub struct VitrineError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<VitrineError>>,
    field_errors: Vec<FieldError>,
    backtrace: Arc<Backtrace>,
}

impl VitrineError {
    /// Creates a new `VitrineError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        VitrineError {
            message: message.to_string(),
            error_kind,
            cause: None,
            field_errors: Vec::new(),
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    /// Creates a new `VitrineError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: VitrineError) -> Self {
        VitrineError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            field_errors: Vec::new(),
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    /// Creates a validation error from the collected field errors.
    ///
    /// The message is the join of every per-field message.
    pub fn validation(field_errors: Vec<FieldError>) -> Self {
        let message = field_errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        VitrineError {
            message,
            error_kind: ErrorKind::ValidationError,
            cause: None,
            field_errors,
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    /// Creates a cast error naming the offending field.
    pub fn cast(field: &str, expected: &str) -> Self {
        let message = format!("Cast to {} failed for field \"{}\"", expected, field);
        let mut error = VitrineError::new(&message, ErrorKind::CastError);
        error.field_errors.push(FieldError::new(field, &message));
        error
    }

    /// Creates the stable duplicate-key error, hiding the store's raw wording.
    pub fn duplicate_key(field: &str) -> Self {
        let mut error = VitrineError::new(
            "A record with this value already exists",
            ErrorKind::DuplicateKey,
        );
        error.field_errors.push(FieldError::new(
            field,
            "A record with this value already exists",
        ));
        error
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&VitrineError> {
        self.cause.as_deref()
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    /// Returns `true` when the error is a recoverable client-input problem.
    pub fn is_client_error(&self) -> bool {
        self.error_kind.is_client_error()
    }
}

impl Display for VitrineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for VitrineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}\nCaused by: {:?}", self.error_kind, self.message, cause),
            None => {
                let mut backtrace = (*self.backtrace).clone();
                backtrace.resolve();
                write!(f, "{}: {}\n{:?}", self.error_kind, self.message, backtrace)
            }
        }
    }
}

impl Error for VitrineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for engine operations.
pub type VitrineResult<T> = Result<T, VitrineError>;

impl From<uuid::Error> for VitrineError {
    fn from(err: uuid::Error) -> Self {
        VitrineError::new(&format!("Invalid record id: {}", err), ErrorKind::CastError)
    }
}

impl From<regex::Error> for VitrineError {
    fn from(err: regex::Error) -> Self {
        VitrineError::new(
            &format!("Invalid pattern: {}", err),
            ErrorKind::InvalidOperation,
        )
    }
}

impl From<std::fmt::Error> for VitrineError {
    fn from(err: std::fmt::Error) -> Self {
        VitrineError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for VitrineError {
    fn from(msg: String) -> Self {
        VitrineError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for VitrineError {
    fn from(msg: &str) -> Self {
        VitrineError::new(msg, ErrorKind::InternalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_error_without_cause() {
        let error = VitrineError::new("An error occurred", ErrorKind::StoreError);
        assert_eq!(error.message(), "An error occurred");
        assert_eq!(error.kind(), &ErrorKind::StoreError);
        assert!(error.cause().is_none());
        assert!(error.source().is_none());
    }

    #[test]
    fn new_with_cause_chains_errors() {
        let cause = VitrineError::new("socket closed", ErrorKind::ConnectionError);
        let error = VitrineError::new_with_cause("find failed", ErrorKind::StoreError, cause);
        assert_eq!(error.cause().map(|c| c.message()), Some("socket closed"));
        assert!(error.source().is_some());
        assert!(format!("{:?}", error).contains("Caused by"));
    }

    #[test]
    fn validation_joins_field_messages() {
        let error = VitrineError::validation(vec![
            FieldError::new("name", "Name is required"),
            FieldError::new("slug", "Slug is too long"),
        ]);
        assert_eq!(error.kind(), &ErrorKind::ValidationError);
        assert_eq!(error.message(), "Name is required, Slug is too long");
        assert_eq!(error.field_errors().len(), 2);
        assert!(error.is_client_error());
    }

    #[test]
    fn cast_names_the_field() {
        let error = VitrineError::cast("order", "Int");
        assert_eq!(error.kind(), &ErrorKind::CastError);
        assert!(error.message().contains("\"order\""));
        assert_eq!(error.field_errors()[0].field(), "order");
    }

    #[test]
    fn duplicate_key_uses_stable_message() {
        let error = VitrineError::duplicate_key("slug");
        assert_eq!(error.message(), "A record with this value already exists");
        assert!(error.is_client_error());
    }

    #[test]
    fn infrastructure_kinds_are_not_client_errors() {
        for kind in [
            ErrorKind::ConnectionError,
            ErrorKind::StoreError,
            ErrorKind::Timeout,
            ErrorKind::PartialWrite,
            ErrorKind::ObjectMappingError,
            ErrorKind::InternalError,
        ] {
            assert!(!kind.is_client_error(), "{} should be infrastructure", kind);
        }
    }

    #[test]
    fn uuid_error_converts_to_cast_error() {
        let err = uuid::Uuid::parse_str("not-a-uuid").unwrap_err();
        let error: VitrineError = err.into();
        assert_eq!(error.kind(), &ErrorKind::CastError);
    }
}
