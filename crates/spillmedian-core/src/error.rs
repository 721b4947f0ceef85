use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// Every failure inside the core surfaces as one of these and aborts the
/// aggregation group it was raised for.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `class`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without structured detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    // Attach structured detail to an already-classified error.
    fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// No total order is registered for the declared value type.
    pub fn unsupported_type(type_label: impl Into<String>) -> Self {
        let type_label = type_label.into();

        Self::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Compare,
            format!("could not get less-than operator for type {type_label}"),
        )
        .with_detail(ErrorDetail::UnsupportedType { type_label })
    }

    /// A non-null value does not belong to the type the accumulator was bound to.
    pub(crate) fn type_mismatch(expected: &str, found: impl fmt::Debug) -> Self {
        Self::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Accumulator,
            format!("value {found:?} does not match declared type {expected}"),
        )
    }

    /// Construct a sort-origin error from structured sorter detail.
    pub(crate) fn sort(err: SortError) -> Self {
        let class = err.class();

        Self::new(class, ErrorOrigin::Sort, err.to_string()).with_detail(ErrorDetail::Sort(err))
    }

    /// Construct a selector-origin invariant violation.
    pub(crate) fn selector_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Selector,
            message.into(),
        )
    }

    /// Construct a sort-origin invariant violation.
    pub(crate) fn sort_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Sort,
            message.into(),
        )
    }

    /// Construct a spill-origin corruption error.
    pub(crate) fn spill_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Spill, message.into())
    }

    /// Construct a spill-origin I/O error.
    pub(crate) fn spill_io(context: &str, err: &std::io::Error) -> Self {
        Self::new(
            ErrorClass::Io,
            ErrorOrigin::Spill,
            format!("{context}: {err}"),
        )
    }

    /// Construct a spill-origin internal error.
    pub(crate) fn spill_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Spill, message.into())
    }

    /// Construct a serialize-origin internal error.
    pub(crate) fn serialize_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Serialize, message.into())
    }

    /// Construct a config-origin error for an invalid setting.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Config, message.into())
    }

    /// Structured sorter detail, if this error came from the sorter.
    #[must_use]
    pub const fn sort_error(&self) -> Option<&SortError> {
        match &self.detail {
            Some(ErrorDetail::Sort(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_unsupported_type(&self) -> bool {
        matches!(self.detail, Some(ErrorDetail::UnsupportedType { .. }))
    }

    /// Fatal errors abort the aggregation and indicate a defect or corrupted
    /// storage. Unsupported input only aborts the one group it was raised for.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self.class, ErrorClass::Unsupported)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, class-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Sort(SortError),

    #[error("unsupported type: {type_label}")]
    UnsupportedType { type_label: String },
}

///
/// SortError
///
/// Sorter state-machine and cursor failures.
/// Never returned directly; always wrapped in [`ErrorDetail::Sort`].
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SortError {
    #[error("could not advance {requested} slots, only {remaining} remain")]
    OutOfRange { requested: u64, remaining: u64 },

    #[error("sorted sequence is exhausted")]
    Exhausted,

    #[error("sorter no longer accepts values")]
    NotAccepting,

    #[error("sorter has not been sorted yet")]
    NotSorted,
}

impl SortError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::OutOfRange { .. } => ErrorClass::OutOfRange,
            Self::Exhausted => ErrorClass::Exhausted,
            Self::NotAccepting | Self::NotSorted => ErrorClass::Misuse,
        }
    }
}

impl From<SortError> for InternalError {
    fn from(err: SortError) -> Self {
        Self::sort(err)
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Unsupported,
    OutOfRange,
    Exhausted,
    InvariantViolation,
    Misuse,
    Corruption,
    Io,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unsupported => "unsupported",
            Self::OutOfRange => "out_of_range",
            Self::Exhausted => "exhausted",
            Self::InvariantViolation => "invariant_violation",
            Self::Misuse => "misuse",
            Self::Corruption => "corruption",
            Self::Io => "io",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Compare,
    Sort,
    Spill,
    Serialize,
    Accumulator,
    Selector,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Compare => "compare",
            Self::Sort => "sort",
            Self::Spill => "spill",
            Self::Serialize => "serialize",
            Self::Accumulator => "accumulator",
            Self::Selector => "selector",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
