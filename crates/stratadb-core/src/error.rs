use crate::{
    codec::CodecError,
    cursor::CursorError,
    filter::{FilterError, ParseError},
    model::InvalidProperty,
    store::FetchError,
    value::ValueError,
};
use std::fmt;

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Malformed,
    InvalidProperty,
    TypeMismatch,
    MissingValue,
    Corruption,
    Fetch,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Malformed => "malformed",
            Self::InvalidProperty => "invalid_property",
            Self::TypeMismatch => "type_mismatch",
            Self::MissingValue => "missing_value",
            Self::Corruption => "corruption",
            Self::Fetch => "fetch",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Filter,
    Parse,
    Value,
    Codec,
    Cursor,
    Store,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Filter => "filter",
            Self::Parse => "parse",
            Self::Value => "value",
            Self::Codec => "codec",
            Self::Cursor => "cursor",
            Self::Store => "store",
        };
        write!(f, "{label}")
    }
}

/// Classified error surface shared by every module-level error type.
///
/// Callers that do not dispatch on concrete variants can still route and
/// report through `(origin, class)` pairs.
pub trait Classified {
    fn class(&self) -> ErrorClass;
    fn origin(&self) -> ErrorOrigin;

    fn display_with_class(&self) -> String
    where
        Self: fmt::Display,
    {
        format!("{}:{}: {self}", self.origin(), self.class())
    }
}

impl Classified for FilterError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Property(err) => err.class(),
            Self::Value(err) => err.class(),
            Self::Parse(err) => err.class(),
            Self::MixedRecordTypes { .. }
            | Self::NotAJoinChain { .. }
            | Self::SubFilterRecordMismatch { .. } => ErrorClass::InvalidProperty,
            Self::NotBound | Self::NoBlankParameter | Self::InvariantViolation { .. } => {
                ErrorClass::InvariantViolation
            }
            Self::MissingValue { .. } => ErrorClass::MissingValue,
        }
    }

    fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Parse(err) => err.origin(),
            Self::Value(err) => err.origin(),
            _ => ErrorOrigin::Filter,
        }
    }
}

impl Classified for ParseError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Malformed
    }

    fn origin(&self) -> ErrorOrigin {
        ErrorOrigin::Parse
    }
}

impl Classified for InvalidProperty {
    fn class(&self) -> ErrorClass {
        ErrorClass::InvalidProperty
    }

    fn origin(&self) -> ErrorOrigin {
        ErrorOrigin::Filter
    }
}

impl Classified for ValueError {
    fn class(&self) -> ErrorClass {
        ErrorClass::TypeMismatch
    }

    fn origin(&self) -> ErrorOrigin {
        ErrorOrigin::Value
    }
}

impl Classified for CodecError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Corrupt { .. } | Self::Truncated { .. } | Self::GenerationMismatch { .. } => {
                ErrorClass::Corruption
            }
            Self::Unsupported { .. } | Self::GenerationRange { .. } => ErrorClass::Unsupported,
            Self::ColumnMismatch { .. } | Self::NullColumn { .. } => ErrorClass::TypeMismatch,
            Self::ColumnCount { .. } => ErrorClass::InvariantViolation,
        }
    }

    fn origin(&self) -> ErrorOrigin {
        ErrorOrigin::Codec
    }
}

impl Classified for FetchError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Fetch
    }

    fn origin(&self) -> ErrorOrigin {
        ErrorOrigin::Store
    }
}

impl Classified for CursorError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Fetch(err) => err.class(),
            Self::ExclusiveUnbounded | Self::NoCurrent => ErrorClass::InvariantViolation,
        }
    }

    fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Fetch(err) => err.origin(),
            _ => ErrorOrigin::Cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Classified, ErrorClass, ErrorOrigin};
    use crate::{codec::CodecError, store::FetchError};

    #[test]
    fn classification_labels_are_stable() {
        let corrupt = CodecError::corrupt("bad byte");
        assert_eq!(corrupt.class(), ErrorClass::Corruption);
        assert_eq!(corrupt.origin(), ErrorOrigin::Codec);
        assert_eq!(corrupt.display_with_class(), "codec:corruption: corrupt encoding: bad byte");

        let fetch = FetchError::new("backend gone");
        assert_eq!(fetch.class(), ErrorClass::Fetch);
        assert_eq!(fetch.display_with_class(), "store:fetch: fetch failed: backend gone");
    }
}
