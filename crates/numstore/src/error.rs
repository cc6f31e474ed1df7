//! Error types for the store, the arithmetic layer, and the dispatcher

use crate::decimal::DecimalError;
use thiserror::Error;

/// Errors returned by store mutations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} does not exist")]
    NotFound(String),
}

/// Errors returned by arithmetic on decimal values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("result would have {digits} digits, limit is {limit}")]
    ResultTooLarge { digits: u64, limit: u64 },
}

/// An operand that is neither a live key nor a decimal literal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("params[{position}] error, {token:?} is expired, missing or not a number")]
pub struct OperandError {
    /// Zero-based position of the operand in the request params
    pub position: usize,
    pub token: String,
}

/// Every way a request can fail
///
/// Each variant is rendered into an `ok=false` reply by the dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Bad protocol version, unknown method, or missing params
    #[error("invalid envelope: {0}")]
    EnvelopeInvalid(String),

    /// Create on an existing or numeric-looking name
    #[error("name conflict: {0}")]
    NameConflict(String),

    /// Set or delete on an absent name
    #[error("name not found: {0}")]
    NameNotFound(String),

    #[error(transparent)]
    OperandUnresolvable(#[from] OperandError),

    #[error("division by zero")]
    DivisionByZero,

    /// Result would render beyond the digit limit
    #[error("result too large: {0}")]
    ResultTooLarge(String),

    #[error("invalid literal {literal:?}: {source}")]
    LiteralParseError {
        literal: String,
        source: DecimalError,
    },
}

impl DispatchError {
    /// Stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::EnvelopeInvalid(_) => "EnvelopeInvalid",
            DispatchError::NameConflict(_) => "NameConflict",
            DispatchError::NameNotFound(_) => "NameNotFound",
            DispatchError::OperandUnresolvable(_) => "OperandUnresolvable",
            DispatchError::DivisionByZero => "DivisionByZero",
            DispatchError::ResultTooLarge(_) => "ResultTooLarge",
            DispatchError::LiteralParseError { .. } => "LiteralParseError",
        }
    }

    pub(crate) fn literal(literal: &str, source: DecimalError) -> Self {
        DispatchError::LiteralParseError {
            literal: literal.to_string(),
            source,
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) => DispatchError::NameConflict(err.to_string()),
            StoreError::NotFound(_) => DispatchError::NameNotFound(err.to_string()),
        }
    }
}

impl From<ArithmeticError> for DispatchError {
    fn from(err: ArithmeticError) -> Self {
        match err {
            ArithmeticError::DivisionByZero => DispatchError::DivisionByZero,
            ArithmeticError::ResultTooLarge { .. } => DispatchError::ResultTooLarge(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let err: DispatchError = StoreError::AlreadyExists("ggg".to_string()).into();
        assert_eq!(err, DispatchError::NameConflict("ggg already exists".to_string()));
        assert_eq!(err.to_string(), "name conflict: ggg already exists");

        let err: DispatchError = StoreError::NotFound("hhh".to_string()).into();
        assert_eq!(err.kind(), "NameNotFound");
    }

    #[test]
    fn test_operand_error_message() {
        let err: DispatchError = OperandError {
            position: 1,
            token: "abc".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "OperandUnresolvable");
        assert!(err.to_string().starts_with("params[1] error"));
    }

    #[test]
    fn test_arithmetic_error_mapping() {
        let err: DispatchError = ArithmeticError::ResultTooLarge {
            digits: 2_000_001,
            limit: 100_000,
        }
        .into();
        assert_eq!(err.kind(), "ResultTooLarge");
        assert_eq!(
            err.to_string(),
            "result too large: result would have 2000001 digits, limit is 100000"
        );
    }
}
