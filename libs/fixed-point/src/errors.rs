//! Error types for 256-bit fixed-point arithmetic
//!
//! Every checked operation in this crate reports failure through
//! [`FixedPointError`] instead of wrapping, saturating, or panicking.

use thiserror::Error;

/// Errors that can occur during fixed-point arithmetic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixedPointError {
    /// Result exceeds the 256-bit range
    #[error("Overflow in fixed-point {operation}")]
    Overflow { operation: &'static str },

    /// Result would be negative for an unsigned value
    #[error("Underflow in fixed-point {operation}")]
    Underflow { operation: &'static str },

    /// Division by zero in fixed-point arithmetic
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Natural logarithm of a non-positive value
    #[error("Invalid ln input: {input} must be positive")]
    InvalidLnInput { input: String },

    /// Exponent too large for the result to fit in a signed 256-bit integer
    #[error("Invalid exp input: {input} exceeds the maximum exponent")]
    InvalidExpInput { input: String },

    /// Unsigned value does not fit in a signed 256-bit integer
    #[error("Unsafe cast to I256: {value} exceeds I256::MAX")]
    UnsafeCastToI256 { value: String },

    /// Signed value is negative and cannot become a fixed-point number
    #[error("Unsafe cast to FixedPoint: {value} is negative")]
    NegativeValue { value: String },

    /// Invalid decimal integer string
    #[error("Invalid decimal string: '{input}' - expected an unsigned integer")]
    InvalidDecimal { input: String },
}

pub type Result<T> = std::result::Result<T, FixedPointError>;
