//! Error types for 18-decimal fixed-point arithmetic
//!
//! Every failure is a named condition so that callers can tell a trade that is
//! simply too large apart from a malformed input.

use ethers_core::types::U256;
use thiserror::Error;

/// Errors that can occur during fixed-point arithmetic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixedPointError {
    /// Division by zero in fixed-point arithmetic
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// An intermediate product or sum no longer fits in 256 bits
    #[error("Overflow in fixed-point {operation}")]
    Overflow { operation: &'static str },

    /// A subtraction would produce a negative value
    #[error("Underflow in fixed-point {operation}")]
    Underflow { operation: &'static str },

    /// Invalid decimal string format
    #[error("Invalid decimal string: '{input}' - expected non-negative numeric format")]
    InvalidDecimal { input: String },

    /// Base outside the convergence domain of the fractional power series
    #[error("Power base {base} outside series domain [{min}, {max}]")]
    PowerBaseOutOfRange { base: U256, min: U256, max: U256 },
}
