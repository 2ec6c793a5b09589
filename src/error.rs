//! Error types for formula construction, differentiation and emission

use thiserror::Error;

/// Errors raised by the formula core.
///
/// Every failure is reported synchronously to the caller; no partially built
/// tree is ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Operand dimensions violate the operator's broadcast rule
    #[error("{op}: incompatible dimensions {dims:?}")]
    DimensionMismatch { op: &'static str, dims: Vec<usize> },

    /// The operator has neither a derivative nor a gradient rule for this arity
    #[error("{op}: unsupported for {arity} operand(s)")]
    UnsupportedOperand { op: &'static str, arity: usize },

    /// A sampled input lies outside the operator's declared domain
    #[error("{op}: operand {operand} = {value} outside of domain [{low}, {high}]")]
    DomainViolation {
        op: &'static str,
        operand: usize,
        value: f64,
        low: f64,
        high: f64,
    },

    /// Dimensions are strictly positive
    #[error("{op}: dimension must be positive")]
    InvalidDimension { op: &'static str },

    /// The operator is not finite at zero (e.g. `1 / 0`, `log(0)`)
    #[error("{op}: singular at a zero operand")]
    SingularOperand { op: &'static str },

    /// Wrong number of operands for the operator
    #[error("{op}: expected {expected} argument(s), got {got}")]
    ArgumentCount {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// An optional operand this operation cannot do without
    #[error("{op}: missing {operand}")]
    MissingOperand {
        op: &'static str,
        operand: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, FormulaError>;

impl FormulaError {
    pub(crate) fn mismatch(op: &'static str, dims: impl Into<Vec<usize>>) -> Self {
        FormulaError::DimensionMismatch {
            op,
            dims: dims.into(),
        }
    }
}
