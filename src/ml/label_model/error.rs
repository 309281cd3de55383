use std::fmt;

use thiserror::Error;

/// Named parameter slots held by the [`ParameterStore`](super::ParameterStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Class-conditional accuracies `mu` (`k x c`).
    Mu,
    /// Diagonal of the class-balance matrix `P` (`c`).
    ClassBalance,
    /// Structural mask over the residual (`k x k`).
    Mask,
    /// Observed second-moment matrix `O` (`k x k`).
    SecondMoment,
    /// Gradient-descent step size.
    LearningRate,
}

impl Parameter {
    /// Stable short name, also used as the persisted key.
    pub fn name(self) -> &'static str {
        match self {
            Parameter::Mu => "mu",
            Parameter::ClassBalance => "P",
            Parameter::Mask => "mask",
            Parameter::SecondMoment => "O",
            Parameter::LearningRate => "lr",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by label model operations.
///
/// Every operation validates its inputs before touching the store, so an error always
/// leaves the prior state intact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelModelError {
    /// Operand dimensions disagree with a bound parameter, or an aggregation got no rows.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    Shape {
        context: &'static str,
        expected: String,
        actual: String,
    },
    /// A parameter was read before any assignment bound it.
    #[error("Parameter {0} is not bound")]
    Unbound(Parameter),
    /// Non-finite values reached a computation that the clamp cannot protect.
    #[error("Non-finite values in {context}")]
    NumericInstability { context: &'static str },
    /// A scalar argument is outside its valid range.
    #[error("Invalid argument for {context}: {reason}")]
    InvalidArgument {
        context: &'static str,
        reason: String,
    },
}

impl LabelModelError {
    pub(crate) fn shape(
        context: &'static str,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        LabelModelError::Shape {
            context,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn invalid(context: &'static str, reason: impl Into<String>) -> Self {
        LabelModelError::InvalidArgument {
            context,
            reason: reason.into(),
        }
    }
}

/// Format a 2-D shape the way error messages print it.
pub(crate) fn dims(rows: usize, cols: usize) -> String {
    format!("{rows}x{cols}")
}
