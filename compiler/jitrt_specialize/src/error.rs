//! Specialization errors.

use std::fmt;

use jitrt_ir::{HostType, IrError};
use jitrt_types::VerifyError;

use crate::ConstraintError;

/// Why a kernel could not be specialized to a call's arguments.
///
/// The engine stops at the first error. Variants about one argument carry
/// its index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpecializationError {
    /// The number of arguments, symbolic shapes, or constraints differs
    /// from the number of kernel inputs.
    ArityMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// An argument does not match its declared (pre-specialization) type.
    Verify(VerifyError),
    /// A non-memref argument was given a non-empty symbolic shape.
    UnexpectedSymbolicShape { index: usize, argument: String },
    /// Declared input type is neither a memref nor a tensor.
    UnsupportedInputType { index: usize, ty: HostType },
    /// `Value` constraint on an input type that cannot be sunk.
    NonSinkableOperand { index: usize, ty: HostType },
    /// `Value` constraint on an argument that is not a memref.
    NonSinkableArgument { index: usize, argument: String },
    /// The argument's rank or dtype is not supported for value extraction.
    CannotGetValue { index: usize, ty: HostType },
    /// Invalid `rt.constraint` attribute.
    Constraint {
        index: usize,
        source: ConstraintError,
    },
    /// The kernel body rejected a rewrite.
    Ir(IrError),
}

impl SpecializationError {
    /// Index of the offending argument, if the error is about one argument.
    pub fn index(&self) -> Option<usize> {
        match self {
            SpecializationError::Verify(err) => err.index(),
            SpecializationError::UnexpectedSymbolicShape { index, .. }
            | SpecializationError::UnsupportedInputType { index, .. }
            | SpecializationError::NonSinkableOperand { index, .. }
            | SpecializationError::NonSinkableArgument { index, .. }
            | SpecializationError::CannotGetValue { index, .. }
            | SpecializationError::Constraint { index, .. } => Some(*index),
            SpecializationError::ArityMismatch { .. } | SpecializationError::Ir(_) => None,
        }
    }
}

impl fmt::Display for SpecializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecializationError::ArityMismatch {
                what,
                expected,
                got,
            } => write!(f, "expected {expected} {what}, got {got}"),
            SpecializationError::Verify(err) => write!(f, "{err}"),
            SpecializationError::UnexpectedSymbolicShape { argument, .. } => {
                write!(f, "unexpected symbolic shape for argument: {argument}")
            }
            SpecializationError::UnsupportedInputType { ty, .. } => {
                write!(f, "unsupported input type: {ty}")
            }
            SpecializationError::NonSinkableOperand { ty, .. } => {
                write!(f, "non-sinkable operand was marked for sinking: {ty}")
            }
            SpecializationError::NonSinkableArgument { argument, .. } => {
                write!(f, "non-sinkable argument was marked for sinking: {argument}")
            }
            SpecializationError::CannotGetValue { ty, .. } => {
                write!(f, "cannot get value from argument type: {ty}")
            }
            SpecializationError::Constraint { index, source } => {
                write!(f, "argument #{index}: {source}")
            }
            SpecializationError::Ir(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SpecializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpecializationError::Verify(err) => Some(err),
            SpecializationError::Constraint { source, .. } => Some(source),
            SpecializationError::Ir(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VerifyError> for SpecializationError {
    fn from(err: VerifyError) -> Self {
        SpecializationError::Verify(err)
    }
}

impl From<IrError> for SpecializationError {
    fn from(err: IrError) -> Self {
        SpecializationError::Ir(err)
    }
}
