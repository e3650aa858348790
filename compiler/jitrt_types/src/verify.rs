//! Operand verification.
//!
//! Checks a live [`MemrefDesc`] against a declared operand type. All entry
//! points are pure: they read the descriptor and the type, and allocate
//! only for the error payload.
//!
//! Verification is layered. [`verify_memref_operand`] does the actual work
//! (dtype, then rank, then each concrete dimension); the typed entry points
//! extract a dtype and an optional shape and delegate to it.

use std::fmt;

use jitrt_ir::{is_dynamic, HostType};

use crate::{
    convert_element_type, Argument, ConversionError, DType, FunctionType, MemrefDesc, MemrefType,
    RankedTensorType, Type, UnrankedMemrefType, UnrankedTensorType,
};

/// Mismatch between a live argument and its declared operand type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// Element types differ.
    DtypeMismatch {
        index: usize,
        expected: DType,
        got: DType,
    },
    /// The declared type is ranked and the ranks differ.
    RankMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
    /// A concrete declared dimension differs from the argument's size.
    DimensionMismatch {
        index: usize,
        dim: usize,
        expected: i64,
        got: i64,
    },
    /// The declared element type has no runtime dtype.
    UnsupportedElementType {
        index: usize,
        source: ConversionError,
    },
    /// The declared host type is not a shaped type.
    NotShaped { index: usize, ty: HostType },
    /// A memref-like operand received a scalar.
    ExpectedMemref { index: usize, got: DType },
    /// Wrong number of call arguments.
    NumArguments { expected: usize, got: usize },
}

impl VerifyError {
    /// Index of the offending argument, if the error is about one argument.
    pub fn index(&self) -> Option<usize> {
        match self {
            VerifyError::DtypeMismatch { index, .. }
            | VerifyError::RankMismatch { index, .. }
            | VerifyError::DimensionMismatch { index, .. }
            | VerifyError::UnsupportedElementType { index, .. }
            | VerifyError::NotShaped { index, .. }
            | VerifyError::ExpectedMemref { index, .. } => Some(*index),
            VerifyError::NumArguments { .. } => None,
        }
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::DtypeMismatch {
                index,
                expected,
                got,
            } => write!(
                f,
                "operand #{index} has wrong element type: expected {expected}, got {got}"
            ),
            VerifyError::RankMismatch {
                index,
                expected,
                got,
            } => write!(
                f,
                "operand #{index} has wrong rank: expected {expected}, got {got}"
            ),
            VerifyError::DimensionMismatch {
                index,
                dim,
                expected,
                got,
            } => write!(
                f,
                "operand #{index} has wrong size in dimension #{dim}: expected {expected}, got {got}"
            ),
            VerifyError::UnsupportedElementType { index, source } => {
                write!(f, "operand #{index}: {source}")
            }
            VerifyError::NotShaped { index, ty } => {
                write!(f, "operand #{index} is not a shaped type: {ty}")
            }
            VerifyError::ExpectedMemref { index, got } => {
                write!(f, "operand #{index} expects a memref argument, got a {got} scalar")
            }
            VerifyError::NumArguments { expected, got } => {
                write!(f, "expected {expected} arguments, got {got}")
            }
        }
    }
}

impl std::error::Error for VerifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VerifyError::UnsupportedElementType { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ── Shaped type views ───────────────────────────────────────────────

/// A declared type with a known rank.
pub trait RankedShape {
    fn sizes(&self) -> &[i64];
    fn element_type(&self) -> DType;
}

/// A declared type with an unknown rank.
pub trait UnrankedShape {
    fn element_type(&self) -> DType;
}

impl RankedShape for RankedTensorType {
    fn sizes(&self) -> &[i64] {
        RankedTensorType::sizes(self)
    }

    fn element_type(&self) -> DType {
        RankedTensorType::element_type(self)
    }
}

impl RankedShape for MemrefType {
    fn sizes(&self) -> &[i64] {
        MemrefType::sizes(self)
    }

    fn element_type(&self) -> DType {
        MemrefType::element_type(self)
    }
}

impl UnrankedShape for UnrankedTensorType {
    fn element_type(&self) -> DType {
        UnrankedTensorType::element_type(self)
    }
}

impl UnrankedShape for UnrankedMemrefType {
    fn element_type(&self) -> DType {
        UnrankedMemrefType::element_type(self)
    }
}

// ── Entry points ────────────────────────────────────────────────────

/// Verify `memref` against an element type and, if given, expected sizes.
///
/// Dtypes must match exactly. With `sizes`, the rank must match and every
/// concrete expected size must equal the argument's size at that position;
/// dynamic positions accept any size.
pub fn verify_memref_operand(
    index: usize,
    element_type: DType,
    sizes: Option<&[i64]>,
    memref: &MemrefDesc<'_>,
) -> Result<(), VerifyError> {
    if memref.dtype() != element_type {
        return Err(VerifyError::DtypeMismatch {
            index,
            expected: element_type,
            got: memref.dtype(),
        });
    }

    let Some(sizes) = sizes else {
        return Ok(());
    };

    if memref.rank() != sizes.len() {
        return Err(VerifyError::RankMismatch {
            index,
            expected: sizes.len(),
            got: memref.rank(),
        });
    }

    for (dim, (&expected, &got)) in sizes.iter().zip(memref.sizes()).enumerate() {
        if !is_dynamic(expected) && expected != got {
            return Err(VerifyError::DimensionMismatch {
                index,
                dim,
                expected,
                got,
            });
        }
    }

    Ok(())
}

/// Verify `memref` against a ranked tensor or memref type.
pub fn verify_ranked_operand<T: RankedShape + ?Sized>(
    index: usize,
    ty: &T,
    memref: &MemrefDesc<'_>,
) -> Result<(), VerifyError> {
    verify_memref_operand(index, ty.element_type(), Some(ty.sizes()), memref)
}

/// Verify `memref` against an unranked type. Only the dtype is checked.
pub fn verify_unranked_operand<T: UnrankedShape + ?Sized>(
    index: usize,
    ty: &T,
    memref: &MemrefDesc<'_>,
) -> Result<(), VerifyError> {
    verify_memref_operand(index, ty.element_type(), None, memref)
}

/// Verify `memref` against a host shaped type.
///
/// The host element type is converted first; a conversion failure is
/// reported before any shape check.
pub fn verify_host_operand(
    index: usize,
    ty: &HostType,
    memref: &MemrefDesc<'_>,
) -> Result<(), VerifyError> {
    let Some(element) = ty.element_type() else {
        return Err(VerifyError::NotShaped {
            index,
            ty: ty.clone(),
        });
    };
    let element_type = convert_element_type(element)
        .map_err(|source| VerifyError::UnsupportedElementType { index, source })?;

    // Unranked host types have no shape.
    verify_memref_operand(index, element_type, ty.shape(), memref)
}

/// Validate call arguments against a kernel signature without specializing.
///
/// Memref-like operands need a [`Argument::Memref`] that passes the
/// verifier. Async and kernel context operands accept any argument. The
/// first failure is returned.
pub fn verify_arguments(
    signature: &FunctionType,
    arguments: &[Argument<'_>],
) -> Result<(), VerifyError> {
    if signature.num_operands() != arguments.len() {
        return Err(VerifyError::NumArguments {
            expected: signature.num_operands(),
            got: arguments.len(),
        });
    }

    for (index, (ty, argument)) in signature.operands().iter().zip(arguments).enumerate() {
        let memref = match (ty, argument) {
            (Type::AsyncToken | Type::AsyncValue(_) | Type::KernelContext, _) => continue,
            (_, Argument::Memref(memref)) => memref,
            (_, Argument::Scalar(scalar)) => {
                return Err(VerifyError::ExpectedMemref {
                    index,
                    got: scalar.dtype(),
                })
            }
        };

        match ty {
            Type::RankedTensor(ty) => verify_ranked_operand(index, ty, memref)?,
            Type::Memref(ty) => verify_ranked_operand(index, ty, memref)?,
            Type::UnrankedTensor(ty) => verify_unranked_operand(index, ty, memref)?,
            Type::UnrankedMemref(ty) => verify_unranked_operand(index, ty, memref)?,
            Type::AsyncToken | Type::AsyncValue(_) | Type::KernelContext => {}
        }
    }

    Ok(())
}
