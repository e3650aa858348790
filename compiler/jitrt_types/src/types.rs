//! Runtime operand and result types.
//!
//! [`Type`] is a closed sum: the variant is fixed at construction and
//! decides which down-cast succeeds. Types are deliberately not `Clone`.
//! Each one is owned by exactly one [`FunctionType`] (or by the
//! [`AsyncValueType`] that wraps it) and dropped with its owner.

use std::fmt;

use jitrt_ir::{write_shape, HostFunctionType, HostType, DYNAMIC_SIZE};
use smallvec::SmallVec;

use crate::{convert_element_type, ConversionError, DType};

/// Discriminant of a runtime [`Type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    AsyncToken,
    AsyncValue,
    RankedTensor,
    UnrankedTensor,
    Memref,
    UnrankedMemref,
    KernelContext,
}

// ── Variant payloads ────────────────────────────────────────────────

/// `!async.value<T>`: owns its value type.
#[derive(Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct AsyncValueType {
    value_type: Box<Type>,
}

impl AsyncValueType {
    pub fn new(value_type: Type) -> Self {
        AsyncValueType {
            value_type: Box::new(value_type),
        }
    }

    pub fn value_type(&self) -> &Type {
        &self.value_type
    }
}

/// `tensor<2x?xf32>`
#[derive(Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedTensorType {
    sizes: SmallVec<[i64; 4]>,
    element_type: DType,
}

impl RankedTensorType {
    /// Same sentinel the host uses for an unknown extent.
    pub const DYNAMIC_SIZE: i64 = DYNAMIC_SIZE;

    pub fn new(sizes: &[i64], element_type: DType) -> Self {
        RankedTensorType {
            sizes: SmallVec::from_slice(sizes),
            element_type,
        }
    }

    pub fn sizes(&self) -> &[i64] {
        &self.sizes
    }

    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    pub fn element_type(&self) -> DType {
        self.element_type
    }
}

/// `tensor<*xf32>`
#[derive(Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct UnrankedTensorType {
    element_type: DType,
}

impl UnrankedTensorType {
    pub fn new(element_type: DType) -> Self {
        UnrankedTensorType { element_type }
    }

    pub fn element_type(&self) -> DType {
        self.element_type
    }
}

/// `memref<2x?xf32>`
#[derive(Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct MemrefType {
    sizes: SmallVec<[i64; 4]>,
    element_type: DType,
}

impl MemrefType {
    /// Same sentinel the host uses for an unknown extent.
    pub const DYNAMIC_SIZE: i64 = DYNAMIC_SIZE;

    pub fn new(sizes: &[i64], element_type: DType) -> Self {
        MemrefType {
            sizes: SmallVec::from_slice(sizes),
            element_type,
        }
    }

    pub fn sizes(&self) -> &[i64] {
        &self.sizes
    }

    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    pub fn element_type(&self) -> DType {
        self.element_type
    }
}

/// `memref<*xf32>`
#[derive(Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct UnrankedMemrefType {
    element_type: DType,
}

impl UnrankedMemrefType {
    pub fn new(element_type: DType) -> Self {
        UnrankedMemrefType { element_type }
    }

    pub fn element_type(&self) -> DType {
        self.element_type
    }
}

// ── Type ────────────────────────────────────────────────────────────

/// A kernel operand or result type at runtime.
#[derive(Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    AsyncToken,
    AsyncValue(AsyncValueType),
    RankedTensor(RankedTensorType),
    UnrankedTensor(UnrankedTensorType),
    Memref(MemrefType),
    UnrankedMemref(UnrankedMemrefType),
    /// Opaque handle to the runtime's kernel context.
    KernelContext,
}

impl Type {
    pub fn kind(&self) -> TypeKind {
        match self {
            Type::AsyncToken => TypeKind::AsyncToken,
            Type::AsyncValue(_) => TypeKind::AsyncValue,
            Type::RankedTensor(_) => TypeKind::RankedTensor,
            Type::UnrankedTensor(_) => TypeKind::UnrankedTensor,
            Type::Memref(_) => TypeKind::Memref,
            Type::UnrankedMemref(_) => TypeKind::UnrankedMemref,
            Type::KernelContext => TypeKind::KernelContext,
        }
    }

    pub fn as_async_value(&self) -> Option<&AsyncValueType> {
        match self {
            Type::AsyncValue(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_ranked_tensor(&self) -> Option<&RankedTensorType> {
        match self {
            Type::RankedTensor(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_unranked_tensor(&self) -> Option<&UnrankedTensorType> {
        match self {
            Type::UnrankedTensor(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_memref(&self) -> Option<&MemrefType> {
        match self {
            Type::Memref(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_unranked_memref(&self) -> Option<&UnrankedMemrefType> {
        match self {
            Type::UnrankedMemref(ty) => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::AsyncToken => f.write_str("!async.token"),
            Type::AsyncValue(ty) => write!(f, "!async.value<{}>", ty.value_type()),
            Type::RankedTensor(ty) => {
                f.write_str("tensor<")?;
                write_shape(f, ty.sizes())?;
                write!(f, "{}>", ty.element_type())
            }
            Type::UnrankedTensor(ty) => write!(f, "tensor<*x{}>", ty.element_type()),
            Type::Memref(ty) => {
                f.write_str("memref<")?;
                write_shape(f, ty.sizes())?;
                write!(f, "{}>", ty.element_type())
            }
            Type::UnrankedMemref(ty) => write!(f, "memref<*x{}>", ty.element_type()),
            Type::KernelContext => f.write_str("!rt.kernel_context"),
        }
    }
}

/// Convert a host type to its runtime counterpart.
///
/// Supports async tokens and values, ranked and unranked tensors and
/// memrefs, and the kernel context. Everything else (including bare
/// scalars) is an [`ConversionError::UnsupportedType`].
pub fn convert_type(ty: &HostType) -> Result<Type, ConversionError> {
    match ty {
        HostType::AsyncToken => Ok(Type::AsyncToken),
        HostType::AsyncValue(inner) => Ok(Type::AsyncValue(AsyncValueType::new(convert_type(
            inner,
        )?))),
        HostType::RankedTensor { shape, element } => Ok(Type::RankedTensor(
            RankedTensorType::new(shape, convert_element_type(element)?),
        )),
        HostType::UnrankedTensor { element } => Ok(Type::UnrankedTensor(
            UnrankedTensorType::new(convert_element_type(element)?),
        )),
        HostType::MemRef { shape, element } => Ok(Type::Memref(MemrefType::new(
            shape,
            convert_element_type(element)?,
        ))),
        HostType::UnrankedMemRef { element } => Ok(Type::UnrankedMemref(
            UnrankedMemrefType::new(convert_element_type(element)?),
        )),
        HostType::KernelContext => Ok(Type::KernelContext),
        _ => Err(ConversionError::UnsupportedType(ty.clone())),
    }
}

// ── Function type ───────────────────────────────────────────────────

/// A compiled kernel's signature.
#[derive(Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionType {
    operands: Vec<Type>,
    results: Vec<Type>,
}

impl FunctionType {
    pub fn new(operands: Vec<Type>, results: Vec<Type>) -> Self {
        FunctionType { operands, results }
    }

    /// Convert a host signature. Fails on the first operand or result
    /// without a runtime counterpart.
    pub fn convert(ty: &HostFunctionType) -> Result<Self, ConversionError> {
        let operands = ty
            .inputs()
            .iter()
            .map(convert_type)
            .collect::<Result<Vec<_>, _>>()?;
        let results = ty
            .results()
            .iter()
            .map(convert_type)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FunctionType { operands, results })
    }

    pub fn operand(&self, index: usize) -> Option<&Type> {
        self.operands.get(index)
    }

    pub fn result(&self, index: usize) -> Option<&Type> {
        self.results.get(index)
    }

    pub fn operands(&self) -> &[Type] {
        &self.operands
    }

    pub fn results(&self) -> &[Type] {
        &self.results
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    pub fn num_results(&self) -> usize {
        self.results.len()
    }
}

fn write_type_list(f: &mut fmt::Formatter<'_>, types: &[Type]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        write_type_list(f, &self.operands)?;
        f.write_str(") -> (")?;
        write_type_list(f, &self.results)?;
        f.write_str(")")
    }
}
