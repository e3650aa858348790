//! Host compiler types.
//!
//! [`HostType`] mirrors the builtin, async, and runtime dialect types a
//! kernel signature can mention. Shaped types (tensors and memrefs) carry a
//! [`Shape`] in which [`DYNAMIC_SIZE`] marks an extent that is unknown at
//! compile time.

use std::fmt;

use smallvec::SmallVec;

/// Sentinel for a dimension whose extent is unknown at compile time.
///
/// Every layer (host types, runtime types, symbolic shape normalization)
/// uses this exact value, so conversions round-trip without ambiguity.
pub const DYNAMIC_SIZE: i64 = -1;

/// Returns `true` if `dim` is the dynamic-size sentinel.
#[inline]
pub fn is_dynamic(dim: i64) -> bool {
    dim == DYNAMIC_SIZE
}

/// Per-dimension sizes of a ranked shaped type.
pub type Shape = SmallVec<[i64; 4]>;

// ── Scalar element kinds ────────────────────────────────────────────

/// Signedness semantics of an integer type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Signedness {
    /// `iN`: no signedness semantics.
    Signless,
    /// `siN`
    Signed,
    /// `uiN`
    Unsigned,
}

/// Floating point formats supported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum FloatKind {
    F16,
    BF16,
    F32,
    F64,
}

impl FloatKind {
    /// The textual keyword for this format.
    pub fn keyword(self) -> &'static str {
        match self {
            FloatKind::F16 => "f16",
            FloatKind::BF16 => "bf16",
            FloatKind::F32 => "f32",
            FloatKind::F64 => "f64",
        }
    }
}

// ── Host types ──────────────────────────────────────────────────────

/// A type in the host compiler's type system.
///
/// Element types (`Integer`, `Float`, `Complex`, `Index`, `None`) may appear
/// inside shaped types. Only a subset of host types has a runtime
/// counterpart; the rest exist so that conversion can reject them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum HostType {
    /// Integer of `width` bits.
    Integer { width: u32, signedness: Signedness },
    /// Floating point scalar.
    Float(FloatKind),
    /// Target-dependent machine index.
    Index,
    /// The unit type `none`.
    None,
    /// Complex number over a floating point element.
    Complex(Box<HostType>),
    /// `tensor<2x?xf32>`
    RankedTensor { shape: Shape, element: Box<HostType> },
    /// `tensor<*xf32>`
    UnrankedTensor { element: Box<HostType> },
    /// `memref<2x?xf32>`
    MemRef { shape: Shape, element: Box<HostType> },
    /// `memref<*xf32>`
    UnrankedMemRef { element: Box<HostType> },
    /// `!async.token`
    AsyncToken,
    /// `!async.value<T>`
    AsyncValue(Box<HostType>),
    /// `!rt.kernel_context`
    KernelContext,
    /// A function signature.
    Function(HostFunctionType),
}

impl HostType {
    /// Signless integer of the given width.
    pub fn int(width: u32) -> Self {
        HostType::Integer {
            width,
            signedness: Signedness::Signless,
        }
    }

    /// Unsigned integer of the given width.
    pub fn uint(width: u32) -> Self {
        HostType::Integer {
            width,
            signedness: Signedness::Unsigned,
        }
    }

    pub fn i32() -> Self {
        Self::int(32)
    }

    pub fn i64() -> Self {
        Self::int(64)
    }

    pub fn f32() -> Self {
        HostType::Float(FloatKind::F32)
    }

    pub fn f64() -> Self {
        HostType::Float(FloatKind::F64)
    }

    /// Ranked tensor over `element`.
    pub fn ranked_tensor(shape: &[i64], element: HostType) -> Self {
        HostType::RankedTensor {
            shape: Shape::from_slice(shape),
            element: Box::new(element),
        }
    }

    /// Unranked tensor over `element`.
    pub fn unranked_tensor(element: HostType) -> Self {
        HostType::UnrankedTensor {
            element: Box::new(element),
        }
    }

    /// Ranked memref over `element`.
    pub fn memref(shape: &[i64], element: HostType) -> Self {
        HostType::MemRef {
            shape: Shape::from_slice(shape),
            element: Box::new(element),
        }
    }

    /// Unranked memref over `element`.
    pub fn unranked_memref(element: HostType) -> Self {
        HostType::UnrankedMemRef {
            element: Box::new(element),
        }
    }

    /// Async value wrapping `inner`.
    pub fn async_value(inner: HostType) -> Self {
        HostType::AsyncValue(Box::new(inner))
    }

    /// Returns `true` for tensors and memrefs, ranked or not.
    pub fn is_shaped(&self) -> bool {
        matches!(
            self,
            HostType::RankedTensor { .. }
                | HostType::UnrankedTensor { .. }
                | HostType::MemRef { .. }
                | HostType::UnrankedMemRef { .. }
        )
    }

    /// Returns `true` for ranked and unranked tensors.
    pub fn is_tensor(&self) -> bool {
        matches!(
            self,
            HostType::RankedTensor { .. } | HostType::UnrankedTensor { .. }
        )
    }

    /// Returns `true` for ranked and unranked memrefs.
    pub fn is_memref(&self) -> bool {
        matches!(
            self,
            HostType::MemRef { .. } | HostType::UnrankedMemRef { .. }
        )
    }

    /// Returns `true` if this is a shaped type with a statically known rank.
    pub fn has_rank(&self) -> bool {
        self.shape().is_some()
    }

    /// Sizes of a ranked shaped type, `None` for everything else.
    pub fn shape(&self) -> Option<&[i64]> {
        match self {
            HostType::RankedTensor { shape, .. } | HostType::MemRef { shape, .. } => {
                Some(shape.as_slice())
            }
            _ => None,
        }
    }

    /// Rank of a ranked shaped type.
    pub fn rank(&self) -> Option<usize> {
        self.shape().map(<[i64]>::len)
    }

    /// Element type of a shaped type.
    pub fn element_type(&self) -> Option<&HostType> {
        match self {
            HostType::RankedTensor { element, .. }
            | HostType::UnrankedTensor { element }
            | HostType::MemRef { element, .. }
            | HostType::UnrankedMemRef { element } => Some(element.as_ref()),
            _ => None,
        }
    }

    /// Returns `true` if this is ranked and no dimension is dynamic.
    pub fn has_static_shape(&self) -> bool {
        self.shape()
            .is_some_and(|shape| shape.iter().all(|&dim| !is_dynamic(dim)))
    }

    /// Returns `true` if this is an integer of exactly `width` bits
    /// (any signedness).
    pub fn is_integer(&self, width: u32) -> bool {
        matches!(self, HostType::Integer { width: w, .. } if *w == width)
    }

    /// Returns `true` if this is a signless integer of exactly `width` bits.
    pub fn is_signless_integer(&self, width: u32) -> bool {
        matches!(
            self,
            HostType::Integer { width: w, signedness: Signedness::Signless } if *w == width
        )
    }

    /// Parse a type from its textual form.
    pub fn parse(source: &str) -> Result<Self, crate::ParseTypeError> {
        crate::parse::parse_type(source)
    }
}

// ── Function types ──────────────────────────────────────────────────

/// Signature of a host function: ordered inputs and results.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct HostFunctionType {
    inputs: Vec<HostType>,
    results: Vec<HostType>,
}

impl HostFunctionType {
    pub fn new(inputs: Vec<HostType>, results: Vec<HostType>) -> Self {
        HostFunctionType { inputs, results }
    }

    pub fn inputs(&self) -> &[HostType] {
        &self.inputs
    }

    pub fn results(&self) -> &[HostType] {
        &self.results
    }

    pub fn input(&self, index: usize) -> Option<&HostType> {
        self.inputs.get(index)
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    /// Parse a function type such as `(tensor<?xf32>, i32) -> tensor<?xf32>`.
    pub fn parse(source: &str) -> Result<Self, crate::ParseTypeError> {
        crate::parse::parse_function_type(source)
    }
}

// ── Printing ────────────────────────────────────────────────────────

/// Write `shape` as `2x?x` (each dimension followed by `x`).
///
/// Shared with the runtime type printer so both layers render shapes the
/// same way.
pub fn write_shape(f: &mut impl fmt::Write, shape: &[i64]) -> fmt::Result {
    for &dim in shape {
        if is_dynamic(dim) {
            f.write_str("?x")?;
        } else {
            write!(f, "{dim}x")?;
        }
    }
    Ok(())
}

fn write_type_list(f: &mut fmt::Formatter<'_>, types: &[HostType]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Integer { width, signedness } => {
                let prefix = match signedness {
                    Signedness::Signless => "i",
                    Signedness::Signed => "si",
                    Signedness::Unsigned => "ui",
                };
                write!(f, "{prefix}{width}")
            }
            HostType::Float(kind) => f.write_str(kind.keyword()),
            HostType::Index => f.write_str("index"),
            HostType::None => f.write_str("none"),
            HostType::Complex(element) => write!(f, "complex<{element}>"),
            HostType::RankedTensor { shape, element } => {
                f.write_str("tensor<")?;
                write_shape(f, shape)?;
                write!(f, "{element}>")
            }
            HostType::UnrankedTensor { element } => write!(f, "tensor<*x{element}>"),
            HostType::MemRef { shape, element } => {
                f.write_str("memref<")?;
                write_shape(f, shape)?;
                write!(f, "{element}>")
            }
            HostType::UnrankedMemRef { element } => write!(f, "memref<*x{element}>"),
            HostType::AsyncToken => f.write_str("!async.token"),
            HostType::AsyncValue(inner) => write!(f, "!async.value<{inner}>"),
            HostType::KernelContext => f.write_str("!rt.kernel_context"),
            HostType::Function(func) => write!(f, "{func}"),
        }
    }
}

impl fmt::Display for HostFunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        write_type_list(f, &self.inputs)?;
        f.write_str(") -> ")?;
        match self.results.as_slice() {
            [single] if !matches!(single, HostType::Function(_)) => write!(f, "{single}"),
            results => {
                f.write_str("(")?;
                write_type_list(f, results)?;
                f.write_str(")")
            }
        }
    }
}
