//! Runtime element types.

use std::fmt;

use jitrt_ir::{FloatKind, HostType, Signedness};

use crate::ConversionError;

/// Element type of a runtime buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum DType {
    I1,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    BF16,
    F32,
    F64,
    /// `complex<f32>`
    Complex64,
    /// `complex<f64>`
    Complex128,
}

impl DType {
    /// Storage size of one element in bytes. `i1` occupies a full byte.
    pub fn byte_width(self) -> usize {
        match self {
            DType::I1 | DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 | DType::F16 | DType::BF16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 | DType::Complex64 => 8,
            DType::Complex128 => 16,
        }
    }

    /// The host spelling of this element type.
    pub fn name(self) -> &'static str {
        match self {
            DType::I1 => "i1",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "ui8",
            DType::U16 => "ui16",
            DType::U32 => "ui32",
            DType::U64 => "ui64",
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::Complex64 => "complex<f32>",
            DType::Complex128 => "complex<f64>",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert a host element type to its runtime [`DType`].
///
/// Signless integers map to `i*`, unsigned integers to `ui*`. Signed
/// (`si*`) integers, `index`, `none`, and every non-element type are
/// rejected.
pub fn convert_element_type(ty: &HostType) -> Result<DType, ConversionError> {
    let unsupported = || ConversionError::UnsupportedElementType(ty.clone());
    match ty {
        HostType::Integer {
            width,
            signedness: Signedness::Signless,
        } => match width {
            1 => Ok(DType::I1),
            8 => Ok(DType::I8),
            16 => Ok(DType::I16),
            32 => Ok(DType::I32),
            64 => Ok(DType::I64),
            _ => Err(unsupported()),
        },
        HostType::Integer {
            width,
            signedness: Signedness::Unsigned,
        } => match width {
            8 => Ok(DType::U8),
            16 => Ok(DType::U16),
            32 => Ok(DType::U32),
            64 => Ok(DType::U64),
            _ => Err(unsupported()),
        },
        HostType::Float(kind) => Ok(match kind {
            FloatKind::F16 => DType::F16,
            FloatKind::BF16 => DType::BF16,
            FloatKind::F32 => DType::F32,
            FloatKind::F64 => DType::F64,
        }),
        HostType::Complex(element) => match element.as_ref() {
            HostType::Float(FloatKind::F32) => Ok(DType::Complex64),
            HostType::Float(FloatKind::F64) => Ok(DType::Complex128),
            _ => Err(unsupported()),
        },
        _ => Err(unsupported()),
    }
}
