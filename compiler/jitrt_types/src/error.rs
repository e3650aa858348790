//! Conversion error types.

use std::fmt;

use jitrt_ir::HostType;

/// A host type with no runtime counterpart.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConversionError {
    /// Element type of a shaped type (or an async value payload) that has no
    /// [`DType`](crate::DType).
    UnsupportedElementType(HostType),
    /// Operand or result type outside the runtime type model.
    UnsupportedType(HostType),
}

impl ConversionError {
    /// The host type that failed to convert.
    pub fn host_type(&self) -> &HostType {
        match self {
            ConversionError::UnsupportedElementType(ty) | ConversionError::UnsupportedType(ty) => ty,
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::UnsupportedElementType(ty) => {
                write!(f, "unsupported element type: {ty}")
            }
            ConversionError::UnsupportedType(ty) => write!(f, "unsupported type: {ty}"),
        }
    }
}

impl std::error::Error for ConversionError {}
