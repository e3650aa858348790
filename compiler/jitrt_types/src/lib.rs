//! Runtime type model for compiled kernels.
//!
//! A compiled kernel keeps its signature as a [`FunctionType`] of runtime
//! [`Type`]s rather than host compiler types, so the signature can be cached
//! and moved around without keeping the host compiler's state alive.
//!
//! This crate provides:
//!
//! - **Element types** ([`DType`]) and the conversion from host element types
//! - **Runtime types** ([`Type`], [`TypeKind`], [`FunctionType`]): a closed
//!   set of operand/result types with checked down-casts
//! - **Argument descriptors** ([`MemrefDesc`], [`Argument`]): the per-call
//!   description of strided array buffers and scalar arguments
//! - **Operand verification** ([`verify_memref_operand`] and friends):
//!   checks that a live argument is compatible with a declared operand type
//!
//! # Crate Dependencies
//!
//! `jitrt_types` depends only on `jitrt_ir` (for [`HostType`](jitrt_ir::HostType)
//! and the dynamic-size sentinel).

mod dtype;
mod error;
mod memref;
mod types;
mod verify;

pub use dtype::{convert_element_type, DType};
pub use error::ConversionError;
pub use memref::{Argument, MemrefDesc, ScalarArg};
pub use types::{
    convert_type, AsyncValueType, FunctionType, MemrefType, RankedTensorType, Type, TypeKind,
    UnrankedMemrefType, UnrankedTensorType,
};
pub use verify::{
    verify_arguments, verify_host_operand, verify_memref_operand, verify_ranked_operand,
    verify_unranked_operand, RankedShape, UnrankedShape, VerifyError,
};
