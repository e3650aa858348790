//! Host compiler surface for the JIT runtime.
//!
//! This crate contains the value-semantic data structures the specialization
//! layer drives when it rewrites a kernel:
//!
//! - **Host types** ([`HostType`], [`HostFunctionType`]): the compiler-side
//!   type system kernels are declared in, including the [`DYNAMIC_SIZE`]
//!   sentinel for unknown extents
//! - **Textual syntax** ([`HostType::parse`]): MLIR-flavoured type syntax,
//!   printed back by `Display`
//! - **Attributes** ([`Attribute`], [`DenseElementsAttr`], [`AttrDict`]):
//!   argument metadata and compile-time constant payloads
//! - **Kernel IR** ([`Kernel`], [`Operation`], [`ValueId`]): a single entry
//!   block with arguments and an ordered list of operations, plus the
//!   mutation primitives used by specialization
//!
//! # Design
//!
//! Host types are plain values (`Clone + Eq + Hash`). Nothing in this crate
//! is tied to a context object, so a kernel can be handed to another thread
//! together with everything it references.

mod attr;
mod kernel;
mod parse;
mod types;

pub use attr::{AttrDict, Attribute, DenseElementsAttr, DenseValues, NamedAttr};
pub use kernel::{InsertPoint, IrError, Kernel, OpId, OpKind, Operation, ValueDef, ValueId};
pub use parse::{ParseErrorKind, ParseTypeError, MAX_TYPE_NESTING};
pub use types::{
    is_dynamic, write_shape, FloatKind, HostFunctionType, HostType, Shape, Signedness,
    DYNAMIC_SIZE,
};
