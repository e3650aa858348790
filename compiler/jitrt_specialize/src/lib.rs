//! Shape and value specialization of kernels.
//!
//! Given a generic kernel and the arguments of one call, the engine narrows
//! the kernel's declared operand types to the observed shapes, records
//! symbolic dimensions as argument metadata, and optionally sinks small
//! integer arguments into the body as constants.
//!
//! # Pipeline
//!
//! ```text
//! arguments + SymbolicShape + ArgumentConstraint
//!     -> specialize operand types (verify against the declared type first)
//!     -> rewrite signature and entry block arguments
//!     -> attach `rt.symbolic_shape` metadata
//!     -> sink `Value`-constrained arguments as constants
//!     -> notify the SpecializationListener
//! ```
//!
//! The kernel is mutated in place through `&mut Kernel`. On error the kernel
//! may be partially rewritten and must be discarded by the caller.
//!
//! # Tracing
//!
//! Call [`init_tracing`] to install a subscriber. Enable with
//! `RUST_LOG=jitrt_specialize=debug` (per-call summary) or
//! `RUST_LOG=jitrt_specialize=trace` (per-operand detail).

mod constraint;
mod error;
mod listener;
mod specialize;
mod symbolic_shape;

use std::sync::Once;

pub use constraint::{
    argument_constraints, resolve_argument_constraint, supports_value_specialization,
    ArgumentConstraint, ConstraintError,
};
pub use error::SpecializationError;
pub use listener::SpecializationListener;
pub use specialize::specialize_function;
pub use symbolic_shape::SymbolicShape;

/// Argument attribute names read and written by the engine.
pub mod attrs {
    /// String attribute holding an [`ArgumentConstraint`](crate::ArgumentConstraint).
    pub const CONSTRAINT: &str = "rt.constraint";

    /// `tensor<N x i64>` attribute holding an argument's raw symbolic shape.
    pub const SYMBOLIC_SHAPE: &str = "rt.symbolic_shape";
}

static TRACING_INIT: Once = Once::new();

/// Initialize the tracing subscriber.
///
/// Call this once at startup. Safe to call multiple times.
/// Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
