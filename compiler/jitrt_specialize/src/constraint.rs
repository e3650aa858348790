//! Per-argument specialization constraints.
//!
//! A kernel author marks arguments whose shape or value the generated code
//! depends on with an `rt.constraint` attribute. Constraints that the
//! declared type already satisfies resolve to
//! [`ArgumentConstraint::Resolved`], so only the ones that still require
//! specialization reach the engine.

use std::fmt;
use std::str::FromStr;

use jitrt_ir::{HostType, Kernel};

use crate::{attrs, SpecializationError};

/// How a kernel argument must be specialized before compilation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ArgumentConstraint {
    /// No specialization required.
    #[default]
    Resolved,
    /// Specialize to the argument's rank.
    Rank,
    /// Specialize to the argument's full shape.
    Shape,
    /// Sink the argument's value into the body as a constant.
    Value,
}

impl ArgumentConstraint {
    pub fn as_str(self) -> &'static str {
        match self {
            ArgumentConstraint::Resolved => "resolved",
            ArgumentConstraint::Rank => "rank",
            ArgumentConstraint::Shape => "shape",
            ArgumentConstraint::Value => "value",
        }
    }
}

impl fmt::Display for ArgumentConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only constraints a kernel author can write are accepted; `resolved` is
/// an output of resolution.
impl FromStr for ArgumentConstraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rank" => Ok(ArgumentConstraint::Rank),
            "shape" => Ok(ArgumentConstraint::Shape),
            "value" => Ok(ArgumentConstraint::Value),
            _ => Err(ConstraintError::Unknown(s.to_owned())),
        }
    }
}

/// A constraint that cannot be parsed or can never be satisfied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintError {
    /// Attribute value is not a constraint name.
    Unknown(String),
    /// Constraint on an operand that is not a tensor or memref.
    UnsupportedOperand {
        constraint: ArgumentConstraint,
        ty: HostType,
    },
    /// `value` constraint on a type that cannot be sunk.
    CannotSink(HostType),
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintError::Unknown(value) => write!(f, "unknown operand constraint: {value}"),
            ConstraintError::UnsupportedOperand { constraint, ty } => {
                write!(f, "unsupported operand type for {constraint} constraint: {ty}")
            }
            ConstraintError::CannotSink(ty) => write!(f, "cannot sink operand type: {ty}"),
        }
    }
}

impl std::error::Error for ConstraintError {}

/// Returns `true` if values of type `ty` can be sunk into a kernel body.
///
/// Only small integer tensors qualify: a ranked tensor of rank 0 or 1 with
/// signless `i32` or `i64` elements. The extent may be dynamic; the sunk
/// constant takes its size from the call's buffer.
pub fn supports_value_specialization(ty: &HostType) -> bool {
    let HostType::RankedTensor { shape, element } = ty else {
        return false;
    };
    shape.len() <= 1 && (element.is_signless_integer(32) || element.is_signless_integer(64))
}

/// Drop a constraint that the declared operand type already satisfies.
pub fn resolve_argument_constraint(
    constraint: ArgumentConstraint,
    ty: &HostType,
) -> Result<ArgumentConstraint, ConstraintError> {
    if constraint == ArgumentConstraint::Resolved {
        return Ok(constraint);
    }

    if !ty.is_shaped() {
        return Err(ConstraintError::UnsupportedOperand {
            constraint,
            ty: ty.clone(),
        });
    }

    match constraint {
        ArgumentConstraint::Rank if ty.has_rank() => Ok(ArgumentConstraint::Resolved),
        ArgumentConstraint::Shape if ty.has_static_shape() => Ok(ArgumentConstraint::Resolved),
        ArgumentConstraint::Value if !supports_value_specialization(ty) => {
            Err(ConstraintError::CannotSink(ty.clone()))
        }
        _ => Ok(constraint),
    }
}

/// Read and resolve the `rt.constraint` attribute of every argument.
///
/// Arguments without the attribute are [`ArgumentConstraint::Resolved`].
pub fn argument_constraints(kernel: &Kernel) -> Result<Vec<ArgumentConstraint>, SpecializationError> {
    kernel
        .function_type()
        .inputs()
        .iter()
        .enumerate()
        .map(|(index, ty)| {
            let attr = kernel
                .arg_attrs(index)
                .and_then(|dict| dict.get(attrs::CONSTRAINT));
            let Some(attr) = attr else {
                return Ok(ArgumentConstraint::Resolved);
            };
            let constraint = match attr.as_str() {
                Some(name) => name.parse::<ArgumentConstraint>(),
                None => Err(ConstraintError::Unknown(attr.to_string())),
            };
            constraint
                .and_then(|constraint| resolve_argument_constraint(constraint, ty))
                .map_err(|source| SpecializationError::Constraint { index, source })
        })
        .collect()
}
