//! The specialization engine.
//!
//! [`specialize_function`] rewrites a kernel in place:
//!
//! 1. Every input type is specialized to its argument. Memref arguments are
//!    verified against the *declared* type first, then the type is rebuilt
//!    with the normalized symbolic shape. Errors here leave the kernel
//!    untouched.
//! 2. The signature is replaced and each entry block argument is swapped for
//!    one of the specialized type, with a `tensor.cast` back to the old type
//!    wherever the two differ. The old arguments are erased once all uses
//!    are redirected.
//! 3. Inputs whose shape is still partly symbolic get an `rt.symbolic_shape`
//!    argument attribute with the raw symbol ids.
//! 4. `Value`-constrained arguments are read out of their buffer and
//!    replaced by an `arith.constant` at the top of the block.

use jitrt_ir::{
    Attribute, DenseElementsAttr, DenseValues, HostFunctionType, HostType, InsertPoint, IrError,
    Kernel,
};
use jitrt_types::{verify_host_operand, Argument, DType, MemrefDesc};
use tracing::{debug, trace};

use crate::{
    attrs, supports_value_specialization, ArgumentConstraint, SpecializationError,
    SpecializationListener, SymbolicShape,
};

/// Specialize `kernel` to one call's arguments.
///
/// `arguments`, `symbolic_shapes`, and `constraints` hold one entry per
/// kernel input. The first error aborts the call; the kernel may then be
/// partially rewritten and must be discarded.
pub fn specialize_function(
    kernel: &mut Kernel,
    arguments: &[Argument<'_>],
    symbolic_shapes: &[SymbolicShape],
    constraints: &[ArgumentConstraint],
    mut listener: Option<&mut dyn SpecializationListener>,
) -> Result<(), SpecializationError> {
    let num_inputs = kernel.num_arguments();
    check_arity("arguments", num_inputs, arguments.len())?;
    check_arity("symbolic shapes", num_inputs, symbolic_shapes.len())?;
    check_arity("argument constraints", num_inputs, constraints.len())?;
    check_arity("block arguments", num_inputs, kernel.arguments().len())?;

    debug!(kernel = kernel.name(), num_inputs, "specializing kernel");

    // Specialize all inputs before touching the kernel.
    let specialized_inputs = kernel
        .function_type()
        .inputs()
        .iter()
        .zip(arguments.iter().zip(symbolic_shapes))
        .enumerate()
        .map(|(index, (ty, (argument, shape)))| {
            specialize_operand_type(index, ty, argument, shape)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let results = kernel.function_type().results().to_vec();
    kernel.set_function_type(HostFunctionType::new(specialized_inputs.clone(), results));

    rewrite_block_arguments(kernel, &specialized_inputs)?;

    for (index, shape) in symbolic_shapes.iter().enumerate() {
        if shape.is_static() {
            continue;
        }
        trace!(index, %shape, "attaching symbolic shape");
        let value = DenseElementsAttr::i64_vector(shape.as_slice().to_vec());
        kernel.set_arg_attr(index, attrs::SYMBOLIC_SHAPE, Attribute::DenseElements(value))?;
    }

    // Constants go to the top of the block, ahead of the casts.
    let mut at = InsertPoint::block_start();
    for (index, &constraint) in constraints.iter().enumerate() {
        if constraint != ArgumentConstraint::Value {
            continue;
        }

        let input = &specialized_inputs[index];
        if !supports_value_specialization(input) {
            return Err(SpecializationError::NonSinkableOperand {
                index,
                ty: input.clone(),
            });
        }

        let Argument::Memref(memref) = &arguments[index] else {
            return Err(SpecializationError::NonSinkableArgument {
                index,
                argument: arguments[index].to_string(),
            });
        };

        let Some(value) = memref_values(input, memref) else {
            return Err(SpecializationError::CannotGetValue {
                index,
                ty: input.clone(),
            });
        };

        trace!(index, %value, "sinking argument");
        let constant = kernel.insert_constant(&mut at, value.clone())?;
        let argument = kernel.argument(index)?;
        kernel.replace_all_uses_with(argument, constant)?;

        if let Some(listener) = listener.as_deref_mut() {
            listener.notify_value_specialized(index, value.ty(), &value);
        }
    }

    if let Some(listener) = listener {
        listener.notify_module_specialized(&specialized_inputs, kernel.all_arg_attrs());
    }

    debug!(kernel = kernel.name(), "specialized kernel: {}", kernel.function_type());
    Ok(())
}

fn check_arity(what: &'static str, expected: usize, got: usize) -> Result<(), SpecializationError> {
    if expected == got {
        Ok(())
    } else {
        Err(SpecializationError::ArityMismatch {
            what,
            expected,
            got,
        })
    }
}

/// Input type `ty` specialized to `argument` and its symbolic shape.
fn specialize_operand_type(
    index: usize,
    ty: &HostType,
    argument: &Argument<'_>,
    shape: &SymbolicShape,
) -> Result<HostType, SpecializationError> {
    // Only memref arguments are specialized.
    let Argument::Memref(memref) = argument else {
        if !shape.is_empty() {
            return Err(SpecializationError::UnexpectedSymbolicShape {
                index,
                argument: argument.to_string(),
            });
        }
        return Ok(ty.clone());
    };

    let element = match ty {
        HostType::MemRef { element, .. }
        | HostType::RankedTensor { element, .. }
        | HostType::UnrankedTensor { element } => element.as_ref(),
        _ => {
            return Err(SpecializationError::UnsupportedInputType {
                index,
                ty: ty.clone(),
            })
        }
    };

    // Verify against the declared type, before narrowing it.
    verify_host_operand(index, ty, memref).map_err(|err| {
        debug!(index, %err, "argument does not match declared type");
        SpecializationError::Verify(err)
    })?;

    let sizes = shape.normalize();
    let specialized = if ty.is_memref() {
        HostType::memref(&sizes, element.clone())
    } else {
        HostType::ranked_tensor(&sizes, element.clone())
    };

    trace!(index, from = %ty, to = %specialized, "specialized operand");
    Ok(specialized)
}

/// Swap every entry block argument for one of the specialized type.
///
/// Every input gets a fresh argument, even when its type is unchanged; the
/// originals are erased together once all uses are redirected.
fn rewrite_block_arguments(kernel: &mut Kernel, inputs: &[HostType]) -> Result<(), IrError> {
    let mut at = InsertPoint::block_start();
    for (index, ty) in inputs.iter().enumerate() {
        let old_arg = kernel.argument(index)?;
        let old_ty = kernel
            .value_type(old_arg)
            .cloned()
            .ok_or(IrError::UnknownValue(old_arg))?;

        let mut new_arg = kernel.add_argument(ty.clone());
        if *ty != old_ty {
            new_arg = kernel.insert_cast(&mut at, new_arg, old_ty)?;
        }
        kernel.replace_all_uses_with(old_arg, new_arg)?;
    }

    let originals: Vec<usize> = (0..inputs.len()).collect();
    kernel.erase_arguments(&originals)
}

/// Copy the contents of a rank 0 or rank 1 integer buffer into a constant.
///
/// The constant's type is a tensor of the buffer's sizes with the element
/// type of `ty`. Element offset and stride are honoured.
fn memref_values(ty: &HostType, memref: &MemrefDesc<'_>) -> Option<DenseElementsAttr> {
    let num_values = match memref.rank() {
        0 => 1,
        1 => usize::try_from(memref.size(0)).ok()?,
        _ => return None,
    };

    let values = match memref.dtype() {
        DType::I32 => DenseValues::I32(
            (0..num_values)
                .map(|i| {
                    element_bytes(memref, i)
                        .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
                        .map(i32::from_ne_bytes)
                })
                .collect::<Option<_>>()?,
        ),
        DType::I64 => DenseValues::I64(
            (0..num_values)
                .map(|i| {
                    element_bytes(memref, i)
                        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
                        .map(i64::from_ne_bytes)
                })
                .collect::<Option<_>>()?,
        ),
        _ => return None,
    };

    let ty = HostType::ranked_tensor(memref.sizes(), ty.element_type()?.clone());
    DenseElementsAttr::new(ty, values)
}

/// Bytes of the `i`-th element of a rank 0 or rank 1 buffer.
fn element_bytes<'buf>(memref: &MemrefDesc<'buf>, i: usize) -> Option<&'buf [u8]> {
    if memref.rank() == 0 {
        memref.element(&[])
    } else {
        memref.element(&[i64::try_from(i).ok()?])
    }
}

#[cfg(test)]
mod tests;
