use jitrt_ir::{AttrDict, OpKind, DYNAMIC_SIZE};
use jitrt_types::{ScalarArg, VerifyError};
use pretty_assertions::assert_eq;

use super::*;

fn host(source: &str) -> HostType {
    match HostType::parse(source) {
        Ok(ty) => ty,
        Err(err) => panic!("bad test type `{source}`: {err}"),
    }
}

fn i32_bytes(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn i64_bytes(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

/// Kernel whose body passes every argument to one opaque op and returns it.
fn kernel(signature: &str) -> Kernel {
    let func = match HostFunctionType::parse(signature) {
        Ok(func) => func,
        Err(err) => panic!("bad test signature `{signature}`: {err}"),
    };
    let results = func.results().to_vec();
    let mut kernel = Kernel::new("k", func);
    let args = kernel.arguments().to_vec();
    let Ok((_, values)) =
        kernel.append_op(OpKind::Generic("test.use".to_owned()), &args, results)
    else {
        panic!("append use");
    };
    let Ok(_) = kernel.append_op(OpKind::Return, &values, vec![]) else {
        panic!("append return");
    };
    kernel
}

// ── Operand types ───────────────────────────────────────────────

#[test]
fn scalar_arguments_keep_their_type() {
    let ty = HostType::i32();
    let argument = Argument::from(ScalarArg::i32(7));

    assert_eq!(
        specialize_operand_type(0, &ty, &argument, &SymbolicShape::empty()),
        Ok(HostType::i32())
    );
    assert_eq!(
        specialize_operand_type(0, &ty, &argument, &SymbolicShape::new(&[1]))
            .map_err(|err| err.to_string()),
        Err("unexpected symbolic shape for argument: ScalarArg: dtype: i32 bits: 0x7".to_owned())
    );
}

#[test]
fn operand_types_take_the_normalized_shape() {
    let argument = Argument::from(MemrefDesc::contiguous(DType::F32, &[], &[2, 4]));
    let shape = SymbolicShape::new(&[-2, 4]);

    let cases = [
        ("tensor<?x?xf32>", "tensor<?x4xf32>"),
        ("tensor<*xf32>", "tensor<?x4xf32>"),
        ("memref<2x?xf32>", "memref<?x4xf32>"),
    ];
    for (declared, specialized) in cases {
        assert_eq!(
            specialize_operand_type(3, &host(declared), &argument, &shape),
            Ok(host(specialized)),
            "specializing {declared}"
        );
    }
}

#[test]
fn operand_verified_against_declared_type() {
    // The symbolic shape would fit, but the declared type does not.
    let argument = Argument::from(MemrefDesc::contiguous(DType::F32, &[], &[2, 4]));
    assert_eq!(
        specialize_operand_type(1, &host("tensor<3x4xf32>"), &argument, &SymbolicShape::new(&[2, 4])),
        Err(SpecializationError::Verify(VerifyError::DimensionMismatch {
            index: 1,
            dim: 0,
            expected: 3,
            got: 2,
        }))
    );
}

#[test]
fn unsupported_operand_types() {
    let argument = Argument::from(MemrefDesc::contiguous(DType::F32, &[], &[4]));
    for declared in ["memref<*xf32>", "!async.token", "f32"] {
        assert_eq!(
            specialize_operand_type(0, &host(declared), &argument, &SymbolicShape::new(&[4])),
            Err(SpecializationError::UnsupportedInputType {
                index: 0,
                ty: host(declared),
            })
        );
    }
}

// ── Value extraction ────────────────────────────────────────────

#[test]
fn extracts_rank_one_values() {
    let data = i32_bytes(&[1, 2, 3, 4]);
    let memref = MemrefDesc::contiguous(DType::I32, &data, &[4]);

    let value = memref_values(&host("tensor<4xi32>"), &memref);
    assert_eq!(
        value.as_ref().map(ToString::to_string).as_deref(),
        Some("dense<[1, 2, 3, 4]> : tensor<4xi32>")
    );
}

#[test]
fn extracts_scalar_with_offset() {
    let data = i64_bytes(&[10, 20, 30]);
    let memref = MemrefDesc::new(DType::I64, &data, 2, &[], &[]);

    let value = memref_values(&host("tensor<i64>"), &memref);
    assert_eq!(value.map(|v| v.to_i64_vec()), Some(vec![30]));
}

#[test]
fn extraction_honours_stride() {
    let data = i32_bytes(&[1, 0, 2, 0, 3]);
    let memref = MemrefDesc::new(DType::I32, &data, 0, &[3], &[2]);

    let value = memref_values(&host("tensor<3xi32>"), &memref);
    assert_eq!(value.map(|v| v.to_i64_vec()), Some(vec![1, 2, 3]));
}

#[test]
fn extraction_failures() {
    let zeros = [0u8; 16];

    let floats = MemrefDesc::contiguous(DType::F32, &zeros[..8], &[2]);
    assert_eq!(memref_values(&host("tensor<2xf32>"), &floats), None);

    let matrix = MemrefDesc::contiguous(DType::I32, &zeros, &[2, 2]);
    assert_eq!(memref_values(&host("tensor<2x2xi32>"), &matrix), None);

    // Descriptor claims more elements than the buffer holds.
    let short = MemrefDesc::contiguous(DType::I32, &zeros[..4], &[2]);
    assert_eq!(memref_values(&host("tensor<2xi32>"), &short), None);
}

// ── Whole kernel ────────────────────────────────────────────────

#[test]
fn arity_is_checked_before_mutation() {
    let mut k = kernel("(tensor<?xi32>, tensor<?xi32>) -> ()");
    let before = k.to_string();
    let data = i32_bytes(&[1]);
    let arguments = [Argument::from(MemrefDesc::contiguous(DType::I32, &data, &[1]))];

    let err = specialize_function(
        &mut k,
        &arguments,
        &[SymbolicShape::new(&[1])],
        &[ArgumentConstraint::Resolved],
        None,
    );
    assert_eq!(
        err,
        Err(SpecializationError::ArityMismatch {
            what: "arguments",
            expected: 2,
            got: 1,
        })
    );
    assert_eq!(k.to_string(), before);
}

#[test]
fn casts_only_where_types_change() {
    let mut k = kernel("(tensor<?xi32>, tensor<3xi32>, i32) -> ()");
    let originals = k.arguments().to_vec();
    let data = i32_bytes(&[1, 2, 3]);
    let arguments = [
        Argument::from(MemrefDesc::contiguous(DType::I32, &data, &[3])),
        Argument::from(MemrefDesc::contiguous(DType::I32, &data, &[3])),
        Argument::from(ScalarArg::i32(5)),
    ];
    let shapes = [
        SymbolicShape::new(&[3]),
        SymbolicShape::new(&[3]),
        SymbolicShape::empty(),
    ];

    let result = specialize_function(&mut k, &arguments, &shapes, &[ArgumentConstraint::Resolved; 3], None);
    assert_eq!(result, Ok(()));

    assert_eq!(
        k.function_type().to_string(),
        "(tensor<3xi32>, tensor<3xi32>, i32) -> ()"
    );
    let casts = k.operations().filter(|(_, op)| op.kind == OpKind::Cast).count();
    assert_eq!(casts, 1);
    // Static shapes carry no metadata.
    assert!(k.all_arg_attrs().iter().all(AttrDict::is_empty));
    // The old arguments are gone and nothing refers to them.
    assert_eq!(k.arguments().len(), 3);
    for (_, op) in k.operations() {
        for operand in &op.operands {
            assert!(!originals.contains(operand), "original argument {operand} still used");
        }
    }
}

#[test]
fn symbolic_shape_metadata_keeps_symbol_ids() {
    let mut k = kernel("(memref<?x?xf32>) -> ()");
    let arguments = [Argument::from(MemrefDesc::contiguous(DType::F32, &[], &[5, 5]))];
    let shapes = [SymbolicShape::new(&[-3, -3])];

    let result = specialize_function(&mut k, &arguments, &shapes, &[ArgumentConstraint::Shape], None);
    assert_eq!(result, Ok(()));

    let attr = k
        .arg_attrs(0)
        .and_then(|dict| dict.get(attrs::SYMBOLIC_SHAPE))
        .and_then(Attribute::as_dense_elements)
        .map(DenseElementsAttr::to_i64_vec);
    assert_eq!(attr, Some(vec![-3, -3]));
    assert_eq!(
        k.function_type().input(0),
        Some(&HostType::memref(&[DYNAMIC_SIZE, DYNAMIC_SIZE], HostType::f32()))
    );
}

#[test]
fn sinking_requires_a_memref_argument() {
    let mut k = kernel("(tensor<i32>) -> ()");
    let arguments = [Argument::from(ScalarArg::i32(3))];

    let err = specialize_function(
        &mut k,
        &arguments,
        &[SymbolicShape::empty()],
        &[ArgumentConstraint::Value],
        None,
    );
    assert_eq!(
        err.map_err(|err| err.to_string()),
        Err("non-sinkable argument was marked for sinking: ScalarArg: dtype: i32 bits: 0x3".to_owned())
    );
}

#[test]
fn sinking_rank_zero_argument() {
    let mut k = kernel("(tensor<i64>) -> ()");
    let data = i64_bytes(&[42]);
    let arguments = [Argument::from(MemrefDesc::contiguous(DType::I64, &data, &[]))];

    let result = specialize_function(
        &mut k,
        &arguments,
        &[SymbolicShape::empty()],
        &[ArgumentConstraint::Value],
        None,
    );
    assert_eq!(result, Ok(()));

    let constants: Vec<String> = k
        .operations()
        .filter_map(|(_, op)| match &op.kind {
            OpKind::Constant(value) => Some(value.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(constants, vec!["dense<42> : tensor<i64>".to_owned()]);
    assert!(!k.has_uses(k.arguments()[0]));
}

#[test]
fn sinking_with_symbolic_extent() {
    let mut k = kernel("(tensor<?xi32>) -> ()");
    let data = i32_bytes(&[5, 6, 7]);
    let arguments = [Argument::from(MemrefDesc::contiguous(DType::I32, &data, &[3]))];

    let result = specialize_function(
        &mut k,
        &arguments,
        &[SymbolicShape::new(&[-2])],
        &[ArgumentConstraint::Value],
        None,
    );
    assert_eq!(result, Ok(()));

    assert_eq!(k.function_type().to_string(), "(tensor<?xi32>) -> ()");
    let constants: Vec<String> = k
        .operations()
        .filter_map(|(_, op)| match &op.kind {
            OpKind::Constant(value) => Some(value.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(constants, vec!["dense<[5, 6, 7]> : tensor<3xi32>".to_owned()]);
    assert!(!k.has_uses(k.arguments()[0]));
}

#[test]
fn unsigned_elements_are_not_sinkable() {
    let mut k = kernel("(tensor<4xui32>) -> ()");
    let data = i32_bytes(&[1, 2, 3, 4]);
    let arguments = [Argument::from(MemrefDesc::contiguous(DType::U32, &data, &[4]))];

    let err = specialize_function(
        &mut k,
        &arguments,
        &[SymbolicShape::new(&[4])],
        &[ArgumentConstraint::Value],
        None,
    );
    assert_eq!(
        err,
        Err(SpecializationError::NonSinkableOperand {
            index: 0,
            ty: host("tensor<4xui32>"),
        })
    );
}
