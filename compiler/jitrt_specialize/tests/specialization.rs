//! End-to-end specialization of whole kernels.

use jitrt_ir::{
    AttrDict, Attribute, DenseElementsAttr, HostFunctionType, HostType, Kernel, OpKind,
};
use jitrt_specialize::{
    argument_constraints, attrs, specialize_function, ArgumentConstraint, SpecializationError,
    SpecializationListener, SymbolicShape,
};
use jitrt_types::{Argument, DType, MemrefDesc, ScalarArg, VerifyError};
use pretty_assertions::assert_eq;

fn i32_bytes(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

/// `%r = compute.add <all arguments> : <first result>; return %r`
fn kernel(name: &str, signature: &str) -> Kernel {
    jitrt_specialize::init_tracing();

    let func = match HostFunctionType::parse(signature) {
        Ok(func) => func,
        Err(err) => panic!("bad test signature `{signature}`: {err}"),
    };
    let results = func.results().to_vec();
    let mut kernel = Kernel::new(name, func);
    let args = kernel.arguments().to_vec();
    let Ok((_, values)) =
        kernel.append_op(OpKind::Generic("compute.add".to_owned()), &args, results)
    else {
        panic!("append compute.add");
    };
    let Ok(_) = kernel.append_op(OpKind::Return, &values, vec![]) else {
        panic!("append return");
    };
    kernel
}

#[derive(Debug, PartialEq)]
enum Event {
    Value {
        index: usize,
        ty: HostType,
        values: Vec<i64>,
    },
    Module {
        inputs: Vec<HostType>,
        attrs: Vec<AttrDict>,
    },
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
}

impl SpecializationListener for Recorder {
    fn notify_value_specialized(&mut self, index: usize, ty: &HostType, value: &DenseElementsAttr) {
        self.events.push(Event::Value {
            index,
            ty: ty.clone(),
            values: value.to_i64_vec(),
        });
    }

    fn notify_module_specialized(&mut self, inputs: &[HostType], attrs: &[AttrDict]) {
        self.events.push(Event::Module {
            inputs: inputs.to_vec(),
            attrs: attrs.to_vec(),
        });
    }
}

#[test]
fn shape_and_value_specialization() {
    let mut k = kernel(
        "compute",
        "(tensor<?x?xi32>, tensor<4xi32>) -> tensor<?x?xi32>",
    );
    let matrix = i32_bytes(&[0; 8]);
    let vector = i32_bytes(&[1, 2, 3, 4]);
    let arguments = [
        Argument::from(MemrefDesc::contiguous(DType::I32, &matrix, &[2, 4])),
        Argument::from(MemrefDesc::contiguous(DType::I32, &vector, &[4])),
    ];
    let shapes = [SymbolicShape::new(&[-2, 4]), SymbolicShape::new(&[4])];
    let constraints = [ArgumentConstraint::Shape, ArgumentConstraint::Value];
    let mut recorder = Recorder::default();

    let result = specialize_function(&mut k, &arguments, &shapes, &constraints, Some(&mut recorder));
    assert_eq!(result, Ok(()));

    assert_eq!(
        k.function_type().to_string(),
        "(tensor<?x4xi32>, tensor<4xi32>) -> tensor<?x?xi32>"
    );
    assert_eq!(
        k.to_string(),
        "func @compute(\
         %3: tensor<?x4xi32> {rt.symbolic_shape = dense<[-2, 4]> : tensor<2xi64>}, \
         %5: tensor<4xi32>) -> (tensor<?x?xi32>) {\n  \
         %6 = arith.constant dense<[1, 2, 3, 4]> : tensor<4xi32>\n  \
         %4 = tensor.cast %3 : tensor<?x?xi32>\n  \
         %2 = compute.add %4, %6 : tensor<?x?xi32>\n  \
         return %2\n}"
    );

    let mut symbolic = AttrDict::new();
    symbolic.set(
        attrs::SYMBOLIC_SHAPE,
        Attribute::DenseElements(DenseElementsAttr::i64_vector(vec![-2, 4])),
    );
    let vector_ty = HostType::ranked_tensor(&[4], HostType::i32());
    assert_eq!(
        recorder.events,
        vec![
            Event::Value {
                index: 1,
                ty: vector_ty.clone(),
                values: vec![1, 2, 3, 4],
            },
            Event::Module {
                inputs: vec![HostType::ranked_tensor(&[-1, 4], HostType::i32()), vector_ty],
                attrs: vec![symbolic, AttrDict::new()],
            },
        ]
    );
}

#[test]
fn static_specialization_is_idempotent() {
    let mut k = kernel("static", "(tensor<?x?xi32>, memref<?xi32>) -> ()");
    let matrix = i32_bytes(&[0; 6]);
    let vector = i32_bytes(&[0; 3]);
    let arguments = [
        Argument::from(MemrefDesc::contiguous(DType::I32, &matrix, &[2, 3])),
        Argument::from(MemrefDesc::contiguous(DType::I32, &vector, &[3])),
    ];
    let shapes = [SymbolicShape::new(&[2, 3]), SymbolicShape::new(&[3])];
    let constraints = [ArgumentConstraint::Shape; 2];

    let first = specialize_function(&mut k, &arguments, &shapes, &constraints, None);
    assert_eq!(first, Ok(()));
    let signature = k.function_type().clone();
    let attrs = k.all_arg_attrs().to_vec();
    let first_args = k.arguments().to_vec();
    let first_body = op_shapes(&k);

    let second = specialize_function(&mut k, &arguments, &shapes, &constraints, None);
    assert_eq!(second, Ok(()));
    assert_eq!(k.function_type(), &signature);
    assert_eq!(k.all_arg_attrs(), attrs.as_slice());
    assert!(attrs.iter().all(AttrDict::is_empty));

    // The second pass adds no operations and leaves every operand in place;
    // only the block arguments are renewed.
    assert_eq!(
        first_body,
        vec![
            ("tensor.cast".to_owned(), vec![Some(0)]),
            ("tensor.cast".to_owned(), vec![Some(1)]),
            ("compute.add".to_owned(), vec![None, None]),
            ("return".to_owned(), vec![]),
        ]
    );
    assert_eq!(op_shapes(&k), first_body);
    let second_args = k.arguments().to_vec();
    assert_eq!(second_args.len(), first_args.len());
    for (old, new) in first_args.iter().zip(&second_args) {
        assert_ne!(old, new);
        assert!(!k.has_uses(*old));
        assert_eq!(k.value_type(*old), k.value_type(*new));
    }
}

/// Each operation's name plus its operands as block argument positions.
fn op_shapes(k: &Kernel) -> Vec<(String, Vec<Option<usize>>)> {
    k.operations()
        .map(|(_, op)| {
            let operands = op
                .operands
                .iter()
                .map(|operand| k.arguments().iter().position(|arg| arg == operand))
                .collect();
            (op.kind.name().to_owned(), operands)
        })
        .collect()
}

#[test]
fn first_invalid_argument_fails_the_call() {
    let mut k = kernel("fail_fast", "(tensor<?xf32>, tensor<4xf32>, tensor<?xi64>) -> ()");
    let before = k.to_string();
    let floats = [0u8; 32];
    let arguments = [
        Argument::from(MemrefDesc::contiguous(DType::F32, &floats, &[2])),
        // Declared as 4 elements.
        Argument::from(MemrefDesc::contiguous(DType::F32, &floats, &[3])),
        // Would also fail: wrong dtype.
        Argument::from(MemrefDesc::contiguous(DType::F32, &floats, &[1])),
    ];
    let shapes = [
        SymbolicShape::new(&[2]),
        SymbolicShape::new(&[3]),
        SymbolicShape::new(&[1]),
    ];
    let mut recorder = Recorder::default();

    let err = specialize_function(
        &mut k,
        &arguments,
        &shapes,
        &[ArgumentConstraint::Resolved; 3],
        Some(&mut recorder),
    );
    assert_eq!(
        err,
        Err(SpecializationError::Verify(VerifyError::DimensionMismatch {
            index: 1,
            dim: 0,
            expected: 4,
            got: 3,
        }))
    );
    assert_eq!(err.map_err(|err| err.index()), Err(Some(1)));
    // Type specialization failures leave the kernel untouched.
    assert_eq!(k.to_string(), before);
    assert!(recorder.events.is_empty());
}

#[test]
fn rank_two_float_cannot_be_sunk() {
    let mut k = kernel("floats", "(tensor<2x2xf32>) -> ()");
    let floats = [0u8; 16];
    let arguments = [Argument::from(MemrefDesc::contiguous(DType::F32, &floats, &[2, 2]))];
    let mut recorder = Recorder::default();

    let err = specialize_function(
        &mut k,
        &arguments,
        &[SymbolicShape::new(&[2, 2])],
        &[ArgumentConstraint::Value],
        Some(&mut recorder),
    );
    assert_eq!(
        err.map_err(|err| err.to_string()),
        Err("non-sinkable operand was marked for sinking: tensor<2x2xf32>".to_owned())
    );
    assert!(k.operations().all(|(_, op)| !matches!(op.kind, OpKind::Constant(_))));
    assert!(k.has_uses(k.arguments()[0]));
    assert!(recorder.events.is_empty());
}

#[test]
fn metadata_only_for_dynamic_shapes() {
    let mut k = kernel("metadata", "(tensor<?x?xf32>, tensor<?xf32>, i32) -> ()");
    let floats = [0u8; 64];
    let arguments = [
        Argument::from(MemrefDesc::contiguous(DType::F32, &floats, &[4, 2])),
        Argument::from(MemrefDesc::contiguous(DType::F32, &floats, &[8])),
        Argument::from(ScalarArg::i32(0)),
    ];
    let shapes = [
        SymbolicShape::new(&[-2, 2]),
        SymbolicShape::new(&[8]),
        SymbolicShape::empty(),
    ];

    let result = specialize_function(
        &mut k,
        &arguments,
        &shapes,
        &[ArgumentConstraint::Resolved; 3],
        None,
    );
    assert_eq!(result, Ok(()));

    let symbolic: Vec<Option<Vec<i64>>> = k
        .all_arg_attrs()
        .iter()
        .map(|dict| {
            dict.get(attrs::SYMBOLIC_SHAPE)
                .and_then(Attribute::as_dense_elements)
                .map(DenseElementsAttr::to_i64_vec)
        })
        .collect();
    assert_eq!(symbolic, vec![Some(vec![-2, 2]), None, None]);
}

#[test]
fn constraints_read_from_kernel_attributes() {
    let mut k = kernel("annotated", "(tensor<?xi32>, tensor<3xi32>) -> ()");
    for (index, name) in [(0, "shape"), (1, "value")] {
        if let Err(err) = k.set_arg_attr(index, attrs::CONSTRAINT, Attribute::String(name.to_owned())) {
            panic!("{err}");
        }
    }
    let constraints = match argument_constraints(&k) {
        Ok(constraints) => constraints,
        Err(err) => panic!("{err}"),
    };
    assert_eq!(constraints, vec![ArgumentConstraint::Shape, ArgumentConstraint::Value]);

    let first = i32_bytes(&[7, 8]);
    let second = i32_bytes(&[4, 5, 6]);
    let arguments = [
        Argument::from(MemrefDesc::contiguous(DType::I32, &first, &[2])),
        Argument::from(MemrefDesc::contiguous(DType::I32, &second, &[3])),
    ];
    let shapes = [SymbolicShape::new(&[2]), SymbolicShape::new(&[3])];

    let result = specialize_function(&mut k, &arguments, &shapes, &constraints, None);
    assert_eq!(result, Ok(()));
    assert_eq!(
        k.function_type().to_string(),
        "(tensor<2xi32>, tensor<3xi32>) -> ()"
    );
    // Constraint attributes survive specialization.
    assert_eq!(
        k.arg_attrs(1).and_then(|dict| dict.get(attrs::CONSTRAINT)),
        Some(&Attribute::String("value".to_owned()))
    );
}
