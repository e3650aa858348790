//! Kernel IR: a function with a single entry block.
//!
//! A [`Kernel`] owns its signature, one [`AttrDict`] per argument, and a
//! body made of block arguments followed by an ordered list of
//! [`Operation`]s. Values (block arguments and operation results) live in a
//! per-kernel arena and are referred to by [`ValueId`]; operations live in a
//! second arena referred to by [`OpId`], with the block keeping their order.
//!
//! Values are never deleted from the arena. Erasing a block argument only
//! detaches it from the block, and is refused while the argument still has
//! uses.

use std::fmt;

use smallvec::SmallVec;

use crate::attr::{AttrDict, Attribute, DenseElementsAttr};
use crate::types::{HostFunctionType, HostType};

// ── ID newtypes ─────────────────────────────────────────────────────

/// SSA value within one [`Kernel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ValueId(u32);

impl ValueId {
    /// Create a value ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Operation within one [`Kernel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct OpId(u32);

impl OpId {
    /// Create an operation ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Operations ──────────────────────────────────────────────────────

/// What an operation does.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `tensor.cast`: one operand, one result of a compatible type.
    Cast,
    /// `arith.constant`: no operands, one result of the constant's type.
    Constant(DenseElementsAttr),
    /// Block terminator returning its operands.
    Return,
    /// Any other operation, identified by name.
    Generic(String),
}

impl OpKind {
    pub fn name(&self) -> &str {
        match self {
            OpKind::Cast => "tensor.cast",
            OpKind::Constant(_) => "arith.constant",
            OpKind::Return => "return",
            OpKind::Generic(name) => name,
        }
    }
}

/// An operation in the entry block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    pub operands: SmallVec<[ValueId; 4]>,
    pub results: SmallVec<[ValueId; 1]>,
}

/// Where a value is defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueDef {
    /// A block argument (possibly already erased from the block).
    Argument,
    /// Result of an operation.
    Result(OpId),
}

#[derive(Clone, Debug)]
struct ValueData {
    ty: HostType,
    def: ValueDef,
}

/// Insertion cursor into the entry block.
///
/// Each insertion places the new operation at the cursor and advances the
/// cursor past it, so consecutive insertions keep their relative order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsertPoint(usize);

impl InsertPoint {
    /// Before the first operation of the block.
    pub fn block_start() -> Self {
        InsertPoint(0)
    }
}

// ── Errors ──────────────────────────────────────────────────────────

/// Misuse of a kernel mutation primitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrError {
    /// Argument index outside the signature or block.
    ArgumentOutOfRange { index: usize, num_arguments: usize },
    /// Value ID not allocated in this kernel.
    UnknownValue(ValueId),
    /// Block argument erased while operations still use it.
    ArgumentInUse { index: usize, uses: usize },
    /// Insert point past the end of the block.
    InvalidInsertPoint { position: usize, num_ops: usize },
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrError::ArgumentOutOfRange {
                index,
                num_arguments,
            } => write!(
                f,
                "argument #{index} out of range for kernel with {num_arguments} arguments"
            ),
            IrError::UnknownValue(value) => write!(f, "unknown value {value}"),
            IrError::ArgumentInUse { index, uses } => {
                write!(f, "cannot erase block argument #{index}: it still has {uses} uses")
            }
            IrError::InvalidInsertPoint { position, num_ops } => write!(
                f,
                "insert point {position} is past the end of a block with {num_ops} operations"
            ),
        }
    }
}

impl std::error::Error for IrError {}

// ── Kernel ──────────────────────────────────────────────────────────

/// A compiled-kernel candidate: signature, argument attributes, and body.
#[derive(Clone, Debug)]
pub struct Kernel {
    name: String,
    function_type: HostFunctionType,
    arg_attrs: Vec<AttrDict>,
    values: Vec<ValueData>,
    ops: Vec<Operation>,
    block_args: Vec<ValueId>,
    block_ops: Vec<OpId>,
}

impl Kernel {
    /// Create a kernel whose entry block has one argument per input.
    pub fn new(name: impl Into<String>, function_type: HostFunctionType) -> Self {
        let mut kernel = Kernel {
            name: name.into(),
            arg_attrs: vec![AttrDict::new(); function_type.num_inputs()],
            function_type,
            values: Vec::new(),
            ops: Vec::new(),
            block_args: Vec::new(),
            block_ops: Vec::new(),
        };
        let inputs = kernel.function_type.inputs().to_vec();
        for ty in inputs {
            kernel.add_argument(ty);
        }
        kernel
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function_type(&self) -> &HostFunctionType {
        &self.function_type
    }

    /// Number of inputs in the declared signature.
    pub fn num_arguments(&self) -> usize {
        self.function_type.num_inputs()
    }

    /// Replace the declared signature.
    ///
    /// Argument attribute dictionaries are kept for positions that still
    /// exist and created empty for new ones.
    pub fn set_function_type(&mut self, function_type: HostFunctionType) {
        self.arg_attrs
            .resize_with(function_type.num_inputs(), AttrDict::new);
        self.function_type = function_type;
    }

    // ── Values ──────────────────────────────────────────────────────

    fn alloc_value(&mut self, ty: HostType, def: ValueDef) -> ValueId {
        let id = ValueId::new(u32::try_from(self.values.len()).unwrap_or(u32::MAX));
        self.values.push(ValueData { ty, def });
        id
    }

    fn check_value(&self, value: ValueId) -> Result<(), IrError> {
        if value.index() < self.values.len() {
            Ok(())
        } else {
            Err(IrError::UnknownValue(value))
        }
    }

    pub fn value_type(&self, value: ValueId) -> Option<&HostType> {
        self.values.get(value.index()).map(|data| &data.ty)
    }

    pub fn value_def(&self, value: ValueId) -> Option<ValueDef> {
        self.values.get(value.index()).map(|data| data.def)
    }

    // ── Block arguments ─────────────────────────────────────────────

    /// Current entry block arguments, in order.
    pub fn arguments(&self) -> &[ValueId] {
        &self.block_args
    }

    pub fn argument(&self, index: usize) -> Result<ValueId, IrError> {
        self.block_args
            .get(index)
            .copied()
            .ok_or(IrError::ArgumentOutOfRange {
                index,
                num_arguments: self.block_args.len(),
            })
    }

    /// Append a block argument of type `ty`.
    pub fn add_argument(&mut self, ty: HostType) -> ValueId {
        let value = self.alloc_value(ty, ValueDef::Argument);
        self.block_args.push(value);
        value
    }

    /// Detach the block arguments at `indices` (positions before erasure).
    ///
    /// Fails without modifying the block if any index is out of range or
    /// any of the arguments still has uses.
    pub fn erase_arguments(&mut self, indices: &[usize]) -> Result<(), IrError> {
        for &index in indices {
            let value = self.argument(index)?;
            let uses = self.uses(value).count();
            if uses > 0 {
                return Err(IrError::ArgumentInUse { index, uses });
            }
        }
        let mut position = 0;
        self.block_args.retain(|_| {
            let keep = !indices.contains(&position);
            position += 1;
            keep
        });
        Ok(())
    }

    // ── Argument attributes ─────────────────────────────────────────

    pub fn arg_attrs(&self, index: usize) -> Option<&AttrDict> {
        self.arg_attrs.get(index)
    }

    /// Attribute dictionaries of every argument, in signature order.
    pub fn all_arg_attrs(&self) -> &[AttrDict] {
        &self.arg_attrs
    }

    pub fn set_arg_attr(
        &mut self,
        index: usize,
        name: &str,
        value: Attribute,
    ) -> Result<(), IrError> {
        let num_arguments = self.arg_attrs.len();
        let dict = self
            .arg_attrs
            .get_mut(index)
            .ok_or(IrError::ArgumentOutOfRange {
                index,
                num_arguments,
            })?;
        dict.set(name, value);
        Ok(())
    }

    // ── Operations ──────────────────────────────────────────────────

    pub fn op(&self, op: OpId) -> Option<&Operation> {
        self.ops.get(op.index())
    }

    /// Operations in block order.
    pub fn operations(&self) -> impl Iterator<Item = (OpId, &Operation)> {
        self.block_ops.iter().map(|&id| (id, &self.ops[id.index()]))
    }

    pub fn num_operations(&self) -> usize {
        self.block_ops.len()
    }

    /// Cursor past the last operation of the block.
    pub fn block_end(&self) -> InsertPoint {
        InsertPoint(self.block_ops.len())
    }

    /// Insert an operation at `at` and advance the cursor.
    ///
    /// Returns the new operation and its result values.
    pub fn insert_op(
        &mut self,
        at: &mut InsertPoint,
        kind: OpKind,
        operands: &[ValueId],
        result_types: Vec<HostType>,
    ) -> Result<(OpId, SmallVec<[ValueId; 1]>), IrError> {
        if at.0 > self.block_ops.len() {
            return Err(IrError::InvalidInsertPoint {
                position: at.0,
                num_ops: self.block_ops.len(),
            });
        }
        for &operand in operands {
            self.check_value(operand)?;
        }

        let id = OpId::new(u32::try_from(self.ops.len()).unwrap_or(u32::MAX));
        let results: SmallVec<[ValueId; 1]> = result_types
            .into_iter()
            .map(|ty| self.alloc_value(ty, ValueDef::Result(id)))
            .collect();
        self.ops.push(Operation {
            kind,
            operands: SmallVec::from_slice(operands),
            results: results.clone(),
        });
        self.block_ops.insert(at.0, id);
        at.0 += 1;
        Ok((id, results))
    }

    /// Append an operation at the end of the block.
    pub fn append_op(
        &mut self,
        kind: OpKind,
        operands: &[ValueId],
        result_types: Vec<HostType>,
    ) -> Result<(OpId, SmallVec<[ValueId; 1]>), IrError> {
        let mut at = self.block_end();
        self.insert_op(&mut at, kind, operands, result_types)
    }

    /// Insert `tensor.cast %source : <source type> to <ty>`.
    pub fn insert_cast(
        &mut self,
        at: &mut InsertPoint,
        source: ValueId,
        ty: HostType,
    ) -> Result<ValueId, IrError> {
        let (op, _) = self.insert_op(at, OpKind::Cast, &[source], vec![ty])?;
        Ok(self.ops[op.index()].results[0])
    }

    /// Insert `arith.constant` materializing `value`.
    pub fn insert_constant(
        &mut self,
        at: &mut InsertPoint,
        value: DenseElementsAttr,
    ) -> Result<ValueId, IrError> {
        let ty = value.ty().clone();
        let (op, _) = self.insert_op(at, OpKind::Constant(value), &[], vec![ty])?;
        Ok(self.ops[op.index()].results[0])
    }

    // ── Use lists ───────────────────────────────────────────────────

    /// Every `(operation, operand position)` that reads `value`, in block
    /// order.
    pub fn uses(&self, value: ValueId) -> impl Iterator<Item = (OpId, usize)> + '_ {
        self.operations().flat_map(move |(id, op)| {
            op.operands
                .iter()
                .enumerate()
                .filter(move |(_, operand)| **operand == value)
                .map(move |(position, _)| (id, position))
        })
    }

    pub fn has_uses(&self, value: ValueId) -> bool {
        self.uses(value).next().is_some()
    }

    /// Redirect every use of `from` to `to`. Returns the number of operands
    /// rewritten.
    pub fn replace_all_uses_with(&mut self, from: ValueId, to: ValueId) -> Result<usize, IrError> {
        self.check_value(from)?;
        self.check_value(to)?;
        let mut replaced = 0;
        for &id in &self.block_ops {
            for operand in &mut self.ops[id.index()].operands {
                if *operand == from {
                    *operand = to;
                    replaced += 1;
                }
            }
        }
        Ok(replaced)
    }
}

// ── Printing ────────────────────────────────────────────────────────

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func @{}(", self.name)?;
        for (i, &arg) in self.block_args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}: {}", self.values[arg.index()].ty)?;
            if let Some(attrs) = self.arg_attrs.get(i).filter(|attrs| !attrs.is_empty()) {
                write!(f, " {attrs}")?;
            }
        }
        f.write_str(") -> (")?;
        for (i, ty) in self.function_type.results().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str(") {\n")?;

        for (_, op) in self.operations() {
            f.write_str("  ")?;
            for (i, result) in op.results.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{result}")?;
            }
            if !op.results.is_empty() {
                f.write_str(" = ")?;
            }
            f.write_str(op.kind.name())?;
            if let OpKind::Constant(value) = &op.kind {
                write!(f, " {value}")?;
            }
            for (i, operand) in op.operands.iter().enumerate() {
                f.write_str(if i == 0 { " " } else { ", " })?;
                write!(f, "{operand}")?;
            }
            match (&op.kind, op.results.first()) {
                (OpKind::Constant(_), _) | (_, None) => {}
                (_, Some(&result)) => write!(f, " : {}", self.values[result.index()].ty)?,
            }
            f.write_str("\n")?;
        }
        f.write_str("}")
    }
}
