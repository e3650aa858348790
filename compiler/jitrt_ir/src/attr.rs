//! Attributes attached to kernel arguments and constant operations.
//!
//! Argument attributes are stored per argument in an [`AttrDict`], which
//! keeps its entries sorted by name so that two dictionaries built from the
//! same attributes compare (and print) identically regardless of insertion
//! order.

use std::fmt;

use smallvec::SmallVec;

use crate::types::HostType;

// ── Dense elements ──────────────────────────────────────────────────

/// Element payload of a [`DenseElementsAttr`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum DenseValues {
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl DenseValues {
    pub fn len(&self) -> usize {
        match self {
            DenseValues::I32(values) => values.len(),
            DenseValues::I64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bit width of each element.
    pub fn element_width(&self) -> u32 {
        match self {
            DenseValues::I32(_) => 32,
            DenseValues::I64(_) => 64,
        }
    }
}

/// An immutable constant: a statically shaped tensor type plus one value per
/// element.
///
/// Constructed only through [`DenseElementsAttr::new`], which checks that
/// the payload matches the type's element width and element count.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct DenseElementsAttr {
    ty: HostType,
    values: DenseValues,
}

impl DenseElementsAttr {
    /// Build a dense constant of type `ty`.
    ///
    /// Returns `None` if `ty` is not a statically shaped ranked tensor, if
    /// its element type is not an integer of the payload's width, or if the
    /// number of values differs from the number of elements.
    pub fn new(ty: HostType, values: DenseValues) -> Option<Self> {
        if !matches!(ty, HostType::RankedTensor { .. }) || !ty.has_static_shape() {
            return None;
        }
        let element = ty.element_type()?;
        if !element.is_integer(values.element_width()) {
            return None;
        }
        let num_elements = ty.shape()?.iter().try_fold(1usize, |acc, &dim| {
            usize::try_from(dim).ok().and_then(|dim| acc.checked_mul(dim))
        })?;
        if num_elements != values.len() {
            return None;
        }
        Some(DenseElementsAttr { ty, values })
    }

    /// A `tensor<N x i64>` holding `values`.
    pub fn i64_vector(values: Vec<i64>) -> Self {
        let len = i64::try_from(values.len()).unwrap_or(i64::MAX);
        DenseElementsAttr {
            ty: HostType::ranked_tensor(&[len], HostType::i64()),
            values: DenseValues::I64(values),
        }
    }

    /// The tensor type of this constant.
    pub fn ty(&self) -> &HostType {
        &self.ty
    }

    pub fn values(&self) -> &DenseValues {
        &self.values
    }

    /// Elements widened to `i64`, in row-major order.
    pub fn to_i64_vec(&self) -> Vec<i64> {
        match &self.values {
            DenseValues::I32(values) => values.iter().map(|&v| i64::from(v)).collect(),
            DenseValues::I64(values) => values.clone(),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

impl fmt::Display for DenseElementsAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dense<")?;
        let scalar = self.ty.rank() == Some(0);
        match (&self.values, scalar) {
            (DenseValues::I32(values), true) => write_list(f, values)?,
            (DenseValues::I64(values), true) => write_list(f, values)?,
            (DenseValues::I32(values), false) => {
                f.write_str("[")?;
                write_list(f, values)?;
                f.write_str("]")?;
            }
            (DenseValues::I64(values), false) => {
                f.write_str("[")?;
                write_list(f, values)?;
                f.write_str("]")?;
            }
        }
        write!(f, "> : {}", self.ty)
    }
}

// ── Attributes ──────────────────────────────────────────────────────

/// An attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Attribute {
    /// Presence-only marker.
    Unit,
    String(String),
    Integer(i64),
    DenseElements(DenseElementsAttr),
}

impl Attribute {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_dense_elements(&self) -> Option<&DenseElementsAttr> {
        match self {
            Attribute::DenseElements(dense) => Some(dense),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Unit => f.write_str("unit"),
            Attribute::String(value) => write!(f, "{value:?}"),
            Attribute::Integer(value) => write!(f, "{value} : i64"),
            Attribute::DenseElements(dense) => write!(f, "{dense}"),
        }
    }
}

/// A name/value pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedAttr {
    pub name: String,
    pub value: Attribute,
}

/// Attribute dictionary, sorted by name with unique names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct AttrDict {
    attrs: SmallVec<[NamedAttr; 2]>,
}

impl AttrDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attrs
            .binary_search_by(|attr| attr.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.attrs[i].value)
    }

    /// Insert or replace `name`.
    pub fn set(&mut self, name: &str, value: Attribute) {
        match self
            .attrs
            .binary_search_by(|attr| attr.name.as_str().cmp(name))
        {
            Ok(i) => self.attrs[i].value = value,
            Err(i) => self.attrs.insert(
                i,
                NamedAttr {
                    name: name.to_owned(),
                    value,
                },
            ),
        }
    }

    /// Remove `name`, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let i = self
            .attrs
            .binary_search_by(|attr| attr.name.as_str().cmp(name))
            .ok()?;
        Some(self.attrs.remove(i).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedAttr> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl fmt::Display for AttrDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, attr) in self.attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if attr.value == Attribute::Unit {
                f.write_str(&attr.name)?;
            } else {
                write!(f, "{} = {}", attr.name, attr.value)?;
            }
        }
        f.write_str("}")
    }
}
