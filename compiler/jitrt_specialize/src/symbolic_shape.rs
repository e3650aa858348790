//! Resolved symbolic shapes.

use std::fmt;

use jitrt_ir::{Shape, DYNAMIC_SIZE};
use smallvec::SmallVec;

/// Per-dimension shape of one call argument as seen by the shape resolver.
///
/// Each entry is either a concrete size (`>= 0`) or a negative symbol id.
/// Dimensions sharing a symbol id are known to be equal across calls, but
/// their extent is not fixed. Non-memref arguments have an empty shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SymbolicShape(SmallVec<[i64; 4]>);

impl SymbolicShape {
    pub fn new(dims: &[i64]) -> Self {
        SymbolicShape(SmallVec::from_slice(dims))
    }

    /// Shape of a non-memref argument.
    pub fn empty() -> Self {
        SymbolicShape(SmallVec::new())
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if every dimension is a concrete size.
    pub fn is_static(&self) -> bool {
        self.0.iter().all(|&dim| dim >= 0)
    }

    /// Replace every symbol with [`DYNAMIC_SIZE`], keeping rank and concrete
    /// sizes.
    pub fn normalize(&self) -> Shape {
        self.0
            .iter()
            .map(|&dim| if dim >= 0 { dim } else { DYNAMIC_SIZE })
            .collect()
    }
}

impl From<Vec<i64>> for SymbolicShape {
    fn from(dims: Vec<i64>) -> Self {
        SymbolicShape(SmallVec::from_vec(dims))
    }
}

impl FromIterator<i64> for SymbolicShape {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        SymbolicShape(iter.into_iter().collect())
    }
}

/// Prints symbols as `s<id>`, e.g. `[s2, 4]` for `[-2, 4]`.
impl fmt::Display for SymbolicShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, &dim) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if dim >= 0 {
                write!(f, "{dim}")?;
            } else {
                write!(f, "s{}", dim.unsigned_abs())?;
            }
        }
        f.write_str("]")
    }
}
