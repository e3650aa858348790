//! Runtime arguments passed to compiled kernels.
//!
//! A [`MemrefDesc`] describes one strided array buffer: element type, the
//! borrowed bytes, an element offset, and per-dimension sizes and strides.
//! Sizes and strides share one inline buffer (`rank` sizes followed by
//! `rank` strides), so descriptors up to rank 4 never allocate.
//!
//! Descriptors are built per call and are move-only. The buffer itself is
//! borrowed for `'buf`; the descriptor never owns or frees it.

use std::fmt;

use smallvec::SmallVec;

use crate::DType;

/// Descriptor of a strided array argument.
///
/// Not `Clone`: two descriptors over the same buffer could diverge in rank
/// or strides, so duplication goes through explicit construction.
#[derive(Debug, PartialEq, Eq)]
pub struct MemrefDesc<'buf> {
    rank: usize,
    dtype: DType,
    data: &'buf [u8],
    offset: i64,
    sizes_and_strides: SmallVec<[i64; 8]>,
}

impl<'buf> MemrefDesc<'buf> {
    /// Build a descriptor from explicit sizes and strides.
    ///
    /// # Panics
    ///
    /// Panics if `sizes` and `strides` have different lengths.
    pub fn new(dtype: DType, data: &'buf [u8], offset: i64, sizes: &[i64], strides: &[i64]) -> Self {
        assert_eq!(
            sizes.len(),
            strides.len(),
            "invalid sizes and strides pair"
        );
        let mut sizes_and_strides = SmallVec::with_capacity(2 * sizes.len());
        sizes_and_strides.extend_from_slice(sizes);
        sizes_and_strides.extend_from_slice(strides);
        MemrefDesc {
            rank: sizes.len(),
            dtype,
            data,
            offset,
            sizes_and_strides,
        }
    }

    /// Build a descriptor of the given rank, letting `fill` write sizes and
    /// strides in place.
    ///
    /// Both slices passed to `fill` have exactly `rank` elements and start
    /// zeroed.
    #[inline]
    pub fn with_fill<F>(rank: usize, dtype: DType, data: &'buf [u8], offset: i64, fill: F) -> Self
    where
        F: FnOnce(&mut [i64], &mut [i64]),
    {
        let mut sizes_and_strides: SmallVec<[i64; 8]> = SmallVec::from_elem(0, 2 * rank);
        let (sizes, strides) = sizes_and_strides.split_at_mut(rank);
        fill(sizes, strides);
        MemrefDesc {
            rank,
            dtype,
            data,
            offset,
            sizes_and_strides,
        }
    }

    /// Build a descriptor for a dense row-major buffer with zero offset.
    ///
    /// Strides saturate at `i64::MAX` when the inner sizes overflow. Such a
    /// descriptor cannot address a real buffer; [`element`](Self::element)
    /// returns `None` for any index that steps along a saturated stride.
    pub fn contiguous(dtype: DType, data: &'buf [u8], sizes: &[i64]) -> Self {
        Self::with_fill(sizes.len(), dtype, data, 0, |out_sizes, strides| {
            out_sizes.copy_from_slice(sizes);
            let mut stride = 1;
            for d in (0..sizes.len()).rev() {
                strides[d] = stride;
                stride = stride.saturating_mul(sizes[d]);
            }
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The borrowed buffer, starting at the base of the allocation (before
    /// the element offset is applied).
    pub fn data(&self) -> &'buf [u8] {
        self.data
    }

    /// Base address of the buffer, for building call frames.
    pub fn data_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Offset of the first element, in elements.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Size of dimension `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= rank`.
    pub fn size(&self, index: usize) -> i64 {
        self.sizes()[index]
    }

    /// Stride of dimension `index`, in elements.
    ///
    /// # Panics
    ///
    /// Panics if `index >= rank`.
    pub fn stride(&self, index: usize) -> i64 {
        self.strides()[index]
    }

    pub fn sizes(&self) -> &[i64] {
        &self.sizes_and_strides[..self.rank]
    }

    pub fn strides(&self) -> &[i64] {
        &self.sizes_and_strides[self.rank..]
    }

    /// Total number of elements (1 for rank 0), `None` on overflow.
    pub fn num_elements(&self) -> Option<i64> {
        self.sizes()
            .iter()
            .try_fold(1i64, |acc, &size| acc.checked_mul(size))
    }

    /// Bytes of the element at multi-dimensional `index`.
    ///
    /// Applies the element offset and strides. Returns `None` if `index`
    /// has the wrong rank, is out of bounds, or the addressed element does
    /// not lie within the borrowed buffer.
    pub fn element(&self, index: &[i64]) -> Option<&'buf [u8]> {
        if index.len() != self.rank {
            return None;
        }
        let mut linear = self.offset;
        for ((&i, &size), &stride) in index.iter().zip(self.sizes()).zip(self.strides()) {
            if i < 0 || i >= size {
                return None;
            }
            linear = linear.checked_add(i.checked_mul(stride)?)?;
        }
        let width = self.dtype.byte_width();
        let start = usize::try_from(linear).ok()?.checked_mul(width)?;
        self.data.get(start..start.checked_add(width)?)
    }
}

fn write_dims(f: &mut fmt::Formatter<'_>, dims: &[i64]) -> fmt::Result {
    f.write_str("[")?;
    for (i, dim) in dims.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{dim}")?;
    }
    f.write_str("]")
}

impl fmt::Display for MemrefDesc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemrefDesc: dtype: {} offset: {} sizes: ", self.dtype, self.offset)?;
        write_dims(f, self.sizes())?;
        f.write_str(" strides: ")?;
        write_dims(f, self.strides())
    }
}

// ── Arguments ───────────────────────────────────────────────────────

/// A scalar argument: element type plus raw bits (zero-extended).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScalarArg {
    dtype: DType,
    bits: u64,
}

impl ScalarArg {
    pub fn new(dtype: DType, bits: u64) -> Self {
        ScalarArg { dtype, bits }
    }

    pub fn i32(value: i32) -> Self {
        Self::new(DType::I32, u64::from(u32::from_ne_bytes(value.to_ne_bytes())))
    }

    pub fn i64(value: i64) -> Self {
        Self::new(DType::I64, u64::from_ne_bytes(value.to_ne_bytes()))
    }

    pub fn f32(value: f32) -> Self {
        Self::new(DType::F32, u64::from(value.to_bits()))
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }
}

impl fmt::Display for ScalarArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScalarArg: dtype: {} bits: {:#x}", self.dtype, self.bits)
    }
}

/// One live call argument.
#[derive(Debug, PartialEq, Eq)]
pub enum Argument<'buf> {
    /// Strided array buffer.
    Memref(MemrefDesc<'buf>),
    /// Scalar passed by value.
    Scalar(ScalarArg),
}

impl<'buf> Argument<'buf> {
    pub fn as_memref(&self) -> Option<&MemrefDesc<'buf>> {
        match self {
            Argument::Memref(desc) => Some(desc),
            Argument::Scalar(_) => None,
        }
    }
}

impl<'buf> From<MemrefDesc<'buf>> for Argument<'buf> {
    fn from(desc: MemrefDesc<'buf>) -> Self {
        Argument::Memref(desc)
    }
}

impl From<ScalarArg> for Argument<'_> {
    fn from(scalar: ScalarArg) -> Self {
        Argument::Scalar(scalar)
    }
}

impl fmt::Display for Argument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Memref(desc) => write!(f, "{desc}"),
            Argument::Scalar(scalar) => write!(f, "{scalar}"),
        }
    }
}
