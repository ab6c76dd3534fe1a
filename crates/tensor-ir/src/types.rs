use std::fmt;

use serde::{Deserialize, Serialize};

/// Enumerates scalar element types a connector can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    BF16,
    F32,
    F64,
}

impl DataType {
    /// Returns `true` when the dtype is any signed or unsigned integer.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::I8
                | DataType::I16
                | DataType::I32
                | DataType::I64
                | DataType::U8
                | DataType::U16
                | DataType::U32
                | DataType::U64
        )
    }

    /// Returns `true` for the two's-complement integer dtypes.
    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64
        )
    }

    /// Returns `true` when the dtype is a floating-point representation.
    pub fn is_float(self) -> bool {
        matches!(
            self,
            DataType::F16 | DataType::BF16 | DataType::F32 | DataType::F64
        )
    }

    /// Storage size of one element. Booleans occupy a full byte.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::Bool | DataType::I8 | DataType::U8 => 1,
            DataType::I16 | DataType::U16 | DataType::F16 | DataType::BF16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::I64 | DataType::U64 | DataType::F64 => 8,
        }
    }

    /// Lowercase short name used in printed types, e.g. `i8` in `i8[2, 3]`.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::I8 => "i8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U8 => "u8",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
            DataType::F16 => "f16",
            DataType::BF16 => "bf16",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical tensor shape as an ordered list of extents. The empty shape is a scalar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self { dims: dims.into() }
    }

    pub fn scalar() -> Self {
        Self::default()
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn into_dims(self) -> Vec<usize> {
        self.dims
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Returns the element count, or `None` when the product overflows `usize`.
    pub fn element_count(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |count, &dim| count.checked_mul(dim))
    }

    /// Broadcasts two shapes with trailing-axis alignment.
    ///
    /// Each aligned pair must be equal or contain a `1`; missing leading axes count as `1`.
    pub fn broadcast(lhs: &Shape, rhs: &Shape) -> Option<Shape> {
        let rank = lhs.rank().max(rhs.rank());
        let mut dims = vec![0usize; rank];
        for (axis, slot) in dims.iter_mut().enumerate() {
            let l = trailing_dim(lhs, rank, axis);
            let r = trailing_dim(rhs, rank, axis);
            *slot = match (l, r) {
                (a, b) if a == b => a,
                (1, b) => b,
                (a, 1) => a,
                _ => return None,
            };
        }
        Some(Shape::new(dims))
    }
}

fn trailing_dim(shape: &Shape, rank: usize, axis: usize) -> usize {
    let offset = rank - shape.rank();
    if axis < offset {
        1
    } else {
        shape.dims[axis - offset]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, dim) in self.dims.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{dim}")?;
        }
        f.write_str("]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims.to_vec())
    }
}

/// Tensor metadata coupling dtype and shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorType {
    pub dtype: DataType,
    pub shape: Shape,
}

impl TensorType {
    pub fn new(dtype: DataType, shape: impl Into<Shape>) -> Self {
        Self {
            dtype,
            shape: shape.into(),
        }
    }

    pub fn element_count(&self) -> Option<usize> {
        self.shape.element_count()
    }

    /// Returns the total byte length, or `None` on overflow.
    pub fn byte_len(&self) -> Option<usize> {
        self.element_count()?.checked_mul(self.dtype.size_in_bytes())
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.dtype, self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_has_one_element() {
        let shape = Shape::scalar();
        assert!(shape.is_scalar());
        assert_eq!(shape.rank(), 0);
        assert_eq!(shape.element_count(), Some(1));
    }

    #[test]
    fn element_count_includes_zero_extents() {
        assert_eq!(Shape::from([4, 0, 3]).element_count(), Some(0));
        assert_eq!(Shape::from([2, 3, 4]).element_count(), Some(24));
    }

    #[test]
    fn element_count_reports_overflow() {
        let shape = Shape::from([usize::MAX, 2]);
        assert_eq!(shape.element_count(), None);
        assert_eq!(TensorType::new(DataType::F32, shape).byte_len(), None);
    }

    #[test]
    fn broadcast_aligns_trailing_axes() {
        let lhs = Shape::from([2, 1, 4]);
        let rhs = Shape::from([3, 1]);
        assert_eq!(Shape::broadcast(&lhs, &rhs), Some(Shape::from([2, 3, 4])));
        assert_eq!(
            Shape::broadcast(&Shape::scalar(), &rhs),
            Some(Shape::from([3, 1]))
        );
    }

    #[test]
    fn broadcast_rejects_mismatched_extents() {
        assert_eq!(Shape::broadcast(&Shape::from([2, 3]), &Shape::from([4])), None);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Shape::from([2, 3]).to_string(), "[2, 3]");
        assert_eq!(Shape::scalar().to_string(), "[]");
        assert_eq!(
            TensorType::new(DataType::I8, [6]).to_string(),
            "i8[6]"
        );
    }
}
