use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connector::{InputConnector, OutputConnector, Ports};
use crate::node::NodeKind;
use crate::types::{DataType, Shape, TensorType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReduceOp {
    Sum,
    Mean,
    Min,
    Max,
}

impl ReduceOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ReduceOp::Sum => "sum",
            ReduceOp::Mean => "mean",
            ReduceOp::Min => "min",
            ReduceOp::Max => "max",
        }
    }
}

/// Reduces the listed axes of its input.
///
/// The output shape is derived at construction: reduced axes are dropped, or kept with extent
/// 1 when `keep_dims` is set. Axes beyond the input rank do not affect the derived shape and
/// are reported by the verify pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reduce {
    pub(crate) ports: Ports,
    op: ReduceOp,
    axes: Vec<usize>,
    keep_dims: bool,
}

impl Reduce {
    pub fn new(
        op: ReduceOp,
        dtype: DataType,
        input_shape: impl Into<Shape>,
        axes: impl Into<Vec<usize>>,
        keep_dims: bool,
    ) -> Self {
        let input_shape = input_shape.into();
        let axes = axes.into();
        let output_shape = reduced_shape(&input_shape, &axes, keep_dims);
        Self {
            ports: Ports::new(
                [TensorType::new(dtype, input_shape)],
                [TensorType::new(dtype, output_shape)],
            ),
            op,
            axes,
            keep_dims,
        }
    }

    pub fn op(&self) -> ReduceOp {
        self.op
    }

    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub fn keep_dims(&self) -> bool {
        self.keep_dims
    }

    pub fn input(&self) -> &InputConnector {
        self.input_at(0)
    }

    pub fn output(&self) -> &OutputConnector {
        self.output_at(0)
    }

    pub(crate) fn fmt_attrs(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "op={} axes={:?} keep_dims={}",
            self.op.as_str(),
            self.axes,
            self.keep_dims
        )
    }

    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        let input = self.input().tensor_type();
        let output = self.output().tensor_type();
        if input.dtype != output.dtype {
            return Err(format!(
                "reduce input dtype {} and output dtype {} differ",
                input.dtype, output.dtype
            ));
        }
        let expected = reduced_shape(&input.shape, &self.axes, self.keep_dims);
        if output.shape != expected {
            return Err(format!(
                "reduce output shape {} does not match derived shape {expected}",
                output.shape
            ));
        }
        Ok(())
    }
}

fn reduced_shape(input: &Shape, axes: &[usize], keep_dims: bool) -> Shape {
    let mut dims = Vec::with_capacity(input.rank());
    for (axis, &extent) in input.dims().iter().enumerate() {
        if !axes.contains(&axis) {
            dims.push(extent);
        } else if keep_dims {
            dims.push(1);
        }
    }
    Shape::new(dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduced_shape_drops_axes() {
        let shape = Shape::from([2, 3, 4]);
        assert_eq!(reduced_shape(&shape, &[1], false), Shape::from([2, 4]));
        assert_eq!(reduced_shape(&shape, &[0, 2], true), Shape::from([1, 3, 1]));
        assert_eq!(reduced_shape(&shape, &[0, 1, 2], false), Shape::scalar());
    }

    #[test]
    fn reduced_shape_ignores_axes_beyond_rank() {
        let shape = Shape::from([5, 6]);
        assert_eq!(reduced_shape(&shape, &[7], false), shape);
    }
}
