use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connector::{InputConnector, OutputConnector, Ports};
use crate::node::NodeKind;
use crate::types::{DataType, Shape, TensorType};

/// Copies its input into a new buffer laid out as `new_shape`.
///
/// A copy whose `new_shape` differs from the input shape is a reshape (e.g. flattening `[2, 3]`
/// into `[6]`); differing dtypes reinterpret the bytes. The node does not check that element
/// counts or byte sizes line up, so transient states built by rewrites stay representable.
/// The verify pass owns that check.
///
/// `new_shape` is the shape of the output connector; it is not stored a second time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCopy {
    pub(crate) ports: Ports,
}

impl MemoryCopy {
    pub fn new(
        input_type: DataType,
        input_shape: impl Into<Shape>,
        output_type: DataType,
        new_shape: impl Into<Shape>,
    ) -> Self {
        let ports = Ports::new(
            [TensorType::new(input_type, input_shape)],
            [TensorType::new(output_type, new_shape)],
        );
        Self { ports }
    }

    pub fn input(&self) -> &InputConnector {
        self.input_at(0)
    }

    pub fn output(&self) -> &OutputConnector {
        self.output_at(0)
    }

    /// Shape of the output buffer. Fixed for the lifetime of the node.
    pub fn new_shape(&self) -> &Shape {
        self.output().shape()
    }

    pub fn is_reshape(&self) -> bool {
        self.input().shape() != self.new_shape()
    }

    pub fn is_reinterpret(&self) -> bool {
        self.input().dtype() != self.output().dtype()
    }

    pub(crate) fn fmt_attrs(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "new_shape={}", self.new_shape())
    }

    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        Ok(())
    }
}
