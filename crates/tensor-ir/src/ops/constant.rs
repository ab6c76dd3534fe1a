use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connector::{OutputConnector, Ports};
use crate::node::NodeKind;
use crate::types::{DataType, Shape, TensorType};

/// Tensor baked into the graph as raw little-endian bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub(crate) ports: Ports,
    data: Vec<u8>,
}

impl Constant {
    pub fn new(dtype: DataType, shape: impl Into<Shape>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            ports: Ports::new([], [TensorType::new(dtype, shape)]),
            data: data.into(),
        }
    }

    pub fn output(&self) -> &OutputConnector {
        self.output_at(0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn fmt_attrs(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}", self.data.len())
    }

    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        Ok(())
    }
}
