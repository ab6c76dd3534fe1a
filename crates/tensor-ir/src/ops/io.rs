use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connector::{InputConnector, OutputConnector, Ports};
use crate::node::NodeKind;
use crate::types::{DataType, Shape, TensorType};

/// Graph parameter. Its single output carries the tensor supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputNode {
    pub(crate) ports: Ports,
}

impl InputNode {
    pub fn new(dtype: DataType, shape: impl Into<Shape>) -> Self {
        Self {
            ports: Ports::new([], [TensorType::new(dtype, shape)]),
        }
    }

    pub fn output(&self) -> &OutputConnector {
        self.output_at(0)
    }

    pub(crate) fn fmt_attrs(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }

    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Graph result. Consumes one tensor and produces nothing inside the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputNode {
    pub(crate) ports: Ports,
}

impl OutputNode {
    pub fn new(dtype: DataType, shape: impl Into<Shape>) -> Self {
        Self {
            ports: Ports::new([TensorType::new(dtype, shape)], []),
        }
    }

    pub fn input(&self) -> &InputConnector {
        self.input_at(0)
    }

    pub(crate) fn fmt_attrs(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }

    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        Ok(())
    }
}
