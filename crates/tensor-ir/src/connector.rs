//! Typed attachment points on nodes and the handles used to address them.
//!
//! Connectors never own their node. A connector is addressed by a port, `(node, index)`,
//! where the node half is a generational arena handle issued by [`Graph`](crate::graph::Graph).
//! Removing a node bumps the slot generation, so every port on it becomes detectably stale.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::types::{DataType, Shape, TensorType};

/// Stable identifier of a node inside a graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Port addressing the `index`-th input connector of this node.
    pub fn input(self, index: usize) -> InputPort {
        InputPort { node: self, index }
    }

    /// Port addressing the `index`-th output connector of this node.
    pub fn output(self, index: usize) -> OutputPort {
        OutputPort { node: self, index }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "%{}", self.index)
        } else {
            write!(f, "%{}.{}", self.index, self.generation)
        }
    }
}

/// Address of an input connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputPort {
    pub node: NodeId,
    pub index: usize,
}

impl fmt::Display for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.in{}", self.node, self.index)
    }
}

/// Address of an output connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputPort {
    pub node: NodeId,
    pub index: usize,
}

impl fmt::Display for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.out{}", self.node, self.index)
    }
}

/// Either side of an edge, used when diagnostics point at a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortRef {
    Input(InputPort),
    Output(OutputPort),
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRef::Input(port) => port.fmt(f),
            PortRef::Output(port) => port.fmt(f),
        }
    }
}

/// Consuming side of an edge. Holds at most one producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConnector {
    ty: TensorType,
    connection: Option<OutputPort>,
}

impl InputConnector {
    pub fn new(ty: TensorType) -> Self {
        Self {
            ty,
            connection: None,
        }
    }

    pub fn tensor_type(&self) -> &TensorType {
        &self.ty
    }

    pub fn dtype(&self) -> DataType {
        self.ty.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.ty.shape
    }

    /// Producer currently feeding this input, if any.
    pub fn connection(&self) -> Option<OutputPort> {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub(crate) fn set_connection(&mut self, from: Option<OutputPort>) -> Option<OutputPort> {
        std::mem::replace(&mut self.connection, from)
    }
}

/// Producing side of an edge. Fans out to any number of inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConnector {
    ty: TensorType,
    connections: SmallVec<[InputPort; 4]>,
}

impl OutputConnector {
    pub fn new(ty: TensorType) -> Self {
        Self {
            ty,
            connections: SmallVec::new(),
        }
    }

    pub fn tensor_type(&self) -> &TensorType {
        &self.ty
    }

    pub fn dtype(&self) -> DataType {
        self.ty.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.ty.shape
    }

    /// Consumers of this output in connection order.
    pub fn connections(&self) -> &[InputPort] {
        &self.connections
    }

    pub(crate) fn add_connection(&mut self, to: InputPort) {
        if !self.connections.contains(&to) {
            self.connections.push(to);
        }
    }

    pub(crate) fn remove_connection(&mut self, to: InputPort) -> bool {
        match self.connections.iter().position(|port| *port == to) {
            Some(pos) => {
                self.connections.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_connections(&mut self) -> SmallVec<[InputPort; 4]> {
        std::mem::take(&mut self.connections)
    }
}

/// Ordered connector lists of a node, sized once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports {
    inputs: SmallVec<[InputConnector; 2]>,
    outputs: SmallVec<[OutputConnector; 1]>,
}

impl Ports {
    pub fn new(
        inputs: impl IntoIterator<Item = TensorType>,
        outputs: impl IntoIterator<Item = TensorType>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(InputConnector::new).collect(),
            outputs: outputs.into_iter().map(OutputConnector::new).collect(),
        }
    }

    pub fn inputs(&self) -> &[InputConnector] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputConnector] {
        &self.outputs
    }

    pub fn try_input_at(&self, index: usize) -> Option<&InputConnector> {
        self.inputs.get(index)
    }

    pub fn try_output_at(&self, index: usize) -> Option<&OutputConnector> {
        self.outputs.get(index)
    }

    pub(crate) fn input_mut(&mut self, index: usize) -> Option<&mut InputConnector> {
        self.inputs.get_mut(index)
    }

    pub(crate) fn output_mut(&mut self, index: usize) -> Option<&mut OutputConnector> {
        self.outputs.get_mut(index)
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut [InputConnector] {
        &mut self.inputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [OutputConnector] {
        &mut self.outputs
    }
}
