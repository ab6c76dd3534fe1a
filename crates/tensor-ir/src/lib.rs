//! Typed dataflow graph for a tensor-program compiler.
//!
//! Nodes are tensor operations, edges are tensor values flowing from an output connector to
//! input connectors. Passes dispatch on a node's [`Opcode`] and use [`Node::downcast_ref`] to
//! reach kind-specific attributes such as [`MemoryCopy::new_shape`].

pub mod config;
pub mod connector;
pub mod error;
pub mod graph;
pub mod node;
pub mod ops;
pub mod serialize;
pub mod types;
pub mod verify;

pub use config::VerifyConfig;
pub use connector::{InputConnector, InputPort, NodeId, OutputConnector, OutputPort, PortRef, Ports};
pub use error::{IrError, IrResult};
pub use graph::Graph;
pub use node::{Node, NodeKind, Opcode};
pub use ops::{
    Binary, BinaryOp, Constant, InputNode, MemoryCopy, OutputNode, Reduce, ReduceOp, Unary,
    UnaryOp,
};
pub use serialize::{GraphIoError, GraphSerdeError, IR_VERSION};
pub use types::{DataType, Shape, TensorType};
pub use verify::{collect_diagnostics, verify_graph, Diagnostic, DiagnosticCode, VerifyError};
