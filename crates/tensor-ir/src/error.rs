use thiserror::Error;

use crate::connector::NodeId;
use crate::node::Opcode;
use crate::types::Shape;

/// Contract violations reported by the node and graph layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("node {node} is not part of the graph (removed or never inserted)")]
    StaleNode { node: NodeId },
    #[error("input index {index} out of range for node {node} with {arity} input(s)")]
    InputIndexOutOfRange {
        node: NodeId,
        index: usize,
        arity: usize,
    },
    #[error("output index {index} out of range for node {node} with {arity} output(s)")]
    OutputIndexOutOfRange {
        node: NodeId,
        index: usize,
        arity: usize,
    },
    #[error("opcode mismatch: expected {expected}, found {found}")]
    OpcodeMismatch { expected: Opcode, found: Opcode },
    #[error("graph contains a cycle through node {node}")]
    Cycle { node: NodeId },
    #[error("shapes {lhs} and {rhs} cannot be broadcast together")]
    BroadcastIncompatible { lhs: Shape, rhs: Shape },
}

/// Convenience alias for results returned by graph routines.
pub type IrResult<T> = Result<T, IrError>;
