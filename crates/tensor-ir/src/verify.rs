//! Graph validation pass.
//!
//! Node construction and edge operations accept any dtype/shape combination so rewrites can
//! pass through inconsistent intermediate states. This pass is where those combinations are
//! checked: every finding names the offending node and, when one applies, the connector.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::VerifyConfig;
use crate::connector::{InputPort, NodeId, PortRef};
use crate::error::IrError;
use crate::graph::Graph;
use crate::node::{Node, NodeKind, Opcode};
use crate::ops::{Binary, Constant, MemoryCopy, Reduce};
use crate::types::Shape;

/// Stable identifiers for verification findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    UnconnectedInput,
    DTypeMismatch,
    ShapeMismatch,
    ElementCountMismatch,
    ReinterpretSizeMismatch,
    BroadcastMismatch,
    AxisOutOfRange,
    DuplicateAxis,
    ConstantSizeMismatch,
    Cycle,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::UnconnectedInput => "unconnected input",
            DiagnosticCode::DTypeMismatch => "dtype mismatch",
            DiagnosticCode::ShapeMismatch => "shape mismatch",
            DiagnosticCode::ElementCountMismatch => "element count mismatch",
            DiagnosticCode::ReinterpretSizeMismatch => "reinterpret size mismatch",
            DiagnosticCode::BroadcastMismatch => "broadcast mismatch",
            DiagnosticCode::AxisOutOfRange => "axis out of range",
            DiagnosticCode::DuplicateAxis => "duplicate axis",
            DiagnosticCode::ConstantSizeMismatch => "constant size mismatch",
            DiagnosticCode::Cycle => "cycle",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One verification finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub node: NodeId,
    pub opcode: Opcode,
    pub port: Option<PortRef>,
    pub code: DiagnosticCode,
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(
                f,
                "{} ({}) at {port}: {}: {}",
                self.node, self.opcode, self.code, self.detail
            ),
            None => write!(
                f,
                "{} ({}): {}: {}",
                self.node, self.opcode, self.code, self.detail
            ),
        }
    }
}

/// Verification failure carrying every finding, in node order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("graph verification failed: {}", summarize(.diagnostics))]
pub struct VerifyError {
    pub diagnostics: Vec<Diagnostic>,
}

impl VerifyError {
    pub fn has(&self, code: DiagnosticCode) -> bool {
        self.diagnostics.iter().any(|diag| diag.code == code)
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "no diagnostics".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// Runs every check and fails when any of them reports a finding.
pub fn verify_graph(graph: &Graph, config: &VerifyConfig) -> Result<(), VerifyError> {
    let diagnostics = collect_diagnostics(graph, config);
    if diagnostics.is_empty() {
        debug!(nodes = graph.len(), "graph verified");
        return Ok(());
    }
    warn!(
        count = diagnostics.len(),
        first = %diagnostics[0],
        "graph verification failed"
    );
    Err(VerifyError { diagnostics })
}

/// Runs every check and returns all findings without failing.
pub fn collect_diagnostics(graph: &Graph, config: &VerifyConfig) -> Vec<Diagnostic> {
    let mut sink = Sink::default();
    for (id, node) in graph.iter() {
        check_edges(graph, id, node, config, &mut sink);
        match node {
            Node::MemoryCopy(copy) => check_memory_copy(id, copy, config, &mut sink),
            Node::Binary(binary) => check_binary(id, binary, &mut sink),
            Node::Reduce(reduce) => check_reduce(id, reduce, &mut sink),
            Node::Constant(constant) => check_constant(id, constant, &mut sink),
            Node::Input(_) | Node::Output(_) | Node::Unary(_) => {}
        }
    }
    if let Err(IrError::Cycle { node }) = graph.topological_order() {
        let Some(opcode) = graph.get(node).map(Node::opcode) else {
            return sink.diagnostics;
        };
        sink.push(
            node,
            opcode,
            None,
            DiagnosticCode::Cycle,
            "node is reachable from its own output",
        );
    }
    sink.diagnostics
}

#[derive(Default)]
struct Sink {
    diagnostics: Vec<Diagnostic>,
}

impl Sink {
    fn push(
        &mut self,
        node: NodeId,
        opcode: Opcode,
        port: Option<PortRef>,
        code: DiagnosticCode,
        detail: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            node,
            opcode,
            port,
            code,
            detail: detail.into(),
        });
    }
}

fn check_edges(graph: &Graph, id: NodeId, node: &Node, config: &VerifyConfig, sink: &mut Sink) {
    let opcode = node.opcode();
    for (index, input) in node.inputs().iter().enumerate() {
        let port = Some(PortRef::Input(InputPort { node: id, index }));
        let Some(from) = input.connection() else {
            if config.require_connected_inputs {
                sink.push(
                    id,
                    opcode,
                    port,
                    DiagnosticCode::UnconnectedInput,
                    "input has no producer",
                );
            }
            continue;
        };
        let Ok(producer) = graph.output(from) else {
            continue;
        };
        if producer.dtype() != input.dtype() {
            sink.push(
                id,
                opcode,
                port,
                DiagnosticCode::DTypeMismatch,
                format!(
                    "{from} produces {} but input expects {}",
                    producer.dtype(),
                    input.dtype()
                ),
            );
        }
        if producer.shape() != input.shape() {
            sink.push(
                id,
                opcode,
                port,
                DiagnosticCode::ShapeMismatch,
                format!(
                    "{from} produces {} but input expects {}",
                    producer.shape(),
                    input.shape()
                ),
            );
        }
    }
}

fn check_memory_copy(id: NodeId, copy: &MemoryCopy, config: &VerifyConfig, sink: &mut Sink) {
    let input = copy.input().tensor_type();
    let output = copy.output().tensor_type();

    if input.dtype == output.dtype {
        match (input.element_count(), output.element_count()) {
            (Some(from), Some(to)) if from == to => {}
            (Some(_), Some(_)) => sink.push(
                id,
                MemoryCopy::OPCODE,
                None,
                DiagnosticCode::ElementCountMismatch,
                format!("cannot copy {} into {}", input.shape, copy.new_shape()),
            ),
            _ => sink.push(
                id,
                MemoryCopy::OPCODE,
                None,
                DiagnosticCode::ElementCountMismatch,
                format!(
                    "element count of {} or {} overflows",
                    input.shape,
                    copy.new_shape()
                ),
            ),
        }
        return;
    }

    if !config.allow_reinterpret_copy {
        sink.push(
            id,
            MemoryCopy::OPCODE,
            None,
            DiagnosticCode::DTypeMismatch,
            format!(
                "copy changes dtype from {} to {} but reinterpretation is disabled",
                input.dtype, output.dtype
            ),
        );
        return;
    }

    match (input.byte_len(), output.byte_len()) {
        (Some(from), Some(to)) if from == to => {}
        _ => sink.push(
            id,
            MemoryCopy::OPCODE,
            None,
            DiagnosticCode::ReinterpretSizeMismatch,
            format!("{input} and {output} do not occupy the same known byte size"),
        ),
    }
}

fn check_binary(id: NodeId, binary: &Binary, sink: &mut Sink) {
    let lhs = binary.lhs().shape();
    let rhs = binary.rhs().shape();
    let output = binary.output().shape();
    match Shape::broadcast(lhs, rhs) {
        Some(expected) if &expected == output => {}
        Some(expected) => sink.push(
            id,
            Binary::OPCODE,
            None,
            DiagnosticCode::BroadcastMismatch,
            format!("operands broadcast to {expected} but output is {output}"),
        ),
        None => sink.push(
            id,
            Binary::OPCODE,
            None,
            DiagnosticCode::BroadcastMismatch,
            format!("operands {lhs} and {rhs} cannot be broadcast"),
        ),
    }
}

fn check_reduce(id: NodeId, reduce: &Reduce, sink: &mut Sink) {
    let rank = reduce.input().shape().rank();
    let mut seen = Vec::with_capacity(reduce.axes().len());
    for &axis in reduce.axes() {
        if axis >= rank {
            sink.push(
                id,
                Reduce::OPCODE,
                None,
                DiagnosticCode::AxisOutOfRange,
                format!("axis {axis} is out of range for rank {rank}"),
            );
        }
        if seen.contains(&axis) {
            sink.push(
                id,
                Reduce::OPCODE,
                None,
                DiagnosticCode::DuplicateAxis,
                format!("axis {axis} is listed more than once"),
            );
        }
        seen.push(axis);
    }
}

fn check_constant(id: NodeId, constant: &Constant, sink: &mut Sink) {
    let ty = constant.output().tensor_type();
    match ty.byte_len() {
        Some(expected) if expected == constant.data().len() => {}
        expected => sink.push(
            id,
            Constant::OPCODE,
            None,
            DiagnosticCode::ConstantSizeMismatch,
            match expected {
                Some(expected) => format!(
                    "{ty} needs {expected} bytes but {} were provided",
                    constant.data().len()
                ),
                None => format!("byte length of {ty} overflows"),
            },
        ),
    }
}
