use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connector::{InputConnector, OutputConnector, Ports};
use crate::error::{IrError, IrResult};
use crate::node::NodeKind;
use crate::types::{DataType, Shape, TensorType};

/// Elementwise unary functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Abs,
    Neg,
    Exp,
    Log,
    Sqrt,
    Rsqrt,
    Square,
    Ceil,
    Floor,
    Round,
    Sin,
    Cos,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Abs => "abs",
            UnaryOp::Neg => "neg",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Rsqrt => "rsqrt",
            UnaryOp::Square => "square",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Floor => "floor",
            UnaryOp::Round => "round",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
        }
    }
}

/// Elementwise binary functions with broadcasting operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
        }
    }
}

/// Applies a [`UnaryOp`] to every element; input and output share one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unary {
    pub(crate) ports: Ports,
    op: UnaryOp,
}

impl Unary {
    pub fn new(op: UnaryOp, dtype: DataType, shape: impl Into<Shape>) -> Self {
        let ty = TensorType::new(dtype, shape);
        Self {
            ports: Ports::new([ty.clone()], [ty]),
            op,
        }
    }

    pub fn op(&self) -> UnaryOp {
        self.op
    }

    pub fn input(&self) -> &InputConnector {
        self.input_at(0)
    }

    pub fn output(&self) -> &OutputConnector {
        self.output_at(0)
    }

    pub(crate) fn fmt_attrs(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op={}", self.op.as_str())
    }

    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        let input = self.input().tensor_type();
        let output = self.output().tensor_type();
        if input != output {
            return Err(format!("unary input {input} and output {output} differ"));
        }
        Ok(())
    }
}

/// Combines two operands elementwise into one output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary {
    pub(crate) ports: Ports,
    op: BinaryOp,
}

impl Binary {
    /// Builds the node with an explicit output shape. Broadcast agreement is not checked here.
    pub fn new(
        op: BinaryOp,
        dtype: DataType,
        lhs_shape: impl Into<Shape>,
        rhs_shape: impl Into<Shape>,
        output_shape: impl Into<Shape>,
    ) -> Self {
        Self {
            ports: Ports::new(
                [
                    TensorType::new(dtype, lhs_shape),
                    TensorType::new(dtype, rhs_shape),
                ],
                [TensorType::new(dtype, output_shape)],
            ),
            op,
        }
    }

    /// Builds the node with the output shape derived by broadcasting `lhs` against `rhs`.
    pub fn broadcast(
        op: BinaryOp,
        dtype: DataType,
        lhs_shape: impl Into<Shape>,
        rhs_shape: impl Into<Shape>,
    ) -> IrResult<Self> {
        let lhs = lhs_shape.into();
        let rhs = rhs_shape.into();
        let Some(output) = Shape::broadcast(&lhs, &rhs) else {
            return Err(IrError::BroadcastIncompatible { lhs, rhs });
        };
        Ok(Self::new(op, dtype, lhs, rhs, output))
    }

    pub fn op(&self) -> BinaryOp {
        self.op
    }

    pub fn lhs(&self) -> &InputConnector {
        self.input_at(0)
    }

    pub fn rhs(&self) -> &InputConnector {
        self.input_at(1)
    }

    pub fn output(&self) -> &OutputConnector {
        self.output_at(0)
    }

    pub(crate) fn fmt_attrs(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op={}", self.op.as_str())
    }

    /// Shapes may disagree until verification; the dtype is shared by construction.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        let dtype = self.output().dtype();
        if self.lhs().dtype() != dtype || self.rhs().dtype() != dtype {
            return Err(format!(
                "binary operands {} and {} do not share output dtype {dtype}",
                self.lhs().dtype(),
                self.rhs().dtype()
            ));
        }
        Ok(())
    }
}
