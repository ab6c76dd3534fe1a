//! Polymorphic graph vertex and opcode classification.
//!
//! Every concrete node kind is listed exactly once in [`define_node_kinds!`]. The macro expands
//! that list into the [`Opcode`] tag enum, the [`Node`] sum type and one [`NodeKind`] impl per
//! kind, so the opcode reported by a node is always derived from the variant it was built as.
//! Passes dispatch on [`Node::opcode`] and recover the concrete kind through
//! [`Node::downcast_ref`], which refuses any kind other than the one the node was built as.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connector::{InputConnector, OutputConnector, Ports};
use crate::error::{IrError, IrResult};
use crate::ops::{Binary, Constant, InputNode, MemoryCopy, OutputNode, Reduce, Unary};

mod sealed {
    pub trait Sealed {}
}

/// Contract shared by every concrete node kind.
///
/// Arity is a static property of the kind: constructors allocate exactly `INPUTS` input
/// connectors and `OUTPUTS` output connectors.
pub trait NodeKind: sealed::Sealed + Into<Node> + Sized {
    const OPCODE: Opcode;
    const INPUTS: usize;
    const OUTPUTS: usize;

    /// Borrows the kind out of `node` when the variants agree.
    fn from_node(node: &Node) -> Option<&Self>;

    /// Moves the kind out of `node`, handing the node back unchanged on mismatch.
    fn from_node_owned(node: Node) -> Result<Self, Node>;

    fn ports(&self) -> &Ports;

    fn inputs(&self) -> &[InputConnector] {
        self.ports().inputs()
    }

    fn outputs(&self) -> &[OutputConnector] {
        self.ports().outputs()
    }

    /// Returns the input connector at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= Self::INPUTS`.
    #[track_caller]
    fn input_at(&self, index: usize) -> &InputConnector {
        match self.ports().try_input_at(index) {
            Some(connector) => connector,
            None => connector_out_of_range("input", Self::OPCODE, index, Self::INPUTS),
        }
    }

    /// Returns the output connector at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= Self::OUTPUTS`.
    #[track_caller]
    fn output_at(&self, index: usize) -> &OutputConnector {
        match self.ports().try_output_at(index) {
            Some(connector) => connector,
            None => connector_out_of_range("output", Self::OPCODE, index, Self::OUTPUTS),
        }
    }
}

#[track_caller]
fn connector_out_of_range(direction: &str, opcode: Opcode, index: usize, arity: usize) -> ! {
    panic!("{direction} index {index} out of range for {opcode} node with arity {arity}")
}

macro_rules! define_node_kinds {
    ($(
        $(#[$meta:meta])*
        $variant:ident($kind:ident) = $code:literal, $name:literal,
            inputs: $inputs:literal, outputs: $outputs:literal;
    )+) => {
        /// Compile-time tag identifying a node's concrete kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u16)]
        pub enum Opcode {
            $($(#[$meta])* $variant = $code,)+
        }

        impl Opcode {
            /// Every opcode, in declaration order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)+];

            pub fn code(self) -> u16 {
                self as u16
            }

            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Opcode::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)+
                }
            }

            /// Fixed number of input connectors carried by nodes with this opcode.
            pub fn input_arity(self) -> usize {
                match self {
                    $(Opcode::$variant => $inputs,)+
                }
            }

            /// Fixed number of output connectors carried by nodes with this opcode.
            pub fn output_arity(self) -> usize {
                match self {
                    $(Opcode::$variant => $outputs,)+
                }
            }
        }

        /// Graph vertex: a closed sum over every concrete node kind.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum Node {
            $($(#[$meta])* $variant($kind),)+
        }

        impl Node {
            /// Tag of the concrete kind. Derived from the variant, never stored separately.
            pub fn opcode(&self) -> Opcode {
                match self {
                    $(Node::$variant(_) => Opcode::$variant,)+
                }
            }

            pub fn ports(&self) -> &Ports {
                match self {
                    $(Node::$variant(kind) => &kind.ports,)+
                }
            }

            pub(crate) fn ports_mut(&mut self) -> &mut Ports {
                match self {
                    $(Node::$variant(kind) => &mut kind.ports,)+
                }
            }

            fn fmt_attrs(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Node::$variant(kind) => kind.fmt_attrs(f),)+
                }
            }

            /// Re-checks the connector types a kind's constructor derives, for nodes that
            /// did not come from a constructor (decoded archives).
            pub(crate) fn check_invariants(&self) -> Result<(), String> {
                match self {
                    $(Node::$variant(kind) => kind.check_invariants(),)+
                }
            }
        }

        $(
            impl sealed::Sealed for $kind {}

            impl NodeKind for $kind {
                const OPCODE: Opcode = Opcode::$variant;
                const INPUTS: usize = $inputs;
                const OUTPUTS: usize = $outputs;

                fn from_node(node: &Node) -> Option<&Self> {
                    match node {
                        Node::$variant(kind) => Some(kind),
                        _ => None,
                    }
                }

                fn from_node_owned(node: Node) -> Result<Self, Node> {
                    match node {
                        Node::$variant(kind) => Ok(kind),
                        other => Err(other),
                    }
                }

                fn ports(&self) -> &Ports {
                    &self.ports
                }
            }

            impl From<$kind> for Node {
                fn from(kind: $kind) -> Self {
                    Node::$variant(kind)
                }
            }
        )+
    };
}

define_node_kinds! {
    /// Graph entry point producing a caller-supplied tensor.
    Input(InputNode) = 0x0001, "input", inputs: 0, outputs: 1;
    /// Graph exit point consuming a result tensor.
    Output(OutputNode) = 0x0002, "output", inputs: 1, outputs: 0;
    Constant(Constant) = 0x0003, "constant", inputs: 0, outputs: 1;
    Unary(Unary) = 0x0010, "unary", inputs: 1, outputs: 1;
    Binary(Binary) = 0x0011, "binary", inputs: 2, outputs: 1;
    Reduce(Reduce) = 0x0012, "reduce", inputs: 1, outputs: 1;
    /// Layout-changing copy into a new shape.
    MemoryCopy(MemoryCopy) = 0x0020, "memory_copy", inputs: 1, outputs: 1;
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Node {
    pub fn inputs(&self) -> &[InputConnector] {
        self.ports().inputs()
    }

    pub fn outputs(&self) -> &[OutputConnector] {
        self.ports().outputs()
    }

    pub fn input_count(&self) -> usize {
        self.inputs().len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs().len()
    }

    /// Returns the input connector at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is outside the node's input arity.
    #[track_caller]
    pub fn input_at(&self, index: usize) -> &InputConnector {
        match self.ports().try_input_at(index) {
            Some(connector) => connector,
            None => connector_out_of_range("input", self.opcode(), index, self.input_count()),
        }
    }

    /// Returns the output connector at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is outside the node's output arity.
    #[track_caller]
    pub fn output_at(&self, index: usize) -> &OutputConnector {
        match self.ports().try_output_at(index) {
            Some(connector) => connector,
            None => connector_out_of_range("output", self.opcode(), index, self.output_count()),
        }
    }

    pub fn try_input_at(&self, index: usize) -> Option<&InputConnector> {
        self.ports().try_input_at(index)
    }

    pub fn try_output_at(&self, index: usize) -> Option<&OutputConnector> {
        self.ports().try_output_at(index)
    }

    pub fn is<K: NodeKind>(&self) -> bool {
        self.opcode() == K::OPCODE
    }

    /// Checked downcast to the concrete kind `K`.
    pub fn downcast_ref<K: NodeKind>(&self) -> IrResult<&K> {
        K::from_node(self).ok_or(IrError::OpcodeMismatch {
            expected: K::OPCODE,
            found: self.opcode(),
        })
    }

    /// Consumes the node, returning the concrete kind or the untouched node on mismatch.
    pub fn into_kind<K: NodeKind>(self) -> Result<K, Node> {
        K::from_node_owned(self)
    }

    /// Renders kind-specific attributes, e.g. `new_shape=[6]`. Empty for attribute-free kinds.
    pub fn attributes(&self) -> String {
        struct Attrs<'a>(&'a Node);
        impl fmt::Display for Attrs<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt_attrs(f)
            }
        }
        Attrs(self).to_string()
    }
}
