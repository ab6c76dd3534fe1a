//! Arena that owns every node of a dataflow graph and the edges between their connectors.
//!
//! Nodes live in generational slots. A [`NodeId`] stays valid until its node is removed; after
//! that every lookup through it (or through a port built from it) fails with
//! [`IrError::StaleNode`], even when the slot is recycled for a new node.
//!
//! Edge operations keep both ends of a link in sync: an input connector records its producer
//! and the producer's output connector lists the input among its consumers. No edge operation
//! looks at dtypes or shapes; that is the job of [`crate::verify`].

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::connector::{InputConnector, InputPort, NodeId, OutputConnector, OutputPort};
use crate::error::{IrError, IrResult};
use crate::node::{Node, NodeKind};
use crate::ops::{InputNode, OutputNode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Single-owner container for nodes and their connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a node and returns its fresh identity.
    ///
    /// Any links carried by `node` (e.g. a clone of a node from another graph) are dropped;
    /// edges only come into being through [`Graph::connect`].
    ///
    /// # Panics
    ///
    /// Panics when the arena would need more than `u32::MAX` slots.
    pub fn add_node(&mut self, node: impl Into<Node>) -> NodeId {
        let mut node = node.into();
        clear_links(&mut node);
        let opcode = node.opcode();
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId::new(index, slot.generation)
            }
            None => {
                let index = u32::try_from(self.slots.len())
                    .expect("graph arena exceeds u32::MAX node slots");
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId::new(index, 0)
            }
        };
        self.len += 1;
        debug!(node = %id, %opcode, "node inserted");
        id
    }

    /// Detaches every edge touching `id`, then removes the node and returns it without links.
    pub fn remove_node(&mut self, id: NodeId) -> IrResult<Node> {
        let input_count = self.node(id)?.input_count();
        for index in 0..input_count {
            self.disconnect(id.input(index))?;
        }

        let output_count = self.node(id)?.output_count();
        for index in 0..output_count {
            let consumers = self.output_mut(id.output(index))?.take_connections();
            for port in consumers {
                if let Ok(input) = self.input_mut(port) {
                    input.set_connection(None);
                }
            }
        }

        let slot = &mut self.slots[id.index()];
        let node = slot.node.take().ok_or(IrError::StaleNode { node: id })?;
        // Exhausted slots are retired and never rejoin the free list.
        match slot.generation.checked_add(1) {
            Some(generation) => {
                slot.generation = generation;
                self.free.push(id.index() as u32);
            }
            None => debug!(node = %id, "slot retired"),
        }
        self.len -= 1;
        debug!(node = %id, opcode = %node.opcode(), "node removed");
        Ok(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    /// Returns the node behind `id`, or [`IrError::StaleNode`] once it has been removed.
    pub fn node(&self, id: NodeId) -> IrResult<&Node> {
        self.get(id).ok_or(IrError::StaleNode { node: id })
    }

    /// Looks up `id` and downcasts it to the concrete kind `K`.
    pub fn node_as<K: NodeKind>(&self, id: NodeId) -> IrResult<&K> {
        self.node(id)?.downcast_ref::<K>()
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeId::new(index as u32, slot.generation), node))
        })
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// Identifiers of all [`InputNode`]s in slot order.
    pub fn graph_inputs(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.is::<InputNode>())
            .map(|(id, _)| id)
            .collect()
    }

    /// Identifiers of all [`OutputNode`]s in slot order.
    pub fn graph_outputs(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.is::<OutputNode>())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn input(&self, port: InputPort) -> IrResult<&InputConnector> {
        let node = self.node(port.node)?;
        node.try_input_at(port.index)
            .ok_or(IrError::InputIndexOutOfRange {
                node: port.node,
                index: port.index,
                arity: node.input_count(),
            })
    }

    pub fn output(&self, port: OutputPort) -> IrResult<&OutputConnector> {
        let node = self.node(port.node)?;
        node.try_output_at(port.index)
            .ok_or(IrError::OutputIndexOutOfRange {
                node: port.node,
                index: port.index,
                arity: node.output_count(),
            })
    }

    fn input_mut(&mut self, port: InputPort) -> IrResult<&mut InputConnector> {
        let node = self
            .get_mut(port.node)
            .ok_or(IrError::StaleNode { node: port.node })?;
        let arity = node.input_count();
        node.ports_mut()
            .input_mut(port.index)
            .ok_or(IrError::InputIndexOutOfRange {
                node: port.node,
                index: port.index,
                arity,
            })
    }

    fn output_mut(&mut self, port: OutputPort) -> IrResult<&mut OutputConnector> {
        let node = self
            .get_mut(port.node)
            .ok_or(IrError::StaleNode { node: port.node })?;
        let arity = node.output_count();
        node.ports_mut()
            .output_mut(port.index)
            .ok_or(IrError::OutputIndexOutOfRange {
                node: port.node,
                index: port.index,
                arity,
            })
    }

    /// Producer feeding `to`, if connected.
    pub fn producer_of(&self, to: InputPort) -> IrResult<Option<OutputPort>> {
        Ok(self.input(to)?.connection())
    }

    /// Consumers reading `from`, in connection order.
    pub fn consumers_of(&self, from: OutputPort) -> IrResult<&[InputPort]> {
        Ok(self.output(from)?.connections())
    }

    /// Links `from` to `to`. An existing producer of `to` is detached first.
    pub fn connect(&mut self, from: OutputPort, to: InputPort) -> IrResult<()> {
        self.output(from)?;
        let previous = self.input_mut(to)?.set_connection(Some(from));
        match previous {
            Some(previous) if previous == from => return Ok(()),
            Some(previous) => {
                if let Ok(output) = self.output_mut(previous) {
                    output.remove_connection(to);
                }
                trace!(%previous, %to, "detached previous producer");
            }
            None => {}
        }
        self.output_mut(from)?.add_connection(to);
        trace!(%from, %to, "connected");
        Ok(())
    }

    /// Unlinks `to` from its producer, returning the producer it had.
    pub fn disconnect(&mut self, to: InputPort) -> IrResult<Option<OutputPort>> {
        let previous = self.input_mut(to)?.set_connection(None);
        if let Some(from) = previous {
            if let Ok(output) = self.output_mut(from) {
                output.remove_connection(to);
            }
            trace!(%from, %to, "disconnected");
        }
        Ok(previous)
    }

    /// Moves every consumer of `from` over to `to`, returning how many inputs were rewired.
    ///
    /// Inputs that belong to the node owning `to` keep reading `from`, so a node inserted
    /// behind `from` can take over its uses without feeding itself.
    pub fn replace_all_uses(&mut self, from: OutputPort, to: OutputPort) -> IrResult<usize> {
        self.output(to)?;
        if from == to {
            return Ok(0);
        }
        let consumers = self.output_mut(from)?.take_connections();
        let mut moved = 0usize;
        for port in consumers {
            if port.node == to.node {
                self.output_mut(from)?.add_connection(port);
                continue;
            }
            self.input_mut(port)?.set_connection(Some(to));
            self.output_mut(to)?.add_connection(port);
            moved += 1;
        }
        debug!(%from, %to, count = moved, "uses replaced");
        Ok(moved)
    }

    /// Orders live nodes so every producer precedes its consumers.
    ///
    /// Ties are broken by slot order, so the result is deterministic for a given graph.
    pub fn topological_order(&self) -> IrResult<Vec<NodeId>> {
        let mut pending = vec![0usize; self.slots.len()];
        let mut ready = VecDeque::new();
        for (id, node) in self.iter() {
            let count = node
                .inputs()
                .iter()
                .filter(|input| input.connection().is_some())
                .count();
            pending[id.index()] = count;
            if count == 0 {
                ready.push_back(id);
            }
        }

        let mut order = Vec::with_capacity(self.len);
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for output in self.node(id)?.outputs() {
                for consumer in output.connections() {
                    let slot = &mut pending[consumer.node.index()];
                    *slot -= 1;
                    if *slot == 0 {
                        ready.push_back(consumer.node);
                    }
                }
            }
        }

        if let Some(stuck) = self.node_ids().find(|id| pending[id.index()] > 0) {
            return Err(IrError::Cycle { node: stuck });
        }
        Ok(order)
    }

    /// Checks that the arena and every link are self-consistent.
    ///
    /// Used after decoding a graph, where the in-memory invariants were not maintained by
    /// the edge operations.
    pub(crate) fn check_integrity(&self) -> Result<(), String> {
        let live = self.slots.iter().filter(|slot| slot.node.is_some()).count();
        if live != self.len {
            return Err(format!(
                "node count {} does not match {live} occupied slots",
                self.len
            ));
        }

        let mut seen_free = vec![false; self.slots.len()];
        for &index in &self.free {
            let Some(slot) = self.slots.get(index as usize) else {
                return Err(format!("free slot {index} is out of range"));
            };
            if slot.node.is_some() {
                return Err(format!("free slot {index} is occupied"));
            }
            if std::mem::replace(&mut seen_free[index as usize], true) {
                return Err(format!("free slot {index} is listed twice"));
            }
        }
        if let Some(index) = self
            .slots
            .iter()
            .enumerate()
            .position(|(index, slot)| {
                slot.node.is_none() && !seen_free[index] && slot.generation != u32::MAX
            })
        {
            return Err(format!("vacant slot {index} is missing from the free list"));
        }

        for (id, node) in self.iter() {
            let opcode = node.opcode();
            if node.input_count() != opcode.input_arity()
                || node.output_count() != opcode.output_arity()
            {
                return Err(format!(
                    "node {id} ({opcode}) has {} input(s) and {} output(s), expected {} and {}",
                    node.input_count(),
                    node.output_count(),
                    opcode.input_arity(),
                    opcode.output_arity()
                ));
            }
            node.check_invariants()
                .map_err(|reason| format!("node {id} ({opcode}): {reason}"))?;

            for (index, input) in node.inputs().iter().enumerate() {
                let Some(from) = input.connection() else {
                    continue;
                };
                let to = id.input(index);
                let producer = self
                    .output(from)
                    .map_err(|err| format!("input {to} links to {from}: {err}"))?;
                if !producer.connections().contains(&to) {
                    return Err(format!("output {from} does not list consumer {to}"));
                }
            }

            for (index, output) in node.outputs().iter().enumerate() {
                let from = id.output(index);
                let consumers = output.connections();
                for (pos, &to) in consumers.iter().enumerate() {
                    if consumers[..pos].contains(&to) {
                        return Err(format!("output {from} lists consumer {to} twice"));
                    }
                    let consumer = self
                        .input(to)
                        .map_err(|err| format!("output {from} links to {to}: {err}"))?;
                    if consumer.connection() != Some(from) {
                        return Err(format!("input {to} does not read from {from}"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn clear_links(node: &mut Node) {
    let ports = node.ports_mut();
    for input in ports.inputs_mut() {
        input.set_connection(None);
    }
    for output in ports.outputs_mut() {
        output.take_connections();
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph {{")?;
        for (id, node) in self.iter() {
            let operands = node
                .inputs()
                .iter()
                .map(|input| match input.connection() {
                    Some(from) => format!("{from} : {}", input.tensor_type()),
                    None => format!("_ : {}", input.tensor_type()),
                })
                .collect::<Vec<_>>()
                .join(", ");
            let results = node
                .outputs()
                .iter()
                .map(|output| output.tensor_type().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let attrs = node.attributes();
            if attrs.is_empty() {
                writeln!(f, "  {id} = {}({operands}) -> ({results})", node.opcode())?;
            } else {
                writeln!(
                    f,
                    "  {id} = {}({operands}) {{{attrs}}} -> ({results})",
                    node.opcode()
                )?;
            }
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Unary, UnaryOp};
    use crate::types::DataType;

    fn neg() -> Unary {
        Unary::new(UnaryOp::Neg, DataType::F32, [4])
    }

    #[test]
    fn exhausted_slot_is_retired() {
        let mut graph = Graph::new();
        let first = graph.add_node(neg());
        graph.remove_node(first).expect("remove first");
        graph.slots[0].generation = u32::MAX;

        let last = graph.add_node(neg());
        assert_eq!((last.index(), last.generation()), (0, u32::MAX));
        graph.remove_node(last).expect("remove last");
        assert!(graph.free.is_empty());
        assert_eq!(graph.slots[0].generation, u32::MAX);

        let fresh = graph.add_node(neg());
        assert_eq!(fresh.index(), 1);
        assert_eq!(graph.node(last), Err(IrError::StaleNode { node: last }));
        assert_eq!(graph.node(first), Err(IrError::StaleNode { node: first }));
        assert_eq!(graph.check_integrity(), Ok(()));
    }

    #[test]
    fn vacant_slot_outside_free_list_is_corrupt() {
        let mut graph = Graph::new();
        let id = graph.add_node(neg());
        graph.remove_node(id).expect("remove");
        graph.free.clear();
        assert!(graph
            .check_integrity()
            .expect_err("lost free slot")
            .contains("missing from the free list"));
    }
}
