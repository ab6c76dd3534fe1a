use tensor_ir::{
    Binary, BinaryOp, Constant, DataType, Graph, InputNode, IrError, MemoryCopy, Node, NodeKind,
    Opcode, OutputNode, Reduce, ReduceOp, Shape, Unary, UnaryOp,
};

fn flatten_copy() -> MemoryCopy {
    MemoryCopy::new(DataType::I8, [2, 3], DataType::I8, [6])
}

fn one_of_each() -> Vec<Node> {
    vec![
        InputNode::new(DataType::F32, [1, 4]).into(),
        OutputNode::new(DataType::F32, [1, 4]).into(),
        Constant::new(DataType::F32, [4], vec![0u8; 16]).into(),
        Unary::new(UnaryOp::Exp, DataType::F32, [1, 4]).into(),
        Binary::new(BinaryOp::Add, DataType::F32, [1, 4], [4], [1, 4]).into(),
        Reduce::new(ReduceOp::Sum, DataType::F32, [1, 4], vec![1], false).into(),
        flatten_copy().into(),
    ]
}

#[test]
fn flatten_copy_exposes_construction_attributes() {
    let copy = flatten_copy();
    assert_eq!(copy.input().dtype(), DataType::I8);
    assert_eq!(copy.input().shape(), &Shape::from([2, 3]));
    assert_eq!(copy.output().dtype(), DataType::I8);
    assert_eq!(copy.output().shape(), &Shape::from([6]));
    assert_eq!(copy.new_shape(), &Shape::from([6]));
    assert_eq!(copy.inputs().len(), 1);
    assert_eq!(copy.outputs().len(), 1);
    assert!(copy.is_reshape());
    assert!(!copy.is_reinterpret());

    let node = Node::from(copy);
    assert_eq!(node.opcode(), Opcode::MemoryCopy);
    assert_eq!(node.opcode(), MemoryCopy::OPCODE);
    assert_eq!((node.input_count(), node.output_count()), (1, 1));
}

#[test]
fn memory_copy_reads_are_idempotent() {
    let copy = MemoryCopy::new(DataType::F16, [4, 1, 8], DataType::U16, [32]);
    for _ in 0..3 {
        assert_eq!(copy.input().dtype(), DataType::F16);
        assert_eq!(copy.input().shape(), &Shape::from([4, 1, 8]));
        assert_eq!(copy.output().dtype(), DataType::U16);
        assert_eq!(copy.new_shape(), &Shape::from([32]));
    }
    assert!(copy.is_reinterpret());
}

#[test]
fn memory_copy_accepts_mismatched_element_counts() {
    let copy = MemoryCopy::new(DataType::F32, [2, 3], DataType::F32, [7]);
    assert_eq!(copy.new_shape(), &Shape::from([7]));
    assert_eq!(copy.output().shape(), copy.new_shape());
}

#[test]
fn opcode_matches_constructed_kind() {
    let expected = [
        Opcode::Input,
        Opcode::Output,
        Opcode::Constant,
        Opcode::Unary,
        Opcode::Binary,
        Opcode::Reduce,
        Opcode::MemoryCopy,
    ];
    let nodes = one_of_each();
    assert_eq!(nodes.len(), expected.len());
    for (node, opcode) in nodes.iter().zip(expected) {
        assert_eq!(node.opcode(), opcode);
    }

    assert_eq!(InputNode::OPCODE, Opcode::Input);
    assert_eq!(OutputNode::OPCODE, Opcode::Output);
    assert_eq!(Constant::OPCODE, Opcode::Constant);
    assert_eq!(Unary::OPCODE, Opcode::Unary);
    assert_eq!(Binary::OPCODE, Opcode::Binary);
    assert_eq!(Reduce::OPCODE, Opcode::Reduce);
    assert_eq!(MemoryCopy::OPCODE, Opcode::MemoryCopy);
}

#[test]
fn opcodes_are_distinct_and_stable() {
    let mut codes: Vec<u16> = Opcode::ALL.iter().map(|op| op.code()).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), Opcode::ALL.len());

    for &opcode in Opcode::ALL {
        assert_eq!(Opcode::from_code(opcode.code()), Some(opcode));
    }
    assert_eq!(Opcode::from_code(0xffff), None);
    assert_eq!(Opcode::MemoryCopy.to_string(), "memory_copy");
}

#[test]
fn connector_access_is_total_over_arity() {
    for node in one_of_each() {
        let opcode = node.opcode();
        assert_eq!(node.input_count(), opcode.input_arity(), "{opcode}");
        assert_eq!(node.output_count(), opcode.output_arity(), "{opcode}");

        for index in 0..node.input_count() {
            assert_eq!(node.input_at(index), &node.inputs()[index]);
            assert!(node.try_input_at(index).is_some());
        }
        for index in 0..node.output_count() {
            assert_eq!(node.output_at(index), &node.outputs()[index]);
            assert!(node.try_output_at(index).is_some());
        }
        assert!(node.try_input_at(node.input_count()).is_none(), "{opcode}");
        assert!(node.try_output_at(node.output_count()).is_none(), "{opcode}");
    }
}

#[test]
#[should_panic(expected = "input index 1 out of range for memory_copy")]
fn input_at_past_arity_panics() {
    let node = Node::from(flatten_copy());
    let _ = node.input_at(1);
}

#[test]
#[should_panic(expected = "output index 0 out of range for output")]
fn output_at_on_sink_panics() {
    let sink = OutputNode::new(DataType::F32, [2]);
    let _ = sink.output_at(0);
}

#[test]
fn binary_exposes_both_operands() {
    let add = Binary::new(BinaryOp::Mul, DataType::I32, [3, 1], [1, 5], [3, 5]);
    assert_eq!(add.op(), BinaryOp::Mul);
    assert_eq!(add.lhs().shape(), &Shape::from([3, 1]));
    assert_eq!(add.rhs().shape(), &Shape::from([1, 5]));
    assert_eq!(add.output().shape(), &Shape::from([3, 5]));
    assert_eq!(add.input_at(1), add.rhs());
}

#[test]
fn binary_broadcast_derives_output_shape() {
    let add = Binary::broadcast(BinaryOp::Add, DataType::F32, [2, 1], [3])
        .expect("shapes broadcast");
    assert_eq!(add.output().shape(), &Shape::from([2, 3]));

    let err = Binary::broadcast(BinaryOp::Add, DataType::F32, [2, 3], [4])
        .expect_err("shapes must not broadcast");
    assert_eq!(
        err,
        IrError::BroadcastIncompatible {
            lhs: Shape::from([2, 3]),
            rhs: Shape::from([4]),
        }
    );
}

#[test]
fn reduce_derives_output_shape() {
    let reduce = Reduce::new(ReduceOp::Mean, DataType::F32, [2, 3, 4], vec![2], true);
    assert_eq!(reduce.output().shape(), &Shape::from([2, 3, 1]));
    assert_eq!(reduce.axes(), &[2]);
    assert!(reduce.keep_dims());
}

#[test]
fn downcast_by_true_opcode_succeeds() {
    let node = Node::from(flatten_copy());
    let copy = node
        .downcast_ref::<MemoryCopy>()
        .expect("memory copy downcast");
    assert_eq!(copy.new_shape(), &Shape::from([6]));
    assert_eq!(copy, &flatten_copy());
    assert!(node.is::<MemoryCopy>());
}

#[test]
fn downcast_to_other_kind_is_rejected() {
    let node = Node::from(flatten_copy());
    let err = node
        .downcast_ref::<Reduce>()
        .expect_err("reduce downcast must fail");
    assert_eq!(
        err,
        IrError::OpcodeMismatch {
            expected: Opcode::Reduce,
            found: Opcode::MemoryCopy,
        }
    );
    assert!(!node.is::<Unary>());
}

#[test]
fn every_node_downcasts_only_to_its_own_kind() {
    for node in one_of_each() {
        let accepted = [
            node.downcast_ref::<InputNode>().is_ok(),
            node.downcast_ref::<OutputNode>().is_ok(),
            node.downcast_ref::<Constant>().is_ok(),
            node.downcast_ref::<Unary>().is_ok(),
            node.downcast_ref::<Binary>().is_ok(),
            node.downcast_ref::<Reduce>().is_ok(),
            node.downcast_ref::<MemoryCopy>().is_ok(),
        ];
        let count = accepted.iter().filter(|ok| **ok).count();
        assert_eq!(count, 1, "{} accepted {count} kinds", node.opcode());
    }
}

#[test]
fn into_kind_hands_back_node_on_mismatch() {
    let node = Node::from(flatten_copy());
    let node = node
        .into_kind::<Unary>()
        .expect_err("unary extraction must fail");
    assert_eq!(node.opcode(), Opcode::MemoryCopy);
    let copy = node
        .into_kind::<MemoryCopy>()
        .expect("memory copy extraction");
    assert_eq!(copy.new_shape(), &Shape::from([6]));
}

#[test]
fn identical_nodes_have_distinct_identities() -> anyhow::Result<()> {
    let mut graph = Graph::new();
    let a = graph.add_node(flatten_copy());
    let b = graph.add_node(flatten_copy());
    assert_ne!(a, b);

    let first = graph.node(a)?;
    let second = graph.node(b)?;
    assert_eq!(first, second);
    assert!(!std::ptr::eq(first, second));
    Ok(())
}

#[test]
fn attributes_render_per_kind() {
    assert_eq!(Node::from(flatten_copy()).attributes(), "new_shape=[6]");
    assert_eq!(
        Node::from(InputNode::new(DataType::F32, [1])).attributes(),
        ""
    );
    let reduce = Reduce::new(ReduceOp::Sum, DataType::F32, [2, 2], vec![1], false);
    assert_eq!(
        Node::from(reduce).attributes(),
        "op=sum axes=[1] keep_dims=false"
    );
}
