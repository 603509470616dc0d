use crate::{node::NodeRef, schema_tree::SchemaTree};

/// A per-direction judgement of whether a tree node is correctly set up. The flattener and the
/// maker plug in their own strategy; the tree only asks.
pub trait NodeCheck {
    fn check_node(&self, tree: &SchemaTree, node: NodeRef) -> bool;
}

/// The flattener reads whatever the document holds, so every node passes.
pub struct FlattenerCheck;

impl NodeCheck for FlattenerCheck {
    fn check_node(&self, _tree: &SchemaTree, _node: NodeRef) -> bool {
        true
    }
}
