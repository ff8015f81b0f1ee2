mod iter;
mod node;
mod tree;

pub use iter::Range;
pub use node::{Node, NodeId};
pub use tree::BPlusTree;
