//! Category forests: building, walking and restructuring them.

mod hierarchy;
mod node;

pub use hierarchy::*;
pub(crate) use node::descendants_of;
pub use node::{build_tree, find_node, flatten, TreeNode};
