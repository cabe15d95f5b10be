//! Tree store and nodes (spec §4.1).

pub mod label;
pub mod newick;
pub mod node;
pub mod store;

pub use node::{NodeData, NodeId};
pub use store::{Tree, TreeStore};
