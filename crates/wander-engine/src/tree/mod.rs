//! Render trees.
//!
//! A tree is a flat, ordered list of drawable nodes produced by one renderlet
//! invocation. Order is draw order; there is no hierarchy.

mod node;
mod tree;

pub use node::{NodeResource, RenderTreeNode};
pub use tree::RenderTree;
