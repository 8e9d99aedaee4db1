use crate::id::{BufferId, VectorId};
use crate::protocol::{MaterialRecord, PayloadKind};

use super::{NodeResource, RenderTreeNode};

/// Ordered, randomly indexable sequence of nodes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderTree {
    nodes: Vec<RenderTreeNode>,
}

impl RenderTree {
    /// One node per material record, all sharing `buffer`.
    pub fn from_materials(
        kind: PayloadKind,
        buffer: Option<BufferId>,
        materials: &[MaterialRecord],
    ) -> Self {
        let resource = match kind {
            PayloadKind::Index => NodeResource::Index(buffer),
            _ => NodeResource::Vertex(buffer),
        };
        Self {
            nodes: materials
                .iter()
                .map(|m| RenderTreeNode::new(resource, m.tag.clone(), m.offset, m.length))
                .collect(),
        }
    }

    /// Single-node tree for a vector command list.
    pub fn vector(id: Option<VectorId>) -> Self {
        Self {
            nodes: vec![RenderTreeNode::vector(id)],
        }
    }

    #[inline]
    pub fn node_at(&self, index: usize) -> Option<&RenderTreeNode> {
        self.nodes.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Empties the node list. Backend resources are not released.
    #[inline]
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, RenderTreeNode> {
        self.nodes.iter()
    }

    pub fn push(&mut self, node: RenderTreeNode) {
        self.nodes.push(node);
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [RenderTreeNode] {
        &mut self.nodes
    }

    /// Whether the tree holds vector content rather than geometry.
    pub fn is_vector(&self) -> bool {
        self.nodes
            .first()
            .is_some_and(|n| matches!(n.resource(), NodeResource::Vector(_)))
    }

    /// Distinct buffers referenced by the tree, in first-use order.
    pub fn buffers(&self) -> Vec<BufferId> {
        let mut out: Vec<BufferId> = Vec::new();
        for id in self.nodes.iter().filter_map(RenderTreeNode::buffer_id) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    /// Distinct vector lists referenced by the tree.
    pub fn vectors(&self) -> Vec<VectorId> {
        let mut out: Vec<VectorId> = Vec::new();
        for id in self.nodes.iter().filter_map(RenderTreeNode::vector_id) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a RenderTree {
    type Item = &'a RenderTreeNode;
    type IntoIter = std::slice::Iter<'a, RenderTreeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
