use crate::id::{BufferId, VectorId};
use crate::pal::{Pal, VectorTarget};

/// Backend object a node draws from.
///
/// `None` means the object does not exist yet (pooled builds before upload)
/// or the backend declined to create it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NodeResource {
    Vertex(Option<BufferId>),
    Index(Option<BufferId>),
    Vector(Option<VectorId>),
}

/// One drawable unit: a sub-range of a buffer plus a material tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTreeNode {
    resource: NodeResource,
    tag: String,
    offset: u32,
    length: u32,
}

impl RenderTreeNode {
    pub fn new(resource: NodeResource, tag: impl Into<String>, offset: u32, length: u32) -> Self {
        Self {
            resource,
            tag: tag.into(),
            offset,
            length,
        }
    }

    /// A vector node carries no byte range.
    #[inline]
    pub fn vector(id: Option<VectorId>) -> Self {
        Self::new(NodeResource::Vector(id), "", 0, 0)
    }

    #[inline]
    pub fn resource(&self) -> NodeResource {
        self.resource
    }

    /// Material tag from field 0 of the node's material line.
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// First element of the node's range.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Element count of the node's range.
    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Backing buffer of a vertex or index node.
    pub fn buffer_id(&self) -> Option<BufferId> {
        match self.resource {
            NodeResource::Vertex(id) | NodeResource::Index(id) => id,
            NodeResource::Vector(_) => None,
        }
    }

    pub fn vector_id(&self) -> Option<VectorId> {
        match self.resource {
            NodeResource::Vector(id) => id,
            _ => None,
        }
    }

    /// Replaces the vector list of a vector node. Other nodes are unchanged.
    pub(crate) fn set_vector(&mut self, id: Option<VectorId>) {
        if let NodeResource::Vector(current) = &mut self.resource {
            *current = id;
        }
    }

    /// Points the node at a pooled buffer and shifts its range by
    /// `element_offset` elements.
    pub(crate) fn set_pooled_buffer(&mut self, buffer: Option<BufferId>, element_offset: u32) {
        match &mut self.resource {
            NodeResource::Vertex(id) | NodeResource::Index(id) => *id = buffer,
            NodeResource::Vector(_) => return,
        }
        self.offset = self.offset.checked_add(element_offset).unwrap_or_else(|| {
            log::warn!(
                "pooled node `{}` offset {} + {element_offset} overflows, clamping",
                self.tag,
                self.offset
            );
            u32::MAX
        });
    }

    /// Draws the node's range as a triangle list with `stride`-byte elements.
    ///
    /// Returns `false` when there is nothing to draw (vector node, or no
    /// buffer yet).
    pub fn render_fixed_stride(&self, pal: &mut dyn Pal, stride: u32) -> bool {
        let Some(buffer) = self.buffer_id() else {
            return false;
        };
        pal.draw_triangle_list(buffer, self.offset, self.length, stride);
        true
    }

    /// Draws the node's vector commands into `target`.
    pub fn render_vector(
        &self,
        pal: &mut dyn Pal,
        target: VectorTarget,
        width: u32,
        height: u32,
    ) -> bool {
        let Some(vector) = self.vector_id() else {
            return false;
        };
        pal.draw_vector(vector, target, width, height);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pal::{DrawCall, HeadlessPal};

    #[test]
    fn pooled_buffer_shifts_offset() {
        let mut n = RenderTreeNode::new(NodeResource::Vertex(None), "wall", 2, 6);
        assert_eq!(n.buffer_id(), None);
        n.set_pooled_buffer(Some(BufferId::new(5)), 10);
        assert_eq!(n.buffer_id(), Some(BufferId::new(5)));
        assert_eq!((n.offset(), n.length()), (12, 6));
    }

    #[test]
    fn vector_nodes_ignore_pooling() {
        let mut n = RenderTreeNode::vector(Some(VectorId::new(1)));
        n.set_pooled_buffer(Some(BufferId::new(5)), 10);
        assert_eq!(n.offset(), 0);
        assert_eq!(n.vector_id(), Some(VectorId::new(1)));
        assert_eq!(n.buffer_id(), None);
    }

    #[test]
    fn fixed_stride_draw_uses_node_range() {
        let mut pal = HeadlessPal::new();
        let n = RenderTreeNode::new(NodeResource::Vertex(Some(BufferId::new(0))), "x", 3, 9);
        assert!(n.render_fixed_stride(&mut pal, 44));
        assert_eq!(
            pal.draw_calls(),
            &[DrawCall::TriangleList {
                buffer: BufferId::new(0),
                offset: 3,
                length: 9,
                stride: 44
            }]
        );
    }

    #[test]
    fn undrawable_nodes_do_nothing() {
        let mut pal = HeadlessPal::new();
        let pending = RenderTreeNode::new(NodeResource::Vertex(None), "x", 0, 3);
        assert!(!pending.render_fixed_stride(&mut pal, 44));
        assert!(!pending.render_vector(&mut pal, VectorTarget::Surface, 8, 8));
        assert!(pal.draw_calls().is_empty());
    }
}
