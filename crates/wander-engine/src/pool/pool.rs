use crate::error::{Result, WanderError};
use crate::id::{BufferId, TreeId};
use crate::pal::{BufferDescriptor, Pal};
use crate::table::ResourceTable;
use crate::tree::RenderTree;

/// Default arena size: 600 MiB.
pub const DEFAULT_STAGING_CAPACITY: usize = 600 * 1024 * 1024;

/// One staged contribution.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SubBuffer {
    /// Byte offset within the arena.
    pub offset: usize,
    /// Byte length.
    pub length: usize,
    pub tree: TreeId,
}

/// Outcome of uploading a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolUpload {
    /// The shared buffer, if the backend created one.
    pub buffer: Option<BufferId>,
    /// Live trees rewritten to use `buffer`, in staging order.
    pub trees: Vec<TreeId>,
}

/// Host-side staging arena plus the sub-buffers staged into it.
///
/// The arena is allocated on first use, holds at most one batch and is
/// released again by every upload.
#[derive(Debug)]
pub struct BufferPool {
    capacity: usize,
    arena: Option<Vec<u8>>,
    subs: Vec<SubBuffer>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            arena: None,
            subs: Vec::new(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes staged in the current batch.
    #[inline]
    pub fn used(&self) -> usize {
        self.arena.as_ref().map_or(0, Vec::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    #[inline]
    pub fn sub_buffers(&self) -> &[SubBuffer] {
        &self.subs
    }

    /// Copies `payload` to the next free offset and records it for `tree`.
    ///
    /// Fails without staging anything when the batch would exceed capacity.
    pub fn stage(&mut self, tree: TreeId, payload: &[u8]) -> Result<SubBuffer> {
        let available = self.capacity - self.used();
        if payload.len() > available {
            return Err(WanderError::PoolOverflow {
                requested: payload.len(),
                available,
                capacity: self.capacity,
            });
        }

        let capacity = self.capacity;
        let arena = self.arena.get_or_insert_with(|| {
            log::debug!("allocating {capacity} byte staging arena");
            Vec::with_capacity(capacity)
        });

        let sub = SubBuffer {
            offset: arena.len(),
            length: payload.len(),
            tree,
        };
        arena.extend_from_slice(payload);
        self.subs.push(sub);
        log::trace!("staged {} bytes at {} for {tree}", sub.length, sub.offset);
        Ok(sub)
    }

    /// Creates one vertex buffer from the whole batch and rewrites every staged
    /// tree to reference it.
    ///
    /// Each node's offset grows by the sub-buffer's running byte offset divided
    /// by `stride`. The batch and its arena are released afterwards. An empty
    /// pool uploads nothing.
    pub(crate) fn upload(
        &mut self,
        stride: u32,
        pal: &mut dyn Pal,
        trees: &mut ResourceTable<RenderTree>,
    ) -> Result<Option<PoolUpload>> {
        if stride == 0 {
            return Err(WanderError::ZeroStride);
        }
        if self.subs.is_empty() {
            return Ok(None);
        }

        let bytes = self.arena.as_deref().unwrap_or_default();
        let buffer = pal.create_buffer(&BufferDescriptor::vertex(), bytes);
        log::debug!(
            "uploaded staging arena: {} bytes, {} sub-buffers -> {buffer:?}",
            bytes.len(),
            self.subs.len()
        );

        let mut rewritten = Vec::with_capacity(self.subs.len());
        for sub in &self.subs {
            let element_offset = (sub.offset / stride as usize) as u32;
            let Some(tree) = trees.get_mut(sub.tree.raw()) else {
                log::trace!("{} was destroyed before upload", sub.tree);
                continue;
            };
            for node in tree.nodes_mut() {
                node.set_pooled_buffer(buffer, element_offset);
            }
            if !rewritten.contains(&sub.tree) {
                rewritten.push(sub.tree);
            }
        }

        self.reset();
        Ok(Some(PoolUpload {
            buffer,
            trees: rewritten,
        }))
    }

    /// Drops the current batch and releases the arena. The next
    /// [`BufferPool::stage`] allocates a fresh one.
    pub fn reset(&mut self) {
        self.arena = None;
        self.subs.clear();
    }

    /// Whether the staging arena is currently allocated.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.arena.is_some()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_STAGING_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pal::HeadlessPal;
    use crate::protocol::{PayloadKind, parse_material};

    fn staged_tree(
        pool: &mut BufferPool,
        trees: &mut ResourceTable<RenderTree>,
        payload_len: usize,
        material: &str,
    ) -> TreeId {
        let materials = parse_material(material).unwrap();
        let tree = RenderTree::from_materials(PayloadKind::Vertex, None, &materials);
        let id = TreeId::new(trees.insert(tree));
        pool.stage(id, &vec![0xAB; payload_len]).unwrap();
        id
    }

    #[test]
    fn stages_back_to_back() {
        let mut pool = BufferPool::new(1024);
        let a = pool.stage(TreeId::new(0), &[1; 44]).unwrap();
        let b = pool.stage(TreeId::new(1), &[2; 88]).unwrap();
        assert_eq!((a.offset, a.length), (0, 44));
        assert_eq!((b.offset, b.length), (44, 88));
        assert_eq!(pool.used(), 132);
    }

    #[test]
    fn overflow_fails_fast_and_keeps_batch() {
        let mut pool = BufferPool::new(100);
        pool.stage(TreeId::new(0), &[0; 60]).unwrap();
        let err = pool.stage(TreeId::new(1), &[0; 41]).unwrap_err();
        assert!(matches!(
            err,
            WanderError::PoolOverflow { requested: 41, available: 40, capacity: 100 }
        ));
        assert_eq!(pool.used(), 60);
        assert_eq!(pool.sub_buffers().len(), 1);
        pool.stage(TreeId::new(1), &[0; 40]).unwrap();
        assert_eq!(pool.used(), 100);
    }

    #[test]
    fn upload_rewrites_offsets_by_running_element_offset() {
        let stride = 44;
        let mut pool = BufferPool::new(4096);
        let mut trees = ResourceTable::default();
        let mut pal = HeadlessPal::new();

        let t0 = staged_tree(&mut pool, &mut trees, 3 * 44, "a,0,3,0,0");
        let t1 = staged_tree(&mut pool, &mut trees, 6 * 44, "b,0,3,0,0\nc,3,3,0,0");
        let t2 = staged_tree(&mut pool, &mut trees, 2 * 44, "d,0,2,0,0");

        let upload = pool.upload(stride, &mut pal, &mut trees).unwrap().unwrap();
        let buffer = upload.buffer.expect("headless backend creates buffers");
        assert_eq!(upload.trees, vec![t0, t1, t2]);
        assert_eq!(pal.buffer_data(buffer).map(<[u8]>::len), Some(11 * 44));

        let offsets = |id: TreeId| -> Vec<u32> {
            trees.get(id.raw()).unwrap().iter().map(|n| n.offset()).collect()
        };
        assert_eq!(offsets(t0), vec![0]);
        assert_eq!(offsets(t1), vec![3, 6]);
        assert_eq!(offsets(t2), vec![9]);
        for id in [t0, t1, t2] {
            assert!(trees.get(id.raw()).unwrap().iter().all(|n| n.buffer_id() == Some(buffer)));
        }

        assert!(pool.is_empty());
        assert_eq!(pool.used(), 0);
    }

    #[test]
    fn arena_is_reusable_after_upload() {
        let mut pool = BufferPool::new(128);
        let mut trees = ResourceTable::default();
        let mut pal = HeadlessPal::new();

        staged_tree(&mut pool, &mut trees, 128, "a,0,1,0,0");
        assert!(pool.is_allocated());
        pool.upload(4, &mut pal, &mut trees).unwrap();
        assert!(!pool.is_allocated());
        assert!(pool.arena.is_none());

        let t = staged_tree(&mut pool, &mut trees, 128, "b,0,1,0,0");
        assert_eq!(pool.sub_buffers()[0], SubBuffer { offset: 0, length: 128, tree: t });
        assert!(pool.is_allocated());
    }

    #[test]
    fn offset_past_u32_saturates_instead_of_wrapping() {
        let mut pool = BufferPool::new(256);
        let mut trees = ResourceTable::default();
        let mut pal = HeadlessPal::new();

        staged_tree(&mut pool, &mut trees, 44, "a,0,1,0,0");
        let far = staged_tree(&mut pool, &mut trees, 44, "b,4294967295,1,0,0");

        pool.upload(44, &mut pal, &mut trees).unwrap();
        let node = trees.get(far.raw()).unwrap().node_at(0).unwrap();
        assert_eq!(node.offset(), u32::MAX);
        assert!(node.buffer_id().is_some());
    }

    #[test]
    fn destroyed_trees_are_skipped() {
        let mut pool = BufferPool::new(256);
        let mut trees = ResourceTable::default();
        let mut pal = HeadlessPal::new();

        let gone = staged_tree(&mut pool, &mut trees, 8, "a,0,2,0,0");
        let kept = staged_tree(&mut pool, &mut trees, 8, "b,0,2,0,0");
        trees.remove(gone.raw());

        let upload = pool.upload(4, &mut pal, &mut trees).unwrap().unwrap();
        assert_eq!(upload.trees, vec![kept]);
        assert_eq!(trees.get(kept.raw()).unwrap().node_at(0).unwrap().offset(), 2);
    }

    #[test]
    fn empty_pool_uploads_nothing() {
        let mut pool = BufferPool::new(16);
        let mut pal = HeadlessPal::new();
        let mut trees = ResourceTable::default();
        assert_eq!(pool.upload(44, &mut pal, &mut trees).unwrap(), None);
        assert_eq!(pal.live_buffers(), 0);
    }

    #[test]
    fn zero_stride_is_rejected() {
        let mut pool = BufferPool::new(16);
        let mut pal = HeadlessPal::new();
        let mut trees = ResourceTable::default();
        assert!(matches!(
            pool.upload(0, &mut pal, &mut trees),
            Err(WanderError::ZeroStride)
        ));
    }
}
