use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, WanderError};
use crate::host::{Host, Param};
use crate::id::{BufferId, RenderletId, TreeId};
use crate::pal::{BufferDescriptor, BufferFormat, Pal, VectorTarget};
use crate::pool::BufferPool;
use crate::protocol::{self, Decoded, PayloadKind};
use crate::table::ResourceTable;
use crate::tree::RenderTree;

use super::RuntimeConfig;

/// Loads renderlets, decodes their output and owns the resulting trees.
///
/// Every fallible operation comes in two forms. `try_*` returns the error;
/// the plain form treats it as fatal, logging the diagnostic and exiting the
/// process. Outcomes callers are expected to handle ("nothing to render",
/// backend refused a resource) are `None` in both forms.
pub struct Runtime<P: Pal = Box<dyn Pal>> {
    host: Host,
    pal: P,
    trees: ResourceTable<RenderTree>,
    pool: BufferPool,
    /// Trees referencing each live geometry buffer.
    owners: HashMap<BufferId, usize>,
    config: RuntimeConfig,
}

impl<P: Pal> Runtime<P> {
    pub fn new(pal: P) -> Self {
        Self::with_config(pal, RuntimeConfig::default())
    }

    pub fn with_config(pal: P, config: RuntimeConfig) -> Self {
        Self::try_with_config(pal, config).unwrap_or_else(|e| fatal("creating runtime", e))
    }

    pub fn try_with_config(pal: P, config: RuntimeConfig) -> Result<Self> {
        let host = Host::new(config.engine.clone())?;
        log::info!(
            "runtime ready ({:?} backend, {} byte staging arena)",
            pal.kind(),
            config.staging_capacity
        );
        Ok(Self {
            host,
            pal,
            trees: ResourceTable::default(),
            pool: BufferPool::new(config.staging_capacity),
            owners: HashMap::new(),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn pal(&self) -> &P {
        &self.pal
    }

    #[inline]
    pub fn pal_mut(&mut self) -> &mut P {
        &mut self.pal
    }

    #[inline]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Loads a module from disk. `entry` defaults to the configured entry.
    ///
    /// Returns `None` when the module lacks the entry or memory export.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>, entry: Option<&str>) -> Option<RenderletId> {
        let path = path.as_ref();
        recover_missing_export(self.try_load_from_file(path, entry))
            .unwrap_or_else(|e| fatal(&format!("loading {}", path.display()), e))
    }

    pub fn try_load_from_file(&mut self, path: impl AsRef<Path>, entry: Option<&str>) -> Result<RenderletId> {
        let entry = entry.unwrap_or(self.config.default_entry.as_str());
        self.host.load_file(path.as_ref(), entry)
    }

    /// Loads a module from binary or text bytecode.
    pub fn load_from_bytes(&mut self, bytecode: &[u8], entry: Option<&str>) -> Option<RenderletId> {
        recover_missing_export(self.try_load_from_bytes(bytecode, entry))
            .unwrap_or_else(|e| fatal("loading renderlet", e))
    }

    pub fn try_load_from_bytes(&mut self, bytecode: &[u8], entry: Option<&str>) -> Result<RenderletId> {
        let entry = entry.unwrap_or(self.config.default_entry.as_str());
        self.host.load(bytecode, entry)
    }

    /// Queues a parameter for the next invocation of `id`.
    pub fn push_param(&mut self, id: RenderletId, param: impl Into<Param>) {
        if let Err(e) = self.host.push_param(id, param) {
            fatal("pushing parameter", e);
        }
    }

    pub fn reset_params(&mut self, id: RenderletId) {
        if let Err(e) = self.host.reset_params(id) {
            fatal("resetting parameters", e);
        }
    }

    /// Invokes `id` and builds a tree from its output.
    ///
    /// With `tree` naming a live vector tree and a vector result, the
    /// vector content is replaced in place and the same id is returned.
    /// Geometry results always build a new tree; `pooled` stages their
    /// payload for [`Runtime::upload_buffer_pool`] instead of creating a
    /// buffer. Returns `None` when the output's version is not understood.
    pub fn render(&mut self, id: RenderletId, tree: Option<TreeId>, pooled: bool) -> Option<TreeId> {
        self.try_render(id, tree, pooled)
            .unwrap_or_else(|e| fatal(&format!("rendering {id}"), e))
    }

    pub fn try_render(&mut self, id: RenderletId, tree: Option<TreeId>, pooled: bool) -> Result<Option<TreeId>> {
        let offset = self.host.invoke(id)?;

        let Self {
            host,
            pal,
            trees,
            pool,
            owners,
            ..
        } = self;

        match protocol::decode(host.memory(id)?, offset as usize)? {
            Decoded::VersionMismatch(version) => {
                log::warn!("{id} emitted protocol version {version}, nothing to render");
                Ok(None)
            }

            Decoded::Vector { payload } => {
                let existing = match tree {
                    Some(t) => trees.get_mut(t.raw()).filter(|r| r.is_vector()).map(|r| (t, r)),
                    None => None,
                };
                if let Some((tree_id, target)) = existing {
                    let current = target.vectors().first().copied();
                    let updated = current.and_then(|vector| pal.update_vector(payload, vector));
                    if updated.is_none() {
                        // No list to update yet, or the backend dropped it.
                        if let Some(stale) = current {
                            pal.delete_vector(stale);
                        }
                        let vector = pal.create_vector(payload);
                        for node in target.nodes_mut() {
                            node.set_vector(vector);
                        }
                    }
                    log::trace!("updated vector content of {tree_id} in place");
                    return Ok(Some(tree_id));
                }

                let vector = pal.create_vector(payload);
                if vector.is_none() {
                    log::debug!("{:?} backend has no vector pipeline", pal.kind());
                }
                let tree_id = TreeId::new(trees.insert(RenderTree::vector(vector)));
                log::debug!("built vector {tree_id} from {id} ({} bytes)", payload.len());
                Ok(Some(tree_id))
            }

            Decoded::Geometry {
                kind,
                payload,
                materials,
            } => {
                if pooled {
                    let tree_id =
                        TreeId::new(trees.insert(RenderTree::from_materials(kind, None, &materials)));
                    if let Err(e) = pool.stage(tree_id, payload) {
                        trees.remove(tree_id.raw());
                        return Err(e);
                    }
                    log::debug!(
                        "built pooled {tree_id} from {id} ({} nodes, {} bytes staged)",
                        materials.len(),
                        payload.len()
                    );
                    return Ok(Some(tree_id));
                }

                let desc = match kind {
                    PayloadKind::Index => BufferDescriptor::index(BufferFormat::Index32),
                    _ => BufferDescriptor::vertex(),
                };
                let buffer = pal.create_buffer(&desc, payload);
                match buffer {
                    Some(buffer) => {
                        owners.insert(buffer, 1);
                    }
                    None => log::warn!("backend refused {} byte {kind:?} buffer for {id}", payload.len()),
                }

                let tree_id =
                    TreeId::new(trees.insert(RenderTree::from_materials(kind, buffer, &materials)));
                log::debug!("built {tree_id} from {id} ({} nodes)", materials.len());
                Ok(Some(tree_id))
            }
        }
    }

    /// Invokes `export` and returns its raw linear-memory offset.
    pub fn evaluate(&mut self, id: RenderletId, export: &str) -> u32 {
        self.try_evaluate(id, export)
            .unwrap_or_else(|e| fatal(&format!("evaluating `{export}`"), e))
    }

    pub fn try_evaluate(&mut self, id: RenderletId, export: &str) -> Result<u32> {
        self.host.invoke_export(id, export)
    }

    /// Invokes `export` and reads four floats at the offset it returns.
    pub fn evaluate_float4(&mut self, id: RenderletId, export: &str) -> [f32; 4] {
        self.try_evaluate_float4(id, export)
            .unwrap_or_else(|e| fatal(&format!("evaluating `{export}`"), e))
    }

    pub fn try_evaluate_float4(&mut self, id: RenderletId, export: &str) -> Result<[f32; 4]> {
        self.host.evaluate_float4(id, export)
    }

    /// Bounds-checked view into the linear memory of `id`.
    pub fn read_memory(&self, id: RenderletId, offset: u32, len: usize) -> Result<&[u8]> {
        self.host.read_memory(id, offset, len)
    }

    /// Uploads every staged payload as one buffer of `stride`-byte elements.
    ///
    /// Returns the shared buffer, or `None` when nothing was staged or the
    /// backend refused it.
    pub fn upload_buffer_pool(&mut self, stride: u32) -> Option<BufferId> {
        self.try_upload_buffer_pool(stride)
            .unwrap_or_else(|e| fatal("uploading buffer pool", e))
    }

    pub fn try_upload_buffer_pool(&mut self, stride: u32) -> Result<Option<BufferId>> {
        let Some(upload) = self.pool.upload(stride, &mut self.pal, &mut self.trees)? else {
            return Ok(None);
        };
        match upload.buffer {
            Some(buffer) if !upload.trees.is_empty() => {
                self.owners.insert(buffer, upload.trees.len());
            }
            Some(buffer) => {
                log::debug!("every staged tree was destroyed, releasing {buffer}");
                self.pal.delete_buffer(Some(buffer));
                return Ok(None);
            }
            None => log::warn!("backend refused the pooled buffer"),
        }
        Ok(upload.buffer)
    }

    #[inline]
    pub fn render_tree(&self, id: TreeId) -> Option<&RenderTree> {
        self.trees.get(id.raw())
    }

    /// Number of live trees.
    pub fn tree_count(&self) -> usize {
        self.trees.live()
    }

    /// Releases a tree and every backend object only it references.
    ///
    /// Returns `false` when `id` is not a live tree.
    pub fn destroy_render_tree(&mut self, id: TreeId) -> bool {
        let Some(tree) = self.trees.remove(id.raw()) else {
            return false;
        };
        for buffer in tree.buffers() {
            self.release_buffer(buffer);
        }
        for vector in tree.vectors() {
            self.pal.delete_vector(vector);
        }
        log::debug!("destroyed {id}");
        true
    }

    /// Draws node `index` of `tree` as a triangle list.
    pub fn draw_node(&mut self, tree: TreeId, index: usize, stride: u32) -> bool {
        let Some(node) = self.trees.get(tree.raw()).and_then(|t| t.node_at(index)) else {
            return false;
        };
        node.render_fixed_stride(&mut self.pal, stride)
    }

    /// Draws the vector content of node `index` of `tree`.
    pub fn draw_vector(
        &mut self,
        tree: TreeId,
        index: usize,
        target: VectorTarget,
        width: u32,
        height: u32,
    ) -> bool {
        let Some(node) = self.trees.get(tree.raw()).and_then(|t| t.node_at(index)) else {
            return false;
        };
        node.render_vector(&mut self.pal, target, width, height)
    }

    /// Releases a renderlet. Trees it built stay alive.
    pub fn unload(&mut self, id: RenderletId) -> bool {
        self.host.unload(id)
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        let remaining = match self.owners.get_mut(&buffer) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            self.owners.remove(&buffer);
            self.pal.delete_buffer(Some(buffer));
        }
    }
}

impl<P: Pal> Drop for Runtime<P> {
    fn drop(&mut self) {
        for raw in self.trees.ids() {
            self.destroy_render_tree(TreeId::new(raw));
        }
        self.host.unload_all();
    }
}

/// A missing export is the "not a renderlet" sentinel rather than an error.
fn recover_missing_export(result: Result<RenderletId>) -> Result<Option<RenderletId>> {
    match result {
        Ok(id) => Ok(Some(id)),
        Err(WanderError::MissingExport(export)) => {
            log::error!("renderlet does not export `{export}`");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn fatal(context: &str, error: WanderError) -> ! {
    log::error!("{context}: {error}");
    eprintln!("fatal: {context}: {error}");
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::EngineConfig;
    use crate::pal::{DrawCall, HeadlessPal};
    use crate::protocol::tests::encode;

    fn runtime() -> Runtime<HeadlessPal> {
        Runtime::with_config(
            HeadlessPal::new(),
            RuntimeConfig {
                engine: EngineConfig {
                    inherit_args: false,
                    inherit_env: false,
                    ..EngineConfig::default()
                },
                staging_capacity: 1024,
                ..RuntimeConfig::default()
            },
        )
    }

    /// Module whose `start` returns `output` placed at offset 16.
    fn returning(output: &[u8]) -> String {
        let data: String = output.iter().map(|b| format!("\\{b:02x}")).collect();
        format!(
            r#"(module
                 (memory (export "memory") 1)
                 (func (export "start") (result i32) (i32.const 16))
                 (data (i32.const 16) "{data}"))"#
        )
    }

    fn load(rt: &mut Runtime<HeadlessPal>, output: &[u8]) -> RenderletId {
        rt.load_from_bytes(returning(output).as_bytes(), None).unwrap()
    }

    #[test]
    fn missing_entry_is_the_sentinel() {
        let mut rt = runtime();
        let wat = returning(&[]);
        assert_eq!(rt.load_from_bytes(wat.as_bytes(), Some("Start")), None);
    }

    #[test]
    fn direct_build_owns_one_buffer() {
        let mut rt = runtime();
        let id = load(&mut rt, &encode(1, 0, &[0; 88], "a,0,1,0,0\nb,1,1,0,0"));
        let tree = rt.render(id, None, false).unwrap();

        let t = rt.render_tree(tree).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.buffers().len(), 1);
        assert_eq!(rt.pal().live_buffers(), 1);

        assert!(rt.destroy_render_tree(tree));
        assert!(!rt.destroy_render_tree(tree));
        assert_eq!(rt.pal().live_buffers(), 0);
    }

    #[test]
    fn index_payload_creates_index_buffer() {
        let mut rt = runtime();
        let id = load(&mut rt, &encode(1, 3, &[0; 12], "i,0,3,0,0"));
        let tree = rt.render(id, None, false).unwrap();
        let buffer = rt.render_tree(tree).unwrap().buffers()[0];
        assert!(matches!(
            rt.pal().resource(buffer),
            Some(crate::pal::HeadlessResource::Buffer { kind: crate::pal::BufferType::Index, .. })
        ));
    }

    #[test]
    fn draw_node_uses_node_range() {
        let mut rt = runtime();
        let id = load(&mut rt, &encode(1, 0, &[0; 132], "a,0,1,0,0\nb,1,2,0,0"));
        let tree = rt.render(id, None, false).unwrap();
        let buffer = rt.render_tree(tree).unwrap().buffers()[0];

        assert!(rt.draw_node(tree, 1, 44));
        assert!(!rt.draw_node(tree, 2, 44));
        assert_eq!(
            rt.pal().draw_calls(),
            &[DrawCall::TriangleList { buffer, offset: 1, length: 2, stride: 44 }]
        );
    }

    #[test]
    fn pooled_overflow_stages_nothing() {
        let mut rt = runtime();
        let id = load(&mut rt, &encode(1, 0, &[0; 800], "a,0,1,0,0"));
        assert!(rt.try_render(id, None, true).unwrap().is_some());
        let err = rt.try_render(id, None, true).unwrap_err();
        assert!(matches!(err, WanderError::PoolOverflow { requested: 800, available: 224, .. }));
        assert_eq!(rt.tree_count(), 1);
        assert_eq!(rt.pool().sub_buffers().len(), 1);
    }

    #[test]
    fn zero_stride_upload_is_an_error() {
        let mut rt = runtime();
        assert!(matches!(rt.try_upload_buffer_pool(0), Err(WanderError::ZeroStride)));
    }

    #[test]
    fn empty_pool_uploads_nothing() {
        let mut rt = runtime();
        assert_eq!(rt.upload_buffer_pool(44), None);
        assert_eq!(rt.pal().live_buffers(), 0);
    }

    #[test]
    fn pool_buffer_released_when_all_staged_trees_died() {
        let mut rt = runtime();
        let id = load(&mut rt, &encode(1, 0, &[0; 44], "a,0,1,0,0"));
        let tree = rt.render(id, None, true).unwrap();
        rt.destroy_render_tree(tree);
        assert_eq!(rt.upload_buffer_pool(44), None);
        assert_eq!(rt.pal().live_buffers(), 0);
    }

    #[test]
    fn vector_render_updates_in_place() {
        let mut rt = runtime();
        let stream = crate::vector::decode::tests::triangle_stream(0xFFFF0000);
        let id = load(&mut rt, &encode(1, 2, &stream, ""));

        let tree = rt.render(id, None, false).unwrap();
        let again = rt.render(id, Some(tree), false).unwrap();
        assert_eq!(again, tree);
        assert_eq!(rt.pal().live_vectors(), 1);

        let node = rt.render_tree(tree).unwrap().node_at(0).unwrap();
        assert_eq!((node.offset(), node.length()), (0, 0));
        let vector = node.vector_id().unwrap();
        assert_eq!(rt.pal().vector_commands(vector).unwrap().len(), 1);

        assert!(rt.draw_vector(tree, 0, VectorTarget::Slot(0), 16, 16));
        assert!(rt.pal().vector_target(vector).is_some());

        rt.destroy_render_tree(tree);
        assert_eq!(rt.pal().live_vectors(), 0);
    }

    /// Backend without a vector pipeline.
    struct GeometryOnly(HeadlessPal);

    impl Pal for GeometryOnly {
        fn kind(&self) -> crate::pal::PalKind {
            self.0.kind()
        }

        fn create_geometry_buffer(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
            self.0.create_geometry_buffer(desc, data)
        }

        fn create_texture(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
            self.0.create_texture(desc, data)
        }

        fn delete_buffer(&mut self, id: Option<BufferId>) {
            self.0.delete_buffer(id)
        }

        fn draw_triangle_list(&mut self, buffer: BufferId, offset: u32, length: u32, stride: u32) {
            self.0.draw_triangle_list(buffer, offset, length, stride)
        }
    }

    #[test]
    fn vector_tree_id_is_kept_without_vector_pipeline() {
        let mut rt = Runtime::new(GeometryOnly(HeadlessPal::new()));
        let stream = crate::vector::decode::tests::triangle_stream(0xFF00FF00);
        let id = rt
            .load_from_bytes(returning(&encode(1, 2, &stream, "")).as_bytes(), None)
            .unwrap();

        let tree = rt.render(id, None, false).unwrap();
        assert_eq!(rt.render_tree(tree).unwrap().node_at(0).unwrap().vector_id(), None);
        for _ in 0..5 {
            assert_eq!(rt.render(id, Some(tree), false), Some(tree));
        }
        assert_eq!(rt.tree_count(), 1);
    }

    #[test]
    fn geometry_tree_id_is_not_reused_for_vectors() {
        let mut rt = runtime();
        let geometry = load(&mut rt, &encode(1, 0, &[0; 44], "a,0,1,0,0"));
        let stream = crate::vector::decode::tests::triangle_stream(0xFFFFFFFF);
        let vector = load(&mut rt, &encode(1, 2, &stream, ""));

        let first = rt.render(geometry, None, false).unwrap();
        let second = rt.render(vector, Some(first), false).unwrap();
        assert_ne!(first, second);
        assert!(rt.render_tree(second).unwrap().is_vector());
        assert!(!rt.render_tree(first).unwrap().is_vector());
    }

    #[test]
    fn stale_tree_id_builds_new_vector_tree() {
        let mut rt = runtime();
        let stream = crate::vector::decode::tests::triangle_stream(0xFFFFFFFF);
        let id = load(&mut rt, &encode(1, 2, &stream, ""));
        let tree = rt.render(id, None, false).unwrap();
        rt.destroy_render_tree(tree);
        let fresh = rt.render(id, Some(tree), false).unwrap();
        assert_ne!(fresh, tree);
    }

    #[test]
    fn geometry_with_tree_id_builds_new_tree() {
        let mut rt = runtime();
        let id = load(&mut rt, &encode(1, 0, &[0; 44], "a,0,1,0,0"));
        let first = rt.render(id, None, false).unwrap();
        let second = rt.render(id, Some(first), false).unwrap();
        assert_ne!(first, second);
        assert_eq!(rt.tree_count(), 2);
    }

    #[test]
    fn truncated_output_is_an_error() {
        let mut rt = runtime();
        let mut output = encode(1, 0, &[], "");
        output[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        let id = load(&mut rt, &output);
        assert!(matches!(
            rt.try_render(id, None, false),
            Err(WanderError::Protocol(crate::ProtocolError::Truncated { .. }))
        ));
    }

    #[test]
    fn unloaded_renderlet_is_unknown() {
        let mut rt = runtime();
        let id = load(&mut rt, &encode(1, 0, &[0; 44], "a,0,1,0,0"));
        assert!(rt.unload(id));
        assert!(!rt.unload(id));
        assert!(matches!(rt.try_render(id, None, false), Err(WanderError::UnknownRenderlet(_))));
    }
}
