use std::path::Path;

use wasmtime::{Engine, Module};

use crate::error::{ProtocolError, Result, WanderError};
use crate::id::RenderletId;
use crate::table::ResourceTable;

use super::renderlet::Renderlet;
use super::{EngineConfig, Param};

/// Owns the bytecode engine and every loaded renderlet.
///
/// Calls are synchronous on the calling thread. The engine may compile on
/// worker threads during [`Host::load`], nothing else leaves the caller.
pub struct Host {
    engine: Engine,
    config: EngineConfig,
    renderlets: ResourceTable<Renderlet>,
}

impl Host {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let engine = Engine::new(&config.to_wasmtime()).map_err(WanderError::Engine)?;
        Ok(Self {
            engine,
            config,
            renderlets: ResourceTable::default(),
        })
    }

    /// Compiles and instantiates a renderlet from binary or text bytecode.
    ///
    /// Fails if compilation or instantiation fails, or if `entry` or the
    /// linear-memory export is missing.
    pub fn load(&mut self, bytecode: &[u8], entry: &str) -> Result<RenderletId> {
        let module = Module::new(&self.engine, bytecode).map_err(WanderError::Compile)?;
        let renderlet = Renderlet::instantiate(&self.engine, module, entry, &self.config)?;
        let id = RenderletId::new(self.renderlets.insert(renderlet));
        log::debug!("loaded {id} ({} bytes, entry `{entry}`)", bytecode.len());
        Ok(id)
    }

    /// Reads a module from disk and loads it.
    pub fn load_file(&mut self, path: &Path, entry: &str) -> Result<RenderletId> {
        let bytecode = std::fs::read(path).map_err(|error| WanderError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        log::debug!("read renderlet module {}", path.display());
        self.load(&bytecode, entry)
    }

    #[inline]
    pub fn is_loaded(&self, id: RenderletId) -> bool {
        self.renderlets.contains(id.raw())
    }

    /// Queues a parameter for the next invocation of `id`.
    pub fn push_param(&mut self, id: RenderletId, param: impl Into<Param>) -> Result<()> {
        self.renderlet_mut(id)?.params_mut().push(param);
        Ok(())
    }

    /// Discards every queued parameter of `id`.
    pub fn reset_params(&mut self, id: RenderletId) -> Result<()> {
        self.renderlet_mut(id)?.params_mut().reset();
        Ok(())
    }

    /// Number of parameters waiting for the next invocation.
    pub fn pending_params(&self, id: RenderletId) -> Result<usize> {
        Ok(self.renderlet(id)?.params().len())
    }

    /// Invokes the entry function, returning an offset into linear memory.
    pub fn invoke(&mut self, id: RenderletId) -> Result<u32> {
        let renderlet = self.renderlet_mut(id)?;
        log::trace!(
            "invoking `{}` on {id} with {} params",
            renderlet.entry_name(),
            renderlet.params().len()
        );
        renderlet.call_entry()
    }

    /// Invokes an arbitrary export the same way as the entry function.
    pub fn invoke_export(&mut self, id: RenderletId, export: &str) -> Result<u32> {
        let renderlet = self.renderlet_mut(id)?;
        log::trace!(
            "invoking `{export}` on {id} with {} params",
            renderlet.params().len()
        );
        renderlet.call_export(export)
    }

    /// Whole linear memory of `id`.
    pub fn memory(&self, id: RenderletId) -> Result<&[u8]> {
        Ok(self.renderlet(id)?.memory())
    }

    /// Bounds-checked view into linear memory.
    pub fn read_memory(&self, id: RenderletId, offset: u32, len: usize) -> Result<&[u8]> {
        let memory = self.memory(id)?;
        let start = offset as usize;
        start
            .checked_add(len)
            .and_then(|end| memory.get(start..end))
            .ok_or_else(|| {
                ProtocolError::Truncated {
                    offset: start,
                    needed: len,
                    available: memory.len(),
                }
                .into()
            })
    }

    /// Invokes `export` and reads four little-endian `f32` at the returned offset.
    pub fn evaluate_float4(&mut self, id: RenderletId, export: &str) -> Result<[f32; 4]> {
        let offset = self.invoke_export(id, export)?;
        let bytes = self.read_memory(id, offset, 16)?;
        let mut out = [0.0f32; 4];
        for (v, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
            *v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(out)
    }

    /// Releases the renderlet. Unloading twice is a no-op.
    pub fn unload(&mut self, id: RenderletId) -> bool {
        let released = self.renderlets.remove(id.raw()).is_some();
        if released {
            log::debug!("unloaded {id}");
        }
        released
    }

    pub fn unload_all(&mut self) {
        for (raw, _renderlet) in self.renderlets.drain() {
            log::debug!("unloaded {}", RenderletId::new(raw));
        }
    }

    /// Number of loaded renderlets.
    pub fn loaded(&self) -> usize {
        self.renderlets.live()
    }

    fn renderlet(&self, id: RenderletId) -> Result<&Renderlet> {
        self.renderlets
            .get(id.raw())
            .ok_or(WanderError::UnknownRenderlet(id))
    }

    fn renderlet_mut(&mut self, id: RenderletId) -> Result<&mut Renderlet> {
        self.renderlets
            .get_mut(id.raw())
            .ok_or(WanderError::UnknownRenderlet(id))
    }
}
