use wasmtime::{Engine, Func, Instance, Linker, Memory, Module, Store, Val};
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::preview1::{self, WasiP1Ctx};

use crate::error::{Result, WanderError};

use super::{EngineConfig, ParamQueue};

/// Name of the linear-memory export every renderlet must provide.
pub(crate) const MEMORY_EXPORT: &str = "memory";

pub(crate) struct HostState {
    wasi: WasiP1Ctx,
}

/// One instantiated renderlet.
///
/// Owns its store, link context and module, so dropping it releases all
/// three together.
pub(crate) struct Renderlet {
    store: Store<HostState>,
    instance: Instance,
    entry: Func,
    entry_name: String,
    memory: Memory,
    params: ParamQueue,
    _linker: Linker<HostState>,
    _module: Module,
}

impl Renderlet {
    pub fn instantiate(
        engine: &Engine,
        module: Module,
        entry: &str,
        config: &EngineConfig,
    ) -> Result<Self> {
        let mut linker = Linker::new(engine);
        preview1::add_to_linker_sync(&mut linker, |state: &mut HostState| &mut state.wasi)
            .map_err(WanderError::Instantiate)?;

        let mut store = Store::new(
            engine,
            HostState {
                wasi: wasi_context(config),
            },
        );

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(WanderError::Instantiate)?;

        let entry_fn = instance
            .get_func(&mut store, entry)
            .ok_or_else(|| WanderError::MissingExport(entry.to_string()))?;

        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or_else(|| WanderError::MissingExport(MEMORY_EXPORT.to_string()))?;

        Ok(Self {
            store,
            instance,
            entry: entry_fn,
            entry_name: entry.to_string(),
            memory,
            params: ParamQueue::default(),
            _linker: linker,
            _module: module,
        })
    }

    #[inline]
    pub fn params(&self) -> &ParamQueue {
        &self.params
    }

    #[inline]
    pub fn params_mut(&mut self) -> &mut ParamQueue {
        &mut self.params
    }

    #[inline]
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    /// Current contents of linear memory.
    #[inline]
    pub fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    /// Calls the entry function with the queued parameters.
    pub fn call_entry(&mut self) -> Result<u32> {
        let func = self.entry;
        let name = self.entry_name.clone();
        self.call(func, &name)
    }

    /// Calls an arbitrary export with the queued parameters.
    pub fn call_export(&mut self, export: &str) -> Result<u32> {
        let func = self
            .instance
            .get_func(&mut self.store, export)
            .ok_or_else(|| WanderError::MissingExport(export.to_string()))?;
        self.call(func, export)
    }

    fn call(&mut self, func: Func, export: &str) -> Result<u32> {
        // The queue is consumed even when the call fails.
        let args: Vec<Val> = self.params.drain().into_iter().map(Val::from).collect();

        let result_count = func.ty(&self.store).results().len();
        if result_count != 1 {
            return Err(WanderError::UnexpectedResult {
                export: export.to_string(),
                found: format!("{result_count} results"),
            });
        }

        let mut results = [Val::I32(0)];
        func.call(&mut self.store, &args, &mut results)
            .map_err(|error| WanderError::Call {
                export: export.to_string(),
                error,
            })?;

        match &results[0] {
            Val::I32(offset) => Ok(*offset as u32),
            other => Err(WanderError::UnexpectedResult {
                export: export.to_string(),
                found: format!("{other:?}"),
            }),
        }
    }
}

fn wasi_context(config: &EngineConfig) -> WasiP1Ctx {
    let mut builder = WasiCtxBuilder::new();
    if config.inherit_stdio {
        builder.inherit_stdio();
    }
    if config.inherit_env {
        builder.inherit_env();
    }
    if config.inherit_args {
        builder.inherit_args();
    }
    builder.build_p1()
}
