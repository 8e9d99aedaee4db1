/// Bytecode engine configuration.
///
/// Defaults enable the proposals renderlet toolchains commonly emit and turn
/// optimization off, trading execution speed for fast module loads.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub simd: bool,
    pub bulk_memory: bool,
    pub multi_value: bool,
    pub multi_memory: bool,
    pub reference_types: bool,
    pub threads: bool,

    /// Run the optimizing code generator.
    pub optimize: bool,

    /// Compile functions on worker threads at load time.
    pub parallel_compilation: bool,

    /// Share the host's stdin/stdout/stderr with renderlets.
    pub inherit_stdio: bool,
    pub inherit_env: bool,
    pub inherit_args: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simd: true,
            bulk_memory: true,
            multi_value: true,
            multi_memory: true,
            reference_types: true,
            threads: true,
            optimize: false,
            parallel_compilation: true,
            inherit_stdio: true,
            inherit_env: true,
            inherit_args: true,
        }
    }
}

impl EngineConfig {
    pub(crate) fn to_wasmtime(&self) -> wasmtime::Config {
        let mut config = wasmtime::Config::new();
        config
            .wasm_simd(self.simd)
            .wasm_bulk_memory(self.bulk_memory)
            .wasm_multi_value(self.multi_value)
            .wasm_multi_memory(self.multi_memory)
            .wasm_reference_types(self.reference_types)
            .wasm_threads(self.threads)
            .parallel_compilation(self.parallel_compilation)
            .cranelift_debug_verifier(false)
            .cranelift_opt_level(if self.optimize {
                wasmtime::OptLevel::Speed
            } else {
                wasmtime::OptLevel::None
            });
        config
    }
}
