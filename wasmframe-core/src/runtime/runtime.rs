//! Wasmtime engine + linker construction.

use wasmtime::{Engine, Linker};

use super::imports::HostImports;
use crate::state::HostState;

/// Host-side runtime container: one engine, one linker with the host import table applied.
pub struct WasmtimeRuntime {
    pub engine: Engine,
    pub linker: Linker<HostState>,
}

impl WasmtimeRuntime {
    /// Create a new Wasmtime runtime with a broad set of WebAssembly features enabled.
    ///
    /// Notes:
    /// - We enable a wide range of Wasm proposal features to maximize guest compatibility;
    ///   toolchains emitting GC or exception handling still load.
    /// - Threads are left off: frames are delivered on a single thread and the host exposes
    ///   no way to spawn.
    /// - Async support is on: WASI host calls are futures polled by the caller's tokio
    ///   runtime, so every guest call goes through `instantiate_async`/`call_async`.
    pub fn new(imports: &dyn HostImports) -> Result<Self, anyhow::Error> {
        let mut cfg = wasmtime::Config::new();

        // Broadly supported/expected features for "modern" Wasm modules.
        cfg.wasm_multi_value(true);
        cfg.wasm_bulk_memory(true);
        cfg.wasm_reference_types(true);
        cfg.wasm_simd(true);

        // Additional proposal support.
        cfg.wasm_multi_memory(true);
        cfg.wasm_memory64(true);
        cfg.wasm_relaxed_simd(true);
        cfg.wasm_tail_call(true);
        cfg.wasm_function_references(true);
        cfg.wasm_gc(true);
        cfg.wasm_exceptions(true);

        cfg.async_support(true);

        let engine = Engine::new(&cfg)?;
        let mut linker = Linker::new(&engine);
        imports.define(&mut linker)?;

        Ok(Self { engine, linker })
    }
}
