//! Fetch, instantiate and start a guest module.
//!
//! [`Bootstrapper::load`] is the whole pipeline: open the byte source, hand the stream to
//! the acquisition strategy chosen at startup, instantiate the compiled module against the
//! host import table, resolve entrypoints, and run the start routine once. No retries: the
//! first failure is returned to the caller.

#[cfg(test)]
pub(crate) mod tests;

use std::time::{Duration, Instant};

use wasmtime::{Instance, Module, Store, Val};

use crate::abi::GuestEntrypoints;
use crate::acquire::{Acquisition, HostCapabilities, StrategyKind, Transfer, select_strategy};
use crate::config::BootConfig;
use crate::error::{FrameError, InstantiationError, LoadError};
use crate::runtime::{DefaultHostImports, HostImports, WasmtimeRuntime};
use crate::source::ByteSource;
use crate::state::HostState;

/// One animation-frame event. The value is opaque to the host and reaches the guest
/// unchanged; by convention it is a timestamp in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameEvent(pub f64);

impl FrameEvent {
    /// Timestamp event for `elapsed` since the animation started.
    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self(elapsed.as_secs_f64() * 1000.0)
    }
}

pub struct Bootstrapper {
    runtime: WasmtimeRuntime,
    strategy: Box<dyn Acquisition>,
    config: BootConfig,
}

impl Bootstrapper {
    /// Default host imports, strategy chosen by probing this host.
    pub fn new(config: BootConfig) -> Result<Self, InstantiationError> {
        let imports = DefaultHostImports { wasi: config.wasi };
        Self::with_imports(config, &imports, HostCapabilities::probe())
    }

    /// Custom import table. Adapters may link WASI through `HostState::wasi_mut` whether or
    /// not `config.wasi` is set; the context is created on first use.
    pub fn with_imports(
        config: BootConfig,
        imports: &dyn HostImports,
        caps: HostCapabilities,
    ) -> Result<Self, InstantiationError> {
        let runtime = WasmtimeRuntime::new(imports).map_err(InstantiationError::Host)?;
        let strategy = select_strategy(caps, config.strategy);
        tracing::debug!(
            strategy = %strategy.kind(),
            preference = %config.strategy,
            streaming_compile = caps.streaming_compile,
            "acquisition strategy selected"
        );

        Ok(Self {
            runtime,
            strategy,
            config,
        })
    }

    /// Replace the acquisition strategy picked at construction.
    pub fn with_strategy(mut self, strategy: Box<dyn Acquisition>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    pub async fn load(&self, source: &dyn ByteSource) -> Result<ModuleHandle, LoadError> {
        let started = Instant::now();
        let location = source.location();
        tracing::info!(location, strategy = %self.strategy.kind(), "loading module");

        let chunks = source.open().await?;
        let transfer = Transfer {
            location,
            chunks,
            limit: self.config.max_module_bytes,
        };
        let module = self
            .strategy
            .acquire(&self.runtime.engine, transfer)
            .await?;

        let handle = self.instantiate(&module).await?;
        tracing::info!(
            location,
            start = handle.start_routine().unwrap_or("none"),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "module started"
        );
        Ok(handle)
    }

    async fn instantiate(&self, module: &Module) -> Result<ModuleHandle, InstantiationError> {
        let mut store = Store::new(&self.runtime.engine, HostState::new(&self.config));
        let instance = self
            .runtime
            .linker
            .instantiate_async(&mut store, module)
            .await
            .map_err(InstantiationError::Link)?;

        let entrypoints =
            GuestEntrypoints::resolve(&instance, &mut store, &self.config.frame_export)?;

        if let Some((name, start)) = &entrypoints.start {
            match start.call_async(&mut store, ()).await {
                Ok(()) => {}
                Err(error) if exited_cleanly(&error) => {
                    tracing::debug!(start = *name, "start routine exited with status 0");
                }
                Err(error) => return Err(InstantiationError::Start { name: *name, error }),
            }
        }

        Ok(ModuleHandle {
            store,
            instance,
            entrypoints,
        })
    }
}

/// WASI commands end `_start` with `proc_exit`, which surfaces as a trap.
fn exited_cleanly(error: &wasmtime::Error) -> bool {
    error
        .downcast_ref::<wasmtime_wasi::I32Exit>()
        .is_some_and(|exit| exit.0 == 0)
}

/// A started guest instance.
pub struct ModuleHandle {
    store: Store<HostState>,
    instance: Instance,
    entrypoints: GuestEntrypoints,
}

impl ModuleHandle {
    /// Call the guest's per-frame export with `event`, unchanged.
    pub async fn forward_frame(&mut self, event: FrameEvent) -> Result<(), FrameError> {
        self.entrypoints
            .frame
            .call_async(&mut self.store, event.0)
            .await
            .map_err(FrameError::Trap)
    }

    /// Name of the start routine that ran, if the guest had one.
    pub fn start_routine(&self) -> Option<&'static str> {
        self.entrypoints.start.as_ref().map(|(name, _)| *name)
    }

    /// Whether the guest asked for another frame since the last call.
    pub fn take_frame_request(&mut self) -> bool {
        self.store.data_mut().take_frame_request()
    }

    pub fn host_state(&self) -> &HostState {
        self.store.data()
    }

    /// Current value of an exported global.
    pub fn global(&mut self, name: &str) -> Option<Val> {
        let global = self.instance.get_global(&mut self.store, name)?;
        Some(global.get(&mut self.store))
    }
}
