//! Host import definitions.
//!
//! The bootstrapper treats the import table as opaque: whatever implements [`HostImports`]
//! gets a chance to populate the linker before any module is instantiated.

use wasmtime::{Caller, Extern, Linker};

use crate::abi::{ABI_VERSION, GuestLogLevel, IMPORT_MODULE, guest_exports, host_imports};
use crate::state::HostState;

/// A host runtime adapter: supplies the functions a guest may import.
pub trait HostImports: Send + Sync {
    fn define(&self, linker: &mut Linker<HostState>) -> Result<(), anyhow::Error>;
}

/// The `wasmframe_*` imports under `"env"`, plus WASI preview1 when enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHostImports {
    pub wasi: bool,
}

impl HostImports for DefaultHostImports {
    fn define(&self, linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
        linker.func_wrap(
            IMPORT_MODULE,
            host_imports::ABI_VERSION,
            |_caller: Caller<'_, HostState>| -> u32 { ABI_VERSION },
        )?;

        linker.func_wrap(
            IMPORT_MODULE,
            host_imports::REQUEST_FRAME,
            |mut caller: Caller<'_, HostState>| {
                caller.data_mut().request_frame();
            },
        )?;

        linker.func_wrap(
            IMPORT_MODULE,
            host_imports::LOG,
            |mut caller: Caller<'_, HostState>, level: u32, ptr: u32, len: u32| {
                let Some(message) = read_guest_str(&mut caller, ptr, len) else {
                    tracing::warn!(ptr, len, "guest log message out of bounds");
                    return;
                };
                match GuestLogLevel::from_raw(level) {
                    GuestLogLevel::Error => tracing::error!(target: "guest", "{message}"),
                    GuestLogLevel::Warn => tracing::warn!(target: "guest", "{message}"),
                    GuestLogLevel::Info => tracing::info!(target: "guest", "{message}"),
                    GuestLogLevel::Debug => tracing::debug!(target: "guest", "{message}"),
                    GuestLogLevel::Trace => tracing::trace!(target: "guest", "{message}"),
                }
            },
        )?;

        if self.wasi {
            wasmtime_wasi::p1::add_to_linker_async(linker, HostState::wasi_mut)?;
        }

        Ok(())
    }
}

/// Copy `len` bytes at `ptr` out of the guest's exported memory, lossily decoded as UTF-8.
fn read_guest_str(caller: &mut Caller<'_, HostState>, ptr: u32, len: u32) -> Option<String> {
    let memory = caller
        .get_export(guest_exports::MEMORY)
        .and_then(Extern::into_memory)?;
    let start = ptr as usize;
    let end = start.checked_add(len as usize)?;
    let bytes = memory.data(&caller).get(start..end)?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}
