//! wasmframe ABI module
//!
//! This module defines the contract between:
//! - **Host**: `wasmframe-core` (the loader shim)
//! - **Guest**: the loaded WASM module (the animation itself)
//!
//! ## Imports (guest -> host)
//! Imported from module `"env"`.
//!
//! - `wasmframe_abi_version() -> u32`
//! - `wasmframe_request_frame()`
//!     - Ask the host to deliver one more frame event. Without a pending request the
//!       frame driver stops, the same way an animation stops once it no longer calls
//!       `requestAnimationFrame`.
//! - `wasmframe_log(level: u32, ptr: u32, len: u32)`
//!     - UTF-8 message in guest memory (`memory` export), re-emitted through `tracing`.
//!
//! WASI preview1 imports are also available when the host enables them.
//!
//! ## Exports (host -> guest)
//! Required:
//! - `renderFrame(now: f64)` (the name is configurable). Called once per frame event; the
//!   argument is opaque to the host and forwarded verbatim.
//!
//! Optional start routine, first match wins:
//! - `wasmframe_start()`
//! - `_start()` (WASI command modules)
//! - `main()`
//!
//! ## ABI Stability
//! We version this ABI with a single integer. Incompatible changes bump the number.

use wasmtime::{AsContextMut, Instance, TypedFunc};

/// Current ABI version exposed to guests.
pub const ABI_VERSION: u32 = 1;

/// Import module name used by the guest.
pub const IMPORT_MODULE: &str = "env";

/// Guest export names (entrypoints).
pub mod guest_exports {
    /// Default per-frame entry point.
    pub const FRAME: &str = "renderFrame";

    /// Start routine candidates, in resolution order.
    pub const START_CANDIDATES: [&str; 3] = ["wasmframe_start", "_start", "main"];

    /// Linear memory, needed by host imports that read guest strings.
    pub const MEMORY: &str = "memory";
}

/// Host import names provided to the guest under [`IMPORT_MODULE`].
pub mod host_imports {
    pub const ABI_VERSION: &str = "wasmframe_abi_version";
    pub const REQUEST_FRAME: &str = "wasmframe_request_frame";
    pub const LOG: &str = "wasmframe_log";
}

/// Log levels accepted by `wasmframe_log`.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GuestLogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl GuestLogLevel {
    /// Unknown values clamp to `Trace` so a guest can't make the host reject a log line.
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => GuestLogLevel::Error,
            1 => GuestLogLevel::Warn,
            2 => GuestLogLevel::Info,
            3 => GuestLogLevel::Debug,
            _ => GuestLogLevel::Trace,
        }
    }
}

/// Why a guest's exports don't satisfy the ABI.
#[derive(Debug)]
pub enum ExportProblem {
    /// The per-frame export does not exist.
    Missing(String),
    /// An export exists but has the wrong signature.
    Signature { name: String, error: wasmtime::Error },
}

/// The guest's entrypoints, resolved once after instantiation.
#[derive(Clone)]
pub struct GuestEntrypoints {
    pub start: Option<(&'static str, TypedFunc<(), ()>)>,
    pub frame: TypedFunc<f64, ()>,
}

impl GuestEntrypoints {
    /// Resolve entrypoint exports from an instance.
    ///
    /// The frame export is required; the start routine is optional.
    pub fn resolve(
        instance: &Instance,
        mut store: impl AsContextMut,
        frame_export: &str,
    ) -> Result<Self, ExportProblem> {
        let frame = instance
            .get_func(&mut store, frame_export)
            .ok_or_else(|| ExportProblem::Missing(frame_export.to_string()))?
            .typed::<f64, ()>(&store)
            .map_err(|error| ExportProblem::Signature {
                name: frame_export.to_string(),
                error,
            })?;

        let mut start = None;
        for name in guest_exports::START_CANDIDATES {
            let Some(func) = instance.get_func(&mut store, name) else {
                continue;
            };
            let typed = func
                .typed::<(), ()>(&store)
                .map_err(|error| ExportProblem::Signature {
                    name: name.to_string(),
                    error,
                })?;
            start = Some((name, typed));
            break;
        }

        Ok(Self { start, frame })
    }
}
