//! Wasmtime-backed runtime glue.
//!
//! Responsibilities:
//! - Create a Wasmtime `Engine` with feature flags enabled.
//! - Apply the host import table to a `Linker<HostState>`.
//!
//! Entrypoint resolution lives in `crate::abi::GuestEntrypoints::resolve`.

pub mod imports;
pub mod runtime;

pub use imports::{DefaultHostImports, HostImports};
pub use runtime::WasmtimeRuntime;
