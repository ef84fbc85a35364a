#![cfg_attr(not(feature = "std"), no_std)]

//! wasmframe-sdk
//!
//! Used by **guest** WASM modules that run under the `wasmframe` loader.
//!
//! ABI model:
//! - The host fetches the module, instantiates it and runs the start routine once
//!   (`wasmframe_start`, falling back to `_start`, then `main`).
//! - The host then calls the per-frame export (default `renderFrame(now: f64)`) as long as
//!   the guest keeps asking for frames with [`request_frame`].
//!
//! Guests export their entrypoints themselves:
//!
//! ```ignore
//! #[unsafe(no_mangle)]
//! pub extern "C" fn wasmframe_start() {
//!     wasmframe_sdk::request_frame();
//! }
//!
//! #[unsafe(export_name = "renderFrame")]
//! pub extern "C" fn render_frame(now: f64) {
//!     wasmframe_sdk::request_frame();
//! }
//! ```

/// ABI version this SDK was written against.
pub const ABI_VERSION: u32 = 1;

/// Export names the host looks for.
pub mod exports {
    /// Default per-frame entry point.
    pub const FRAME: &str = "renderFrame";
    /// Preferred start routine.
    pub const START: &str = "wasmframe_start";
}

/// Low-level raw ABI imports.
pub mod sys {
    #[cfg_attr(target_family = "wasm", link(wasm_import_module = "env"))]
    unsafe extern "C" {
        #[link_name = "wasmframe_abi_version"]
        pub fn abi_version() -> u32;
        #[link_name = "wasmframe_request_frame"]
        pub fn request_frame();
        #[link_name = "wasmframe_log"]
        pub fn log(level: u32, ptr: u32, len: u32);
    }
}

/// Severity for [`log`]. Mirrors the host's levels.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

/// ABI version the host implements.
pub fn abi_version() -> u32 {
    unsafe { sys::abi_version() }
}

/// Whether the host speaks the ABI this SDK was built for.
pub fn abi_compatible() -> bool {
    abi_version() == ABI_VERSION
}

/// Ask for one more frame. The host stops delivering frames once a frame passes
/// without a request.
pub fn request_frame() {
    unsafe { sys::request_frame() }
}

/// Write a message to the host's log.
pub fn log(level: LogLevel, message: &str) {
    unsafe { sys::log(level as u32, message.as_ptr() as u32, message.len() as u32) }
}

pub fn info(message: &str) {
    log(LogLevel::Info, message);
}

pub fn warn(message: &str) {
    log(LogLevel::Warn, message);
}

pub fn error(message: &str) {
    log(LogLevel::Error, message);
}

pub mod prelude {
    pub use crate::{LogLevel, abi_compatible, abi_version, log, request_frame};
}
