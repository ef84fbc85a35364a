//! Per-store host state.
//!
//! Every loaded module gets its own `Store<HostState>`, so nothing here is global: host
//! imports reach it through `Caller::data_mut`, and the frame forwarder through the handle.

use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::p1::WasiP1Ctx;

use crate::config::BootConfig;

pub struct HostState {
    /// Set by `wasmframe_request_frame`, cleared when the driver delivers a frame.
    frame_requested: bool,

    /// Total number of frame requests the guest has made.
    frame_requests: u64,

    /// WASI preview1 context. Built up front when `BootConfig::wasi` is set, otherwise on
    /// the first WASI call.
    wasi: Option<WasiP1Ctx>,
}

impl HostState {
    pub fn new(config: &BootConfig) -> Self {
        let wasi = config.wasi.then(wasi_ctx);

        Self {
            frame_requested: false,
            frame_requests: 0,
            wasi,
        }
    }

    pub fn request_frame(&mut self) {
        self.frame_requested = true;
        self.frame_requests += 1;
    }

    /// Whether a frame was requested since the last call, clearing the request.
    pub fn take_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }

    pub fn frame_requests(&self) -> u64 {
        self.frame_requests
    }

    /// WASI context accessor for the linker. Custom adapters may link WASI with
    /// `BootConfig::wasi` unset, so a missing context is created here.
    pub fn wasi_mut(&mut self) -> &mut WasiP1Ctx {
        self.wasi.get_or_insert_with(wasi_ctx)
    }
}

fn wasi_ctx() -> WasiP1Ctx {
    WasiCtxBuilder::new()
        .inherit_stdio()
        .inherit_env()
        .build_p1()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_request_is_taken_once() {
        let mut state = HostState::new(&BootConfig::default());
        assert!(!state.take_frame_request());

        state.request_frame();
        state.request_frame();
        assert!(state.take_frame_request());
        assert!(!state.take_frame_request());
        assert_eq!(state.frame_requests(), 2);
    }

    #[test]
    fn wasi_context_follows_config() {
        let state = HostState::new(&BootConfig::default());
        assert!(state.wasi.is_none());

        let state = HostState::new(&BootConfig {
            wasi: true,
            ..BootConfig::default()
        });
        assert!(state.wasi.is_some());
    }

    #[test]
    fn wasi_context_is_created_on_first_use() {
        let mut state = HostState::new(&BootConfig::default());
        let _ = state.wasi_mut();
        assert!(state.wasi.is_some());
    }
}
