//! The explicitly owned handle slot that frame forwarding goes through.

use crate::bootstrap::{Bootstrapper, FrameEvent, ModuleHandle};
use crate::error::{FrameError, LoadError};
use crate::source::ByteSource;

/// Holds the module handle once loading succeeds. Built at startup and passed to whoever
/// delivers frames.
#[derive(Default)]
pub struct FrameContext {
    handle: Option<ModuleHandle>,
}

impl FrameContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and start the module. On failure the context stays empty.
    pub async fn init(
        &mut self,
        bootstrapper: &Bootstrapper,
        source: &dyn ByteSource,
    ) -> Result<(), LoadError> {
        if self.handle.is_some() {
            return Err(LoadError::AlreadyLoaded);
        }
        let handle = bootstrapper.load(source).await?;
        self.handle = Some(handle);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    /// Pass `event` to the guest's per-frame export.
    pub async fn forward_frame(&mut self, event: FrameEvent) -> Result<(), FrameError> {
        self.handle
            .as_mut()
            .ok_or(FrameError::NotLoaded)?
            .forward_frame(event)
            .await
    }

    pub fn handle(&self) -> Option<&ModuleHandle> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut ModuleHandle> {
        self.handle.as_mut()
    }
}
