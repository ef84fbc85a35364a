//! wasmframe-core: fetch a WebAssembly module, start it, and forward animation frames to it.
//!
//! The pipeline:
//! - a [`source::ByteSource`] yields the payload (HTTP, file, or memory);
//! - an [`acquire::Acquisition`] strategy, picked once per process from a host capability
//!   probe, turns the byte stream into a compiled module, streaming or buffered;
//! - the [`Bootstrapper`] instantiates it against the host import table and runs its start
//!   routine exactly once;
//! - the resulting [`ModuleHandle`] lives in a [`FrameContext`], whose `forward_frame`
//!   passes each [`FrameEvent`] to the guest's `renderFrame` export.
//!
//! The guest ABI is defined in [`abi`] and mirrored by `wasmframe-sdk`.

pub mod abi;
pub mod acquire;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod loader;
pub mod runtime;
pub mod source;
pub mod state;

pub use bootstrap::{Bootstrapper, FrameEvent, ModuleHandle};
pub use config::{BootConfig, StrategyPreference};
pub use context::FrameContext;
pub use driver::{DriverStop, FrameDriver};
pub use error::{FetchError, FrameError, InstantiationError, LoadError};
