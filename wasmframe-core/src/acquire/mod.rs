//! Acquisition strategies: how a byte stream becomes a compiled module.
//!
//! Two implementations share the [`Acquisition`] trait and the same post-condition (a
//! compiled `wasmtime::Module`):
//! - [`StreamingAcquisition`] parses and validates the module while it downloads, so a bad
//!   payload fails before the transfer finishes.
//! - [`BufferedAcquisition`] collects every byte first, then compiles.
//!
//! The choice is made once, at startup, by [`select_strategy`].

mod buffered;
#[cfg(feature = "streaming")]
mod streaming;

use std::fmt;

use futures_util::future::BoxFuture;
use wasmtime::{Engine, Module};

use crate::config::StrategyPreference;
use crate::error::{FetchError, LoadError};
use crate::source::ByteStream;

pub use buffered::BufferedAcquisition;
#[cfg(feature = "streaming")]
pub use streaming::StreamingAcquisition;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StrategyKind {
    Streaming,
    Buffered,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyKind::Streaming => "streaming",
            StrategyKind::Buffered => "buffered",
        })
    }
}

/// An in-flight module transfer.
pub struct Transfer<'a> {
    pub location: &'a str,
    pub chunks: ByteStream,
    /// Reject the payload once it grows past this many bytes.
    pub limit: u64,
}

pub trait Acquisition: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn acquire<'a>(
        &'a self,
        engine: &'a Engine,
        transfer: Transfer<'a>,
    ) -> BoxFuture<'a, Result<Module, LoadError>>;
}

/// What the host can do, detected at startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HostCapabilities {
    /// Incremental parse/validate while bytes are still arriving.
    pub streaming_compile: bool,
}

impl HostCapabilities {
    pub fn probe() -> Self {
        Self {
            streaming_compile: cfg!(feature = "streaming"),
        }
    }
}

/// Pick the acquisition strategy for this process.
pub fn select_strategy(
    caps: HostCapabilities,
    preference: StrategyPreference,
) -> Box<dyn Acquisition> {
    match preference {
        StrategyPreference::Buffered => Box::new(BufferedAcquisition),
        StrategyPreference::Auto | StrategyPreference::Streaming => {
            if let Some(streaming) = streaming_strategy(caps) {
                return streaming;
            }
            if preference == StrategyPreference::Streaming {
                tracing::warn!("streaming compilation unavailable on this host; using buffered");
            }
            Box::new(BufferedAcquisition)
        }
    }
}

#[cfg(feature = "streaming")]
fn streaming_strategy(caps: HostCapabilities) -> Option<Box<dyn Acquisition>> {
    caps.streaming_compile
        .then(|| Box::new(StreamingAcquisition) as Box<dyn Acquisition>)
}

#[cfg(not(feature = "streaming"))]
fn streaming_strategy(_caps: HostCapabilities) -> Option<Box<dyn Acquisition>> {
    None
}

/// Append a chunk, enforcing the size limit.
pub(crate) fn append_limited(
    buf: &mut Vec<u8>,
    chunk: &[u8],
    location: &str,
    limit: u64,
) -> Result<(), FetchError> {
    let total = buf.len() as u64 + chunk.len() as u64;
    if total > limit {
        return Err(FetchError::TooLarge {
            location: location.to_string(),
            limit,
        });
    }
    buf.extend_from_slice(chunk);
    Ok(())
}
