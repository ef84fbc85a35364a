use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use wasmtime::{Engine, Module};

use super::{Acquisition, StrategyKind, Transfer, append_limited};
use crate::error::LoadError;
use crate::loader;

/// Fetch everything into memory, then compile.
#[derive(Copy, Clone, Debug, Default)]
pub struct BufferedAcquisition;

impl Acquisition for BufferedAcquisition {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Buffered
    }

    fn acquire<'a>(
        &'a self,
        engine: &'a Engine,
        transfer: Transfer<'a>,
    ) -> BoxFuture<'a, Result<Module, LoadError>> {
        Box::pin(async move {
            let Transfer {
                location,
                mut chunks,
                limit,
            } = transfer;

            let mut buf = Vec::new();
            while let Some(chunk) = chunks.next().await {
                append_limited(&mut buf, &chunk?, location, limit)?;
            }
            tracing::debug!(location, bytes = buf.len(), "payload buffered");

            let wasm = loader::into_wasm(buf)?;
            Ok(loader::compile_module(engine, wasm).await?)
        })
    }
}
