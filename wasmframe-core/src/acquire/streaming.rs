use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use wasmparser::{Chunk, FuncValidatorAllocations, Parser, ValidPayload, Validator, WasmFeatures};
use wasmtime::{Engine, Module};

use super::{Acquisition, StrategyKind, Transfer, append_limited};
use crate::error::{InstantiationError, LoadError};
use crate::loader::{self, SNIFF_LEN};

/// Parse and validate as bytes arrive; compile once the last byte lands.
///
/// Text-format payloads can't be validated incrementally, so once the first bytes show
/// the payload isn't a binary module the rest of the transfer is simply buffered.
#[derive(Copy, Clone, Debug, Default)]
pub struct StreamingAcquisition;

impl Acquisition for StreamingAcquisition {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Streaming
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
            let mut mode = Mode::Sniffing;
            while let Some(chunk) = chunks.next().await {
                append_limited(&mut buf, &chunk?, location, limit)?;

                if matches!(mode, Mode::Sniffing) && buf.len() >= SNIFF_LEN {
                    mode = if loader::is_wasm_magic(&buf) {
                        Mode::Binary(IncrementalValidator::new())
                    } else {
                        tracing::debug!(location, "payload is not binary wasm, buffering the rest");
                        Mode::Text
                    };
                }

                if let Mode::Binary(validator) = &mut mode {
                    validator.feed(&buf, false)?;
                }
            }

            let wasm = match mode {
                Mode::Binary(mut validator) => {
                    validator.feed(&buf, true)?;
                    tracing::debug!(
                        location,
                        bytes = buf.len(),
                        functions = validator.functions,
                        "payload validated while streaming"
                    );
                    buf
                }
                Mode::Sniffing | Mode::Text => loader::into_wasm(buf)?,
            };

            Ok(loader::compile_module(engine, wasm).await?)
        })
    }
}

enum Mode {
    /// Fewer than [`SNIFF_LEN`] bytes so far.
    Sniffing,
    Binary(IncrementalValidator),
    Text,
}

/// Drives `wasmparser` over a growing buffer, validating each payload once it is complete.
struct IncrementalValidator {
    parser: Parser,
    validator: Validator,
    allocs: FuncValidatorAllocations,
    /// Bytes of the buffer already consumed by the parser.
    offset: usize,
    functions: u32,
    done: bool,
}

impl IncrementalValidator {
    fn new() -> Self {
        Self {
            parser: Parser::new(0),
            validator: Validator::new_with_features(WasmFeatures::all()),
            allocs: FuncValidatorAllocations::default(),
            offset: 0,
            functions: 0,
            done: false,
        }
    }

    /// Consume as many complete payloads from `buf[offset..]` as possible. With `eof` set,
    /// a module that isn't finished by the end of `buf` is an error.
    fn feed(&mut self, buf: &[u8], eof: bool) -> Result<(), InstantiationError> {
        while !self.done {
            let (consumed, payload) = match self
                .parser
                .parse(&buf[self.offset..], eof)
                .map_err(InstantiationError::Invalid)?
            {
                Chunk::NeedMoreData(_) => return Ok(()),
                Chunk::Parsed { consumed, payload } => (consumed, payload),
            };

            match self
                .validator
                .payload(&payload)
                .map_err(InstantiationError::Invalid)?
            {
                ValidPayload::Func(func, body) => {
                    let mut func = func.into_validator(std::mem::take(&mut self.allocs));
                    func.validate(&body).map_err(InstantiationError::Invalid)?;
                    self.allocs = func.into_allocations();
                    self.functions += 1;
                }
                ValidPayload::End(_) => self.done = true,
                _ => {}
            }

            self.offset += consumed;
        }
        Ok(())
    }
}
