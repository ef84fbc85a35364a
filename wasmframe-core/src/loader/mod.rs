//! Payload sniffing and compilation.
//!
//! Responsibilities:
//! - Detect whether the fetched bytes are a `.wasm` binary or `.wat` text.
//! - If it looks like WAT, convert it to WASM bytes (via the `wat` crate).
//! - Compile a Wasmtime `Module` from the resulting WASM bytes, off the async executor.
//!
//! Notes:
//! - Servers often mislabel `.wasm` content types, so we sniff the bytes themselves.
//! - We accept a UTF-8 BOM and leading whitespace before WAT.

use wasmtime::{Engine, Module};

use crate::error::InstantiationError;

/// What kind of module the loader inferred from the bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DetectedFormat {
    Wasm,
    Wat,
}

/// Number of leading bytes [`detect_format`] may need before it can decide.
pub const SNIFF_LEN: usize = 4;

/// Best-effort detection.
///
/// Rules:
/// - If the first 4 bytes are `\0asm`, treat as WASM.
/// - Else, after stripping UTF-8 BOM / leading whitespace, if the first non-ws byte is `(`,
///   treat as WAT (common WAT starts with `(module ...)`).
///
/// This avoids requiring valid UTF-8 for WAT; `wat::parse_bytes` accepts bytes.
pub fn detect_format(bytes: &[u8]) -> Option<DetectedFormat> {
    if is_wasm_magic(bytes) {
        return Some(DetectedFormat::Wasm);
    }

    let i = skip_bom_and_leading_ws(bytes);
    if i < bytes.len() && bytes[i] == b'(' {
        return Some(DetectedFormat::Wat);
    }

    None
}

/// Detect format and normalize to valid WASM bytes. Binary payloads pass through untouched.
pub fn into_wasm(bytes: Vec<u8>) -> Result<Vec<u8>, InstantiationError> {
    match detect_format(&bytes).ok_or(InstantiationError::UnrecognizedFormat)? {
        DetectedFormat::Wasm => Ok(bytes),
        DetectedFormat::Wat => wat::parse_bytes(&bytes)
            .map(|converted| converted.into_owned())
            .map_err(InstantiationError::WatParse),
    }
}

/// Compile on tokio's blocking pool so a large module doesn't stall other tasks.
pub async fn compile_module(
    engine: &Engine,
    wasm_bytes: Vec<u8>,
) -> Result<Module, InstantiationError> {
    let engine = engine.clone();
    let len = wasm_bytes.len();
    let started = std::time::Instant::now();

    let module = tokio::task::spawn_blocking(move || Module::new(&engine, &wasm_bytes))
        .await
        .map_err(|join| {
            InstantiationError::Compile(anyhow::anyhow!("compile task failed: {join}"))
        })?
        .map_err(InstantiationError::Compile)?;

    tracing::debug!(
        bytes = len,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "module compiled"
    );
    Ok(module)
}

pub(crate) fn is_wasm_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[0..4] == *b"\0asm"
}

fn skip_bom_and_leading_ws(bytes: &[u8]) -> usize {
    let mut i = 0;

    // UTF-8 BOM: EF BB BF
    if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        i = 3;
    }

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            _ => break,
        }
    }

    i
}
