//! Loader configuration.

use std::fmt;
use std::str::FromStr;

use crate::abi::guest_exports;

/// Where the module is fetched from when nothing else is configured.
pub const DEFAULT_LOCATION: &str = "wasm.wasm";

/// Payloads larger than this are rejected while downloading.
pub const DEFAULT_MAX_MODULE_BYTES: u64 = 256 * 1024 * 1024;

/// Which acquisition strategy the host would like to use.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum StrategyPreference {
    /// Streaming when the host supports it, buffered otherwise.
    #[default]
    Auto,
    Streaming,
    Buffered,
}

impl FromStr for StrategyPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "streaming" | "stream" => Ok(Self::Streaming),
            "buffered" | "buffer" => Ok(Self::Buffered),
            other => Err(format!(
                "unknown strategy `{other}` (expected auto, streaming or buffered)"
            )),
        }
    }
}

impl fmt::Display for StrategyPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Streaming => "streaming",
            Self::Buffered => "buffered",
        })
    }
}

/// Settings consumed by [`crate::Bootstrapper`].
#[derive(Clone, Debug)]
pub struct BootConfig {
    pub strategy: StrategyPreference,
    /// Name of the per-frame export (`(f64) -> ()`).
    pub frame_export: String,
    /// Upper bound on the payload size, enforced while bytes arrive.
    pub max_module_bytes: u64,
    /// Link WASI preview1 imports (stdio inherited from the host process).
    pub wasi: bool,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyPreference::Auto,
            frame_export: guest_exports::FRAME.to_string(),
            max_module_bytes: DEFAULT_MAX_MODULE_BYTES,
            wasi: false,
        }
    }
}
