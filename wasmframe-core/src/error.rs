//! Error types surfaced by the loader.
//!
//! Wasmtime reports its failures as `wasmtime::Error` (an `anyhow` error), which doesn't
//! implement `std::error::Error`; those are carried as plain fields and rendered with `{:#}`
//! so the full context chain ends up in the message.

use thiserror::Error;

/// Retrieving the module bytes failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid module location `{location}`: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("request to {location} failed")]
    Request {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{location} answered with HTTP status {status}")]
    Status { location: String, status: u16 },

    #[error("reading {location} failed")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transfer from {location} was interrupted")]
    Body {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{location} exceeds the module size limit of {limit} bytes")]
    TooLarge { location: String, limit: u64 },
}

/// The bytes arrived but could not be turned into a running instance.
#[derive(Debug, Error)]
pub enum InstantiationError {
    #[error("unrecognized module format (expected wasm or wat)")]
    UnrecognizedFormat,

    #[error("failed to parse WAT")]
    WatParse(#[source] wat::Error),

    #[cfg(feature = "streaming")]
    #[error("invalid module at byte offset {}", .0.offset())]
    Invalid(#[source] wasmparser::BinaryReaderError),

    #[error("failed to compile module: {0:#}")]
    Compile(wasmtime::Error),

    #[error("failed to instantiate module: {0:#}")]
    Link(wasmtime::Error),

    #[error("module does not export `{0}`")]
    MissingExport(String),

    #[error("export `{name}` has the wrong signature: {error:#}")]
    ExportSignature { name: String, error: wasmtime::Error },

    #[error("start routine `{name}` failed: {error:#}")]
    Start {
        name: &'static str,
        error: wasmtime::Error,
    },

    #[error("host setup failed: {0:#}")]
    Host(anyhow::Error),
}

/// Anything that can go wrong between `load` starting and a handle existing.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    #[error("a module is already loaded into this context")]
    AlreadyLoaded,
}

/// Forwarding a frame event failed.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame forwarded before the module finished loading")]
    NotLoaded,

    #[error("guest trapped while rendering a frame: {0:#}")]
    Trap(wasmtime::Error),
}

impl From<crate::abi::ExportProblem> for InstantiationError {
    fn from(problem: crate::abi::ExportProblem) -> Self {
        match problem {
            crate::abi::ExportProblem::Missing(name) => InstantiationError::MissingExport(name),
            crate::abi::ExportProblem::Signature { name, error } => {
                InstantiationError::ExportSignature { name, error }
            }
        }
    }
}
