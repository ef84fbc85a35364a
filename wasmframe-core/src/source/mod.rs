//! Byte sources: where the module payload comes from.
//!
//! A source hands out an async stream of chunks. Acquisition strategies decide whether to
//! consume it incrementally or collect it first; sources don't care.

mod http;
#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio_util::io::ReaderStream;

use crate::error::FetchError;

pub use http::HttpSource;

/// Chunks of module bytes as they arrive.
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Something the bootstrapper can fetch a module from.
pub trait ByteSource: Send + Sync {
    /// Human-readable location, used in logs and error messages.
    fn location(&self) -> &str;

    /// Start the transfer. Connection and status failures surface here; failures after the
    /// first byte surface as stream items.
    fn open(&self) -> BoxFuture<'_, Result<ByteStream, FetchError>>;
}

/// Pick a source for a location string.
///
/// `http://` and `https://` go over the network; `file://` URLs and anything else are
/// treated as local paths.
pub fn from_location(location: &str) -> Result<Box<dyn ByteSource>, FetchError> {
    let lower = location.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(Box::new(HttpSource::new(location)?));
    }

    if lower.starts_with("file://") {
        let url = reqwest::Url::parse(location).map_err(|e| FetchError::InvalidLocation {
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        let path = url
            .to_file_path()
            .map_err(|()| FetchError::InvalidLocation {
                location: location.to_string(),
                reason: "not a local file path".to_string(),
            })?;
        return Ok(Box::new(FileSource::new(path)));
    }

    if location.contains("://") {
        return Err(FetchError::InvalidLocation {
            location: location.to_string(),
            reason: "unsupported scheme".to_string(),
        });
    }

    Ok(Box::new(FileSource::new(location)))
}

/// Reads the module from the local filesystem.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
    location: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let location = path.display().to_string();
        Self { path, location }
    }
}

impl ByteSource for FileSource {
    fn location(&self) -> &str {
        &self.location
    }

    fn open(&self) -> BoxFuture<'_, Result<ByteStream, FetchError>> {
        Box::pin(async move {
            let file = tokio::fs::File::open(&self.path)
                .await
                .map_err(|source| FetchError::Io {
                    location: self.location.clone(),
                    source,
                })?;

            let location = self.location.clone();
            let chunks = ReaderStream::new(file).map(move |chunk| {
                chunk.map_err(|source| FetchError::Io {
                    location: location.clone(),
                    source,
                })
            });
            Ok(chunks.boxed())
        })
    }
}

/// Serves bytes already in memory, split into fixed-size chunks.
///
/// Useful for embedding a module in the host binary, and for exercising the streaming path
/// with awkward chunk boundaries.
#[derive(Clone, Debug)]
pub struct MemorySource {
    bytes: Bytes,
    chunk_size: usize,
    location: String,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            chunk_size: 64 * 1024,
            location: "memory".to_string(),
        }
    }

    /// Chunk size of the produced stream; zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}

impl ByteSource for MemorySource {
    fn location(&self) -> &str {
        &self.location
    }

    fn open(&self) -> BoxFuture<'_, Result<ByteStream, FetchError>> {
        let bytes = self.bytes.clone();
        let chunk_size = self.chunk_size;
        let chunks: Vec<Result<Bytes, FetchError>> = (0..bytes.len())
            .step_by(chunk_size)
            .map(|start| Ok(bytes.slice(start..(start + chunk_size).min(bytes.len()))))
            .collect();
        Box::pin(async move { Ok(stream::iter(chunks).boxed()) })
    }
}
