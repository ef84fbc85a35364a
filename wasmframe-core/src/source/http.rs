use futures_util::future::BoxFuture;
use futures_util::stream::StreamExt;
use reqwest::Url;

use super::{ByteSource, ByteStream};
use crate::error::FetchError;

/// Fetches the module with a single HTTP(S) GET.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
    location: String,
}

impl HttpSource {
    pub fn new(location: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|source| FetchError::Request {
                location: location.to_string(),
                source,
            })?;
        Self::with_client(client, location)
    }

    pub fn with_client(client: reqwest::Client, location: &str) -> Result<Self, FetchError> {
        let url = Url::parse(location).map_err(|e| FetchError::InvalidLocation {
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            url,
            location: location.to_string(),
        })
    }
}

impl ByteSource for HttpSource {
    fn location(&self) -> &str {
        &self.location
    }

    fn open(&self) -> BoxFuture<'_, Result<ByteStream, FetchError>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(self.url.clone())
                .send()
                .await
                .map_err(|source| FetchError::Request {
                    location: self.location.clone(),
                    source,
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    location: self.location.clone(),
                    status: status.as_u16(),
                });
            }

            tracing::debug!(
                location = %self.location,
                content_length = resp.content_length(),
                content_type = resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok()),
                "module response received"
            );

            let location = self.location.clone();
            let chunks = resp.bytes_stream().map(move |chunk| {
                chunk.map_err(|source| FetchError::Body {
                    location: location.clone(),
                    source,
                })
            });
            Ok(chunks.boxed())
        })
    }
}
