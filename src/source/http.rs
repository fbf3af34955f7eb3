//! Streaming network source.
//!
//! The request is issued lazily on the first read so that connection errors
//! surface inside the loader path that owns this source, not before the race
//! starts.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};

use super::StreamSource;

/// Streams a URL's body as it arrives. Fragment sizes are whatever the
/// network delivers.
pub struct HttpSource {
    client: Client,
    url: String,
    response: Option<Response>,
    started: bool,
    total: Option<u64>,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            response: None,
            started: false,
            total: None,
        }
    }
}

#[async_trait]
impl StreamSource for HttpSource {
    async fn next_fragment(&mut self) -> Result<Option<Bytes>> {
        if !self.started {
            self.started = true;
            let response = self
                .client
                .get(&self.url)
                .send()
                .await?
                .error_for_status()?;
            self.total = response.content_length();
            self.response = Some(response);
        }
        match self.response.as_mut() {
            Some(response) => Ok(response.chunk().await?),
            None => Ok(None),
        }
    }

    fn total_size(&self) -> Option<u64> {
        self.total
    }
}
