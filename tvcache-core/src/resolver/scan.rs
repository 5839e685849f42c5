use std::collections::HashMap;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{redirect, Client, ClientBuilder};
use tracing::{debug, instrument};
use url::Url;

use super::patterns::{find_stream, frame_url, iframe_sources};
use crate::config::ResolverConfig;
use crate::error::ResolveError;

/// Static strategy: fetch the document, match media URLs in its text, and
/// descend into inline frames up to `max_depth`.
#[derive(Debug, Clone)]
pub struct StaticScanner {
    client: Client,
    max_depth: usize,
}

impl StaticScanner {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"));

        let client = ClientBuilder::new()
            .redirect(redirect::Policy::limited(10))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self::with_client(client, config.max_depth))
    }

    pub fn with_client(client: Client, max_depth: usize) -> Self {
        Self { client, max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[instrument(skip(self), fields(max_depth = self.max_depth))]
    pub async fn resolve(&self, page_url: &str) -> Result<String, ResolveError> {
        let url = Url::parse(page_url)?;
        let mut visited = HashMap::new();
        self.scan(url, 0, &mut visited).await
    }

    /// `visited` maps each fetched URL to the shallowest depth it was fetched at;
    /// a frame seen again at that depth or deeper cannot find anything new.
    fn scan<'a>(
        &'a self,
        url: Url,
        depth: usize,
        visited: &'a mut HashMap<String, usize>,
    ) -> BoxFuture<'a, Result<String, ResolveError>> {
        async move {
            if depth > self.max_depth {
                return Err(ResolveError::DepthExceeded {
                    depth,
                    max: self.max_depth,
                });
            }
            visited.insert(url.as_str().to_owned(), depth);

            let body = self.fetch(&url).await?;

            if let Some(stream) = find_stream(&body) {
                debug!(page = %url, depth, stream, "media url found in document");
                return Ok(stream.to_owned());
            }

            // iframe récursif
            let frames: Vec<Url> = iframe_sources(&body)
                .filter_map(|src| frame_url(&url, src))
                .collect();
            for frame in frames {
                if visited
                    .get(frame.as_str())
                    .is_some_and(|&seen| seen <= depth + 1)
                {
                    debug!(frame = %frame, "frame already scanned, skipping");
                    continue;
                }
                match self.scan(frame.clone(), depth + 1, &mut *visited).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) => debug!(frame = %frame, depth = depth + 1, error = %e, "frame yielded no stream"),
                }
            }

            Err(ResolveError::ParseMiss)
        }
        .boxed()
    }

    async fn fetch(&self, url: &Url) -> Result<String, ResolveError> {
        let response = self
            .client
            .get(url.clone())
            .header(REFERER, url.as_str())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        if body.is_empty() {
            return Err(ResolveError::EmptyBody);
        }
        Ok(body)
    }
}
