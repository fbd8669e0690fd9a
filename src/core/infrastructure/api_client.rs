//! Internal HTTP client for the B'GREEN backend.

use crate::{
    core::domain::{
        error::{BGreenError, BGreenResult, ValidationError},
        model::Payload,
        value_object::BaseUrl,
    },
    core::infrastructure::config::ClientConfig,
};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    Client, Method, Response,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client shared by every hook and write operation.
///
/// All paths are relative to one [`BaseUrl`]. Responses are parsed and then
/// validated through [`Payload`]; anything that does not fit the expected
/// schema becomes [`BGreenError::MalformedResponse`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: BaseUrl,
    config: Arc<ClientConfig>,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Errors
    /// Returns `BGreenError::Validation` for a zero rate limit, and
    /// `BGreenError::RequestFailed` if the HTTP client cannot be built.
    pub fn new(base_url: BaseUrl, config: ClientConfig) -> BGreenResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(|e| BGreenError::transport(e.to_string()))?;

        let rate_limiter = match config.rate_limit {
            Some(rl) => {
                let per_second = NonZeroU32::new(rl.requests_per_second).ok_or_else(|| {
                    ValidationError::field("rate_limit.requests_per_second", "must be above 0")
                })?;
                let burst = NonZeroU32::new(rl.burst_size).ok_or_else(|| {
                    ValidationError::field("rate_limit.burst_size", "must be above 0")
                })?;
                let quota = Quota::per_second(per_second).allow_burst(burst);
                Some(Arc::new(DefaultDirectRateLimiter::direct(quota)))
            }
            None => None,
        };

        Ok(Self {
            http_client,
            base_url,
            config: Arc::new(config),
            rate_limiter,
        })
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs a GET request without an explicit timeout.
    ///
    /// # Errors
    /// `RequestFailed` on transport failure or non-2xx status,
    /// `MalformedResponse` if the body does not fit `T`.
    pub async fn get<T>(&self, path: &str) -> BGreenResult<T>
    where
        T: Payload,
    {
        let response = self.send(Method::GET, path, None::<&()>, None).await?;
        Self::parse(response, path).await
    }

    /// Performs a POST request with a JSON body and parses a JSON answer.
    ///
    /// # Errors
    /// As [`ApiClient::get`], plus `Timeout` when `timeout` elapses.
    pub async fn post<B, T>(&self, path: &str, body: &B, timeout: Option<Duration>) -> BGreenResult<T>
    where
        B: Serialize + ?Sized,
        T: Payload,
    {
        let response = self.send(Method::POST, path, Some(body), timeout).await?;
        Self::parse(response, path).await
    }

    /// Performs a POST request where only the status matters.
    pub async fn post_ack<B>(&self, path: &str, body: Option<&B>, timeout: Duration) -> BGreenResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, body, Some(timeout)).await?;
        Ok(())
    }

    /// Performs a body-less POST whose answer is read as a stream of text
    /// lines. `timeout` bounds the wait for the response head only; the
    /// stream itself runs as long as the backend keeps sending.
    pub async fn post_stream(&self, path: &str, timeout: Duration) -> BGreenResult<LineStream> {
        let response = tokio::time::timeout(
            timeout,
            self.send(Method::POST, path, None::<&()>, None),
        )
        .await
        .map_err(|_| BGreenError::Timeout(format!("POST {} after {:?}", path, timeout)))??;
        Ok(LineStream::new(response))
    }

    /// Sends a request and turns transport failures and non-2xx answers into
    /// errors.
    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        timeout: Option<Duration>,
    ) -> BGreenResult<Response>
    where
        B: Serialize + ?Sized,
    {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = self.base_url.join(path);
        debug!(%method, %url, "backend request");

        let mut req_builder = self.http_client.request(method.clone(), &url);
        if let Some(body) = body {
            req_builder = req_builder.json(body);
        }
        if let Some(timeout) = timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| map_transport_error(&method, path, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            warn!(%method, path, status = status.as_u16(), "backend returned an error status");
            return Err(BGreenError::RequestFailed {
                status: Some(status.as_u16()),
                body,
                message: format!("{} {} returned {}", method, path, status),
            });
        }

        Ok(response)
    }

    async fn parse<T>(response: Response, path: &str) -> BGreenResult<T>
    where
        T: Payload,
    {
        let text = response
            .text()
            .await
            .map_err(|e| map_transport_error(&Method::GET, path, e))?;
        let value: T = serde_json::from_str(&text)
            .map_err(|e| BGreenError::MalformedResponse(format!("{}: {}", path, e)))?;
        value
            .validate()
            .map_err(|e| BGreenError::MalformedResponse(format!("{}: {}", path, e)))?;
        Ok(value)
    }
}

fn map_transport_error(method: &Method, path: &str, e: reqwest::Error) -> BGreenError {
    if e.is_timeout() {
        BGreenError::Timeout(format!("{} {}", method, path))
    } else {
        BGreenError::transport(format!("{} {} failed: {}", method, path, e))
    }
}

/// Incremental reader of a newline-delimited text response.
///
/// Chunks may split lines (and UTF-8 sequences) anywhere; lines are only
/// yielded once complete. Blank lines are skipped.
#[derive(Debug)]
pub struct LineStream {
    response: Response,
    buffer: Vec<u8>,
    finished: bool,
}

impl LineStream {
    fn new(response: Response) -> Self {
        Self {
            response,
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Returns the next non-blank line, or `None` at end of stream.
    pub async fn next_line(&mut self) -> BGreenResult<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    return Ok(Some(line));
                }
                continue;
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let raw = std::mem::take(&mut self.buffer);
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                return Ok((!line.is_empty()).then_some(line));
            }

            match self.response.chunk().await {
                Ok(Some(bytes)) => self.buffer.extend_from_slice(&bytes),
                Ok(None) => self.finished = true,
                Err(e) => return Err(map_transport_error(&Method::POST, "stream", e)),
            }
        }
    }

    /// Drains the stream, passing each line to `on_line`, and returns all
    /// lines read.
    pub async fn collect_lines<F>(mut self, mut on_line: F) -> BGreenResult<Vec<String>>
    where
        F: FnMut(&str),
    {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line().await? {
            on_line(&line);
            lines.push(line);
        }
        Ok(lines)
    }
}
