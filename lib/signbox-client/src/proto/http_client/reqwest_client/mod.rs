use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};
use tokio::sync::Semaphore;

use super::{
    Error, Headers, HttpClient, MultipartForm, MultipartPart, Request, RequestBuilder, Response,
    StatusCode,
};

pub const DEFAULT_MAX_CONNECTIONS: usize = 40;
pub const DEFAULT_PENDING_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(600);

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// How long a request may wait in the queue for a free connection.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_pending_acquire_timeout")]
    pub pending_acquire_timeout: Duration,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub request_timeout: Option<Duration>,
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

fn default_pending_acquire_timeout() -> Duration {
    DEFAULT_PENDING_ACQUIRE_TIMEOUT
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            pending_acquire_timeout: DEFAULT_PENDING_ACQUIRE_TIMEOUT,
            request_timeout: None,
        }
    }
}

/// Pooled transport shared by every signing call.
///
/// Clones share the same connection pool and the same limit of concurrent exchanges.
/// Waiting callers are served in arrival order.
#[derive(Clone)]
pub struct ReqwestClient {
    pub client: reqwest::Client,
    permits: Arc<Semaphore>,
    pending_acquire_timeout: Duration,
}

impl ReqwestClient {
    pub fn new(client: reqwest::Client, config: &PoolConfig) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_connections)),
            pending_acquire_timeout: config.pending_acquire_timeout,
        }
    }

    pub fn from_config(config: &PoolConfig) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder().pool_max_idle_per_host(config.max_connections);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::new(client, config))
    }

    pub fn available_connections(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestClient {
    fn post(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(Arc::new(self.clone()), url)
    }

    #[track_caller]
    async fn send(
        &self,
        url: &str,
        form: Option<MultipartForm>,
        headers: Option<Headers>,
    ) -> Result<Response, Error> {
        let request = Request {
            form: form.as_ref().map(MultipartForm::describe),
            headers: headers.clone().unwrap_or_default(),
            url: url.to_string(),
        };

        let mut builder = self.client.post(url);

        if let Some(headers) = headers {
            builder = builder.headers(to_header_map(headers)?);
        }
        if let Some(form) = form {
            builder = builder.multipart(to_reqwest_form(form)?);
        }

        // held until the body has been read, dropping the future releases it
        let _permit = tokio::time::timeout(self.pending_acquire_timeout, self.permits.acquire())
            .await
            .map_err(|_| Error::PoolAcquireTimeout(self.pending_acquire_timeout))?
            .map_err(|e| Error::Other(e.to_string()))?;

        let response = builder.send().await.map_err(map_reqwest_error)?;

        // non-ASCII header values must not fail an otherwise complete exchange
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect::<Headers>();
        let status_code = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(Response {
            body: body.to_vec(),
            headers,
            status: StatusCode(status_code),
            request,
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout(error.to_string())
    } else if error.is_connect() || error.is_request() || error.is_body() {
        Error::Io(error.to_string())
    } else {
        Error::HttpError(error.to_string())
    }
}

fn to_reqwest_form(form: MultipartForm) -> Result<Form, Error> {
    form.parts
        .into_iter()
        .try_fold(Form::new(), |multipart, part| match part {
            MultipartPart::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                let part = Part::bytes(bytes)
                    .file_name(filename)
                    .mime_str(&content_type)
                    .map_err(|e| Error::Other(e.to_string()))?;
                Ok(multipart.part(name, part))
            }
            MultipartPart::Text { name, value } => Ok(multipart.text(name, value)),
        })
}

fn to_header_map(headers: HashMap<String, String>) -> Result<HeaderMap, Error> {
    headers
        .into_iter()
        .map(|(k, v)| {
            let name = HeaderName::from_str(k.as_str()).map_err(|e| Error::Other(e.to_string()))?;
            let value =
                HeaderValue::from_str(v.as_str()).map_err(|e| Error::Other(e.to_string()))?;

            Ok((name, value))
        })
        .collect::<Result<HeaderMap, Error>>()
}

#[cfg(test)]
mod test;
