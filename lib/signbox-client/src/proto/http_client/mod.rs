pub mod reqwest_client;

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use ct_codecs::{Base64, Encoder};
use itertools::Itertools;
use thiserror::Error;

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    fn post(&self, url: &str) -> RequestBuilder;

    async fn send(
        &self,
        url: &str,
        form: Option<MultipartForm>,
        headers: Option<Headers>,
    ) -> Result<Response, Error>;
}

pub type Headers = HashMap<String, String>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusCode(pub u16);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultipartPart {
    File {
        name: String,
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    Text {
        name: String,
        value: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub parts: Vec<MultipartPart>,
}

impl MultipartForm {
    pub fn file(
        mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(MultipartPart::File {
            name: name.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            bytes,
        });
        self
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart::Text {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            MultipartPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// One line per part, file parts are reduced to their name, type and size.
    pub fn describe(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                MultipartPart::File {
                    name,
                    filename,
                    content_type,
                    bytes,
                } => format!(
                    "{name}: file `{filename}` ({content_type}, {} bytes)",
                    bytes.len()
                ),
                MultipartPart::Text { name, value } => format!("{name}: {value}"),
            })
            .join("\n")
    }
}

#[derive(Debug)]
pub struct Request {
    /// See [`MultipartForm::describe`], document bytes are not kept
    pub form: Option<String>,
    pub headers: Headers,
    pub url: String,
}

#[derive(Debug)]
pub struct Response {
    pub body: Vec<u8>,
    pub headers: Headers,
    pub status: StatusCode,

    pub request: Request,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("No connection available after waiting {0:?}")]
    PoolAcquireTimeout(Duration),
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("Other HTTP client error: {0}")]
    Other(String),
}

impl Error {
    /// Timeouts and I/O failures are usually caused by network or server load.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Io(_) | Self::PoolAcquireTimeout(_)
        )
    }

    pub fn log_error(self, location: &std::panic::Location, request: &Request) -> Self {
        let debug_message = format!("\nPOST {} - {self}", request.url);
        tracing::error!(%debug_message, %location);

        self
    }
}

impl Response {
    pub fn header_get(&self, key: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|(header_key, _)| header_key.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    }

    #[track_caller]
    fn log_success(self) -> Self {
        let debug_message = format!("\nPOST {} - HTTP {}", &self.request.url, self.status);

        let location = std::panic::Location::caller();
        tracing::debug!(%debug_message, %location);
        log_request_details(location, &self.request);

        let trace_response = format!(
            "\nResponse\nStatus: {}\nHeaders:\n{}\nBody length: {} bytes\n",
            self.status,
            format_headers(&self.headers),
            self.body.len()
        );
        tracing::trace!(%trace_response, %location);

        self
    }
}

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    pub fn is_success(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub fn is_client_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    pub fn is_server_error(&self) -> bool {
        self.0 >= 500 && self.0 < 600
    }

    /// Standard reason phrase, e.g. `Service Unavailable` for 503.
    pub fn canonical_reason(&self) -> Option<&'static str> {
        reqwest::StatusCode::from_u16(self.0)
            .ok()
            .and_then(|status| status.canonical_reason())
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct RequestBuilder {
    client: Arc<dyn HttpClient>,
    form: Option<MultipartForm>,
    headers: Headers,
    url: String,
}

impl RequestBuilder {
    pub fn new(client: Arc<dyn HttpClient>, url: &str) -> Self {
        Self {
            client,
            form: None,
            headers: Headers::default(),
            url: url.to_string(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    #[track_caller]
    pub fn basic_auth(mut self, username: &str, password: &str) -> Result<Self, Error> {
        let location = std::panic::Location::caller();

        let credentials = Base64::encode_to_string(format!("{username}:{password}"))
            .map_err(|e| Error::Other(e.to_string()).log_error(location, &self.as_request()))?;
        self.headers
            .insert("Authorization".to_string(), format!("Basic {credentials}"));
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.form = Some(form);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn form(&self) -> Option<&MultipartForm> {
        self.form.as_ref()
    }

    // TODO: #[track_caller] once it is supported on async fn in stable Rust
    pub async fn send(self) -> Result<Response, Error> {
        let location = std::panic::Location::caller();
        let as_request = self.as_request();

        let headers = if self.headers.is_empty() {
            None
        } else {
            Some(self.headers)
        };

        self.client
            .send(&self.url, self.form, headers)
            .await
            .map(|response| response.log_success())
            .map_err(|e| {
                let error = e.log_error(location, &as_request);
                log_request_details(location, &as_request);
                error
            })
    }

    fn as_request(&self) -> Request {
        Request {
            form: self.form.as_ref().map(MultipartForm::describe),
            headers: self.headers.clone(),
            url: self.url.clone(),
        }
    }
}

const REDACTED_HEADERS: [&str; 2] = ["authorization", "x-signbox-easysign"];

fn format_headers(headers: &Headers) -> String {
    match headers.is_empty() {
        true => "<None>".to_string(),
        false => headers
            .iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(k, v)| {
                if REDACTED_HEADERS.contains(&k.to_ascii_lowercase().as_str()) {
                    format!("{k}: <redacted>")
                } else {
                    format!("{k}: {v}")
                }
            })
            .join("\n"),
    }
}

fn log_request_details(location: &std::panic::Location, request: &Request) {
    let trace_request = format!(
        "\nRequest\nHeaders:\n{}\nForm:\n{}\n",
        format_headers(&request.headers),
        request.form.as_deref().unwrap_or("<None>")
    );

    tracing::trace!(%trace_request, %location);
}
