use crate::config::SignboxConfig;
use crate::model::SigningRequest;
use crate::proto::http_client::{Error, HttpClient, MultipartForm, RequestBuilder};

pub const API_KEY_HEADER: &str = "X-SIGNBOX-EASYSIGN";
pub const TRANSACTION_ID_HEADER: &str = "X-SIGNBOX-TRANSACTION-ID";

const FILE_PART: &str = "file";
const FILE_CONTENT_TYPE: &str = "application/octet-stream";
const LEVEL_PART: &str = "level";
const FORMAT_PART: &str = "format";

/// Prepares the multipart upload for a single signing call, nothing is sent yet.
pub fn build_sign_request(
    http_client: &dyn HttpClient,
    config: &SignboxConfig,
    request: SigningRequest,
) -> Result<RequestBuilder, Error> {
    let (level, format) = (request.level(), request.format());
    let correlation_id = request.correlation_id().to_owned();

    let form = MultipartForm::default()
        .file(
            FILE_PART,
            &correlation_id,
            FILE_CONTENT_TYPE,
            request.into_document(),
        )
        .text(LEVEL_PART, level.to_string())
        .text(FORMAT_PART, format.to_string());

    let mut builder = http_client
        .post(&config.endpoint)
        .header(API_KEY_HEADER, config.api_key())
        .header(TRANSACTION_ID_HEADER, &correlation_id);

    if let Some((username, password)) = config.basic_auth() {
        builder = builder.basic_auth(username, password)?;
    }

    Ok(builder.multipart(form))
}
