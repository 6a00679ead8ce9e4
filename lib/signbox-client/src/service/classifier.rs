//! Maps every response of the signing service, and every failure to obtain one, onto a
//! [`SigningOutcome`].
//!
//! Status codes are evaluated in a fixed order:
//! * 200: the body is the signed document, returned untouched
//! * 401: permanent, the same credentials will be rejected again
//! * 503: retryable, the service is overloaded
//! * anything else: the configured [`FailureKind`]
//!
//! Failure reasons come from the `detail` of a structured error body when one can be
//! decoded, otherwise from the HTTP reason phrase.

use crate::model::{FailureKind, ServerErrorPayload, SigningOutcome};
use crate::proto::http_client::{Error, Response, StatusCode};
use crate::service::request_builder::TRANSACTION_ID_HEADER;

pub fn classify_response(response: Response, unclassified: FailureKind) -> SigningOutcome {
    let transaction_id = response.header_get(TRANSACTION_ID_HEADER).cloned();
    let status = response.status;

    let kind = match status {
        StatusCode::OK => {
            tracing::info!(
                "Received response for request {} with status code: {status}, reason: {}",
                transaction_id.as_deref().unwrap_or("<unknown>"),
                reason_phrase(status)
            );
            return SigningOutcome::Signed {
                document: response.body,
                transaction_id,
            };
        }
        StatusCode::UNAUTHORIZED => FailureKind::Permanent,
        StatusCode::SERVICE_UNAVAILABLE => FailureKind::Retryable,
        _ => unclassified,
    };

    tracing::error!(
        "Received {} error status code {status} for request {} with reason: {}",
        kind.to_string().to_lowercase(),
        transaction_id.as_deref().unwrap_or("<unknown>"),
        reason_phrase(status)
    );

    let reason = parse_server_error(&response.body)
        .map(|payload| payload.detail)
        .unwrap_or_else(|| reason_phrase(status));

    match kind {
        FailureKind::Retryable => SigningOutcome::retryable(reason, transaction_id),
        FailureKind::Permanent => SigningOutcome::permanent(reason, transaction_id),
    }
}

/// No response was received: timeouts and I/O failures are worth retrying, anything
/// else points at a problem with the request itself.
///
/// The outcome only names the category of the failure, the error itself is logged.
pub fn classify_transport_error(error: &Error, correlation_id: &str) -> SigningOutcome {
    tracing::error!("Signing request {correlation_id} failed before a response was received: {error}");

    let reason = transport_failure_reason(error);
    if error.is_transient() {
        SigningOutcome::retryable(reason, None)
    } else {
        SigningOutcome::permanent(reason, None)
    }
}

fn transport_failure_reason(error: &Error) -> &'static str {
    match error {
        Error::Timeout(_) => "Signing service timed out",
        Error::Io(_) => "Signing service unreachable",
        Error::PoolAcquireTimeout(_) => "No connection to the signing service available",
        Error::HttpError(_) => "Invalid signing request",
        Error::Other(_) => "Signing request could not be sent",
    }
}

/// Best-effort decode of an error body.
///
/// The service sometimes sends the JSON document as an escaped JSON string, so all
/// backslashes and one pair of surrounding quotes are removed before decoding.
pub fn parse_server_error(body: &[u8]) -> Option<ServerErrorPayload> {
    if body.is_empty() {
        return None;
    }

    let unescaped = String::from_utf8_lossy(body).replace('\\', "");
    let unquoted = unescaped
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&unescaped);

    match serde_json::from_str::<ServerErrorPayload>(unquoted) {
        Ok(payload) => {
            tracing::debug!("Error response deserialized: {payload:?}");
            Some(payload)
        }
        Err(error) => {
            tracing::warn!("Error while parsing response body: {error}");
            None
        }
    }
}

/// Canonical phrase of the status code. The phrase on the server's status line is not
/// read, so a custom phrase sent by the service never becomes a failure reason.
fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP status {status}"))
}
