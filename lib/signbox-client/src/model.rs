use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Signature container requested from the remote service. The value is only a label,
/// the signature itself is produced server-side.
#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureFormat {
    #[serde(rename = "PADES")]
    #[strum(serialize = "PADES")]
    Pades,
    #[serde(rename = "XADES")]
    #[strum(serialize = "XADES")]
    Xades,
    #[serde(rename = "CADES")]
    #[strum(serialize = "CADES")]
    Cades,
}

#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureLevel {
    #[serde(rename = "BES")]
    #[strum(serialize = "BES")]
    Basic,
    #[serde(rename = "T")]
    #[strum(serialize = "T")]
    Timestamp,
}

impl SignatureLevel {
    pub fn from_timestamping(timestamping: bool) -> Self {
        if timestamping {
            Self::Timestamp
        } else {
            Self::Basic
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningRequest {
    document: Vec<u8>,
    format: SignatureFormat,
    level: SignatureLevel,
    correlation_id: String,
}

impl SigningRequest {
    pub fn new(
        document: Vec<u8>,
        format: SignatureFormat,
        level: SignatureLevel,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            document,
            format,
            level,
            correlation_id: correlation_id.into(),
        }
    }

    pub fn document(&self) -> &[u8] {
        &self.document
    }

    pub fn format(&self) -> SignatureFormat {
        self.format
    }

    pub fn level(&self) -> SignatureLevel {
        self.level
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn into_document(self) -> Vec<u8> {
        self.document
    }
}

/// Terminal result of a signing call.
///
/// `transaction_id` carries the correlation id echoed back by the service, when the
/// service sent one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SigningOutcome {
    Signed {
        document: Vec<u8>,
        transaction_id: Option<String>,
    },
    RetryableFailure {
        reason: String,
        transaction_id: Option<String>,
    },
    PermanentFailure {
        reason: String,
        transaction_id: Option<String>,
    },
}

impl SigningOutcome {
    pub fn retryable(reason: impl Into<String>, transaction_id: Option<String>) -> Self {
        Self::RetryableFailure {
            reason: reason.into(),
            transaction_id,
        }
    }

    pub fn permanent(reason: impl Into<String>, transaction_id: Option<String>) -> Self {
        Self::PermanentFailure {
            reason: reason.into(),
            transaction_id,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Signed { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableFailure { .. })
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::PermanentFailure { .. })
    }

    /// Failure reason, `None` for a signed document.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Signed { .. } => None,
            Self::RetryableFailure { reason, .. } | Self::PermanentFailure { reason, .. } => {
                Some(reason)
            }
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Self::Signed { transaction_id, .. }
            | Self::RetryableFailure { transaction_id, .. }
            | Self::PermanentFailure { transaction_id, .. } => transaction_id.as_deref(),
        }
    }

    pub fn into_result(self) -> Result<Vec<u8>, SignError> {
        match self {
            Self::Signed { document, .. } => Ok(document),
            Self::RetryableFailure { reason, .. } => Err(SignError::Retryable(reason)),
            Self::PermanentFailure { reason, .. } => Err(SignError::Permanent(reason)),
        }
    }
}

/// Failure category assigned to status codes other than 200, 401 and 503.
#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    #[default]
    Retryable,
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("Temporary signing failure: {0}")]
    Retryable(String),
    #[error("Permanent signing failure: {0}")]
    Permanent(String),
}

impl SignError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Structured error body returned by the signing service on non-200 responses.
///
/// Bodies with fields outside this set are not error payloads of the service and are
/// rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerErrorPayload {
    pub error_code: Option<i64>,
    pub detail: String,
    pub transaction_id: Option<String>,
}
