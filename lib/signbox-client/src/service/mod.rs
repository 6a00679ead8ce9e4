use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::SignboxConfig;
use crate::model::{SignatureFormat, SignatureLevel, SigningOutcome, SigningRequest};
use crate::proto::correlation::CorrelationIdGenerator;
use crate::proto::http_client::HttpClient;

pub mod classifier;
pub mod request_builder;


#[derive(Debug, Error, PartialEq, Eq)]
#[error("Signing request `{0}` was cancelled")]
pub struct Cancelled(pub String);

/// Client of the remote signing service.
///
/// Every call is independent. The HTTP client, and with it the connection pool, is
/// shared by all calls and is expected to live as long as the process.
/// No call is retried internally.
#[derive(Clone)]
pub struct SignboxService {
    http_client: Arc<dyn HttpClient>,
    config: Arc<SignboxConfig>,
    id_generator: Arc<dyn CorrelationIdGenerator>,
}

impl SignboxService {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        config: Arc<SignboxConfig>,
        id_generator: Arc<dyn CorrelationIdGenerator>,
    ) -> Self {
        Self {
            http_client,
            config,
            id_generator,
        }
    }

    /// Sign a PDF document with PAdES format
    pub async fn sign_pdf_document(&self, document: Vec<u8>, timestamping: bool) -> SigningOutcome {
        self.sign_document(
            document,
            SignatureFormat::Pades,
            SignatureLevel::from_timestamping(timestamping),
        )
        .await
    }

    /// Sign an XML document with XAdES format
    pub async fn sign_xml_document(&self, document: Vec<u8>, timestamping: bool) -> SigningOutcome {
        self.sign_document(
            document,
            SignatureFormat::Xades,
            SignatureLevel::from_timestamping(timestamping),
        )
        .await
    }

    /// Sign a generic document with CAdES format
    pub async fn pkcs7_signature(&self, document: Vec<u8>, timestamping: bool) -> SigningOutcome {
        self.sign_document(
            document,
            SignatureFormat::Cades,
            SignatureLevel::from_timestamping(timestamping),
        )
        .await
    }

    pub async fn sign_document(
        &self,
        document: Vec<u8>,
        format: SignatureFormat,
        level: SignatureLevel,
    ) -> SigningOutcome {
        let request = SigningRequest::new(document, format, level, self.id_generator.generate());
        self.sign(request).await
    }

    pub async fn sign(&self, request: SigningRequest) -> SigningOutcome {
        let correlation_id = request.correlation_id().to_owned();

        if request.document().is_empty() {
            tracing::error!("Rejected sign request {correlation_id}: document cannot be empty");
            return SigningOutcome::permanent("Document cannot be empty", None);
        }

        tracing::info!(
            "Invoked sign request {correlation_id} with params format={}, level={}, document length: {} bytes",
            request.format(),
            request.level(),
            request.document().len()
        );

        let builder = match request_builder::build_sign_request(
            self.http_client.as_ref(),
            &self.config,
            request,
        ) {
            Ok(builder) => builder,
            Err(error) => return classifier::classify_transport_error(&error, &correlation_id),
        };

        match builder.send().await {
            Ok(response) => classifier::classify_response(response, self.config.unclassified_status),
            Err(error) => classifier::classify_transport_error(&error, &correlation_id),
        }
    }

    /// Like [`Self::sign`], but gives up as soon as `token` is cancelled. The in-flight
    /// exchange is dropped, which also returns its connection to the pool.
    pub async fn sign_cancellable(
        &self,
        request: SigningRequest,
        token: &CancellationToken,
    ) -> Result<SigningOutcome, Cancelled> {
        let correlation_id = request.correlation_id().to_owned();

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!("Sign request {correlation_id} cancelled by caller");
                Err(Cancelled(correlation_id))
            }
            outcome = self.sign(request) => Ok(outcome),
        }
    }
}
