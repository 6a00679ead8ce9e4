#![cfg_attr(feature = "strict", deny(warnings))]

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigValidationError, SignboxConfig};
use crate::proto::correlation::UuidCorrelationIdGenerator;
use crate::proto::http_client::reqwest_client::ReqwestClient;
use crate::service::SignboxService;

pub mod config;
pub mod model;
pub mod proto;
pub mod service;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigValidationError),
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] proto::http_client::Error),
}

/// Builds a service with its own connection pool and random correlation ids.
///
/// Call once at startup and share the returned service (it is cheap to clone).
pub fn initialize(config: SignboxConfig) -> Result<SignboxService, InitializationError> {
    config.validate()?;

    let http_client = ReqwestClient::from_config(&config.pool)?;

    Ok(SignboxService::new(
        Arc::new(http_client),
        Arc::new(config),
        Arc::new(UuidCorrelationIdGenerator),
    ))
}
