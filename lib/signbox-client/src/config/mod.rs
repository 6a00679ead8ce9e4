use std::path::Path;

use figment::Figment;
#[cfg(feature = "config_env")]
use figment::providers::Env;
#[cfg(feature = "config_json")]
use figment::providers::Json;
#[cfg(feature = "config_yaml")]
use figment::providers::Yaml;
use figment::providers::{Data, Format};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::model::FailureKind;
use crate::proto::http_client::reqwest_client::PoolConfig;

#[cfg(test)]
mod test;

#[derive(Debug, Error)]
pub enum ConfigParsingError {
    #[error("Config parsing error: `{0}`")]
    GeneralParsingError(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Invalid endpoint `{0}`: {1}")]
    InvalidEndpoint(String, String),
    #[error("Connection pool must allow at least one connection")]
    EmptyConnectionPool,
}

/// Connection settings for the remote signing service.
///
/// Every field has a default, an empty document is a valid configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignboxConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub unclassified_status: FailureKind,
}

pub enum InputFormat {
    #[cfg(feature = "config_yaml")]
    Yaml(Data<Yaml>),
    #[cfg(feature = "config_json")]
    Json(Data<Json>),
}

impl InputFormat {
    #[cfg(feature = "config_yaml")]
    pub fn yaml_file(p: impl AsRef<Path>) -> InputFormat {
        InputFormat::Yaml(Yaml::file(p))
    }

    #[cfg(feature = "config_yaml")]
    pub fn yaml_str(s: impl AsRef<str>) -> InputFormat {
        InputFormat::Yaml(Yaml::string(s.as_ref()))
    }

    #[cfg(feature = "config_json")]
    pub fn json_file(p: impl AsRef<Path>) -> InputFormat {
        InputFormat::Json(Json::file(p))
    }

    #[cfg(feature = "config_json")]
    pub fn json_str(s: impl AsRef<str>) -> InputFormat {
        InputFormat::Json(Json::string(s.as_ref()))
    }
}

impl SignboxConfig {
    pub fn from_files(files: &[impl AsRef<Path>]) -> Result<Self, ConfigParsingError> {
        let mut inputs: Vec<InputFormat> = Vec::with_capacity(files.len());

        for path in files {
            #[cfg(feature = "config_yaml")]
            if path
                .as_ref()
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml")
            {
                inputs.push(InputFormat::yaml_file(path));
                continue;
            }

            #[cfg(feature = "config_json")]
            if path.as_ref().extension() == Some("json".as_ref()) {
                inputs.push(InputFormat::json_file(path));
                continue;
            }

            return Err(ConfigParsingError::GeneralParsingError(format!(
                "Unsupported file or missing file extension: {:?}",
                path.as_ref().to_str()
            )));
        }

        Self::parse(inputs)
    }

    #[cfg(feature = "config_yaml")]
    pub fn from_yaml(
        configs: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, ConfigParsingError> {
        let inputs = configs.into_iter().map(InputFormat::yaml_str);

        Self::parse(inputs)
    }

    /// Later inputs override earlier ones, `SIGNBOX_`-prefixed environment variables
    /// override all files when the `config_env` feature is enabled.
    pub fn parse(
        inputs: impl IntoIterator<Item = InputFormat>,
    ) -> Result<Self, ConfigParsingError> {
        let mut figment = Figment::new();

        for data in inputs {
            figment = match data {
                #[cfg(feature = "config_yaml")]
                InputFormat::Yaml(content) => figment.merge(content),
                #[cfg(feature = "config_json")]
                InputFormat::Json(content) => figment.merge(content),
            };
        }

        #[cfg(feature = "config_env")]
        {
            figment = figment.merge(Env::prefixed("SIGNBOX_").split("__").lowercase(false));
        }

        figment
            .extract::<SignboxConfig>()
            .map_err(|e| ConfigParsingError::GeneralParsingError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.endpoint.is_empty() {
            Url::parse(&self.endpoint).map_err(|e| {
                ConfigValidationError::InvalidEndpoint(self.endpoint.clone(), e.to_string())
            })?;
        }

        if self.pool.max_connections == 0 {
            return Err(ConfigValidationError::EmptyConnectionPool);
        }

        Ok(())
    }

    pub fn api_key(&self) -> &str {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .unwrap_or_default()
    }

    /// Username and password for HTTP basic authentication, when either is set.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().unwrap_or_default();
        let password = self
            .password
            .as_ref()
            .map(|password| password.expose_secret())
            .unwrap_or_default();

        if username.is_empty() && password.is_empty() {
            None
        } else {
            Some((username, password))
        }
    }
}
