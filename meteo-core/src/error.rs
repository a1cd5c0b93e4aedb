//! Error types for credential checks and provider requests.

use reqwest::StatusCode;
use thiserror::Error;

use crate::provider::ProviderId;

/// Why a provider is skipped before any request is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No API key configured for provider '{0}'")]
    Missing(ProviderId),

    #[error("API key for provider '{0}' is still the placeholder value")]
    Placeholder(ProviderId),
}

impl CredentialError {
    pub fn provider(&self) -> ProviderId {
        match self {
            Self::Missing(id) | Self::Placeholder(id) => *id,
        }
    }

    /// Warning printed in place of the provider section.
    pub fn user_message(&self) -> String {
        format!(
            "ADVERTENCIA: La API Key de {} no parece estar configurada.",
            self.provider().display_name()
        )
    }
}

/// Failure of a single provider invocation. Never fatal to the run.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("{status} for url: {url}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("forecast locator returned estado {estado}: {descripcion}")]
    Locator { estado: String, descripcion: String },

    #[error("{0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::Unexpected(err.without_url().to_string());
        }
        Self::Transport(err.without_url())
    }
}

impl ProviderError {
    /// Provider-scoped lines printed under the provider section.
    pub fn user_lines(&self, provider: ProviderId) -> Vec<String> {
        let name = provider.display_name();
        match self {
            Self::Transport(err) => vec![format!("Error al conectar con {name}: {err}")],
            Self::Status { body, .. } => {
                let mut lines = vec![format!("Error al conectar con {name}: {self}")];
                if provider.shows_server_body() && !body.trim().is_empty() {
                    lines.push(format!("Respuesta del servidor de {name}: {body}"));
                }
                lines
            }
            Self::Decode(_) => vec![format!("Error al decodificar la respuesta JSON de {name}.")],
            Self::Locator {
                estado,
                descripcion,
            } => vec![
                format!("{name}: No se pudo obtener la URL de los datos. Estado: {estado}"),
                format!("Descripción: {descripcion}"),
            ],
            Self::Unexpected(msg) => vec![format!("Error inesperado con {name}: {msg}")],
        }
    }
}
