use crate::{
    Location, Report, RunSettings,
    error::{CredentialError, ProviderError},
    provider::{aemet::AemetProvider, openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

pub mod aemet;
pub mod openweather;
pub mod weatherapi;

/// Language requested from providers that localise their descriptions.
pub const LANGUAGE: &str = "es";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    WeatherApi,
    Aemet,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
            ProviderId::Aemet => "aemet",
        }
    }

    /// Name used in console messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "OpenWeatherMap",
            ProviderId::WeatherApi => "WeatherAPI.com",
            ProviderId::Aemet => "AEMET",
        }
    }

    /// Section heading printed above the provider's report.
    pub fn section_title(&self) -> &'static str {
        match self {
            ProviderId::Aemet => "AEMET (Agencia Estatal de Meteorología)",
            other => other.display_name(),
        }
    }

    /// Environment variable holding the provider's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "TU_API_KEY_DE_OPENWEATHERMAP",
            ProviderId::WeatherApi => "TU_API_KEY_DE_WEATHERAPI",
            ProviderId::Aemet => "TU_API_KEY_DE_AEMET",
        }
    }

    /// Whether a failed response body is echoed to the console.
    pub fn shows_server_body(&self) -> bool {
        matches!(self, ProviderId::Aemet)
    }

    /// All providers, in the order they are queried.
    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::WeatherApi, ProviderId::Aemet]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            "aemet" => Ok(ProviderId::Aemet),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, weatherapi, aemet."
            )),
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Line printed before the request is made, if any.
    fn intro(&self, _location: &Location) -> Option<String> {
        None
    }

    async fn report(&self, location: &Location) -> Result<Report, ProviderError>;
}

/// Construct a provider from the run settings, refusing unusable credentials.
pub fn provider_from_settings(
    id: ProviderId,
    settings: &RunSettings,
) -> Result<Box<dyn WeatherProvider>, CredentialError> {
    let api_key = settings.credentials.get(id).key_for(id)?.to_owned();
    let base_url = settings.endpoints.base_url(id).to_owned();

    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::OpenWeather => Box::new(OpenWeatherProvider::with_base_url(api_key, base_url)),
        ProviderId::WeatherApi => Box::new(WeatherApiProvider::with_base_url(api_key, base_url)),
        ProviderId::Aemet => Box::new(AemetProvider::with_base_url(api_key, base_url)),
    };

    Ok(boxed)
}

/// Send a request and return the body of a 2xx response.
pub(crate) async fn fetch_body(request: RequestBuilder) -> Result<String, ProviderError> {
    let res = request.send().await?;

    let status = res.status();
    let mut url = res.url().clone();
    url.set_query(None);

    let body = res.text().await?;

    if !status.is_success() {
        debug!(%status, %url, body = %truncate_body(&body), "provider returned error status");
        return Err(ProviderError::Status {
            status,
            url: url.to_string(),
            body,
        });
    }

    Ok(body)
}

/// Parse a body as JSON, then as `T`.
///
/// Invalid JSON is a decode error; valid JSON that doesn't fit `T` yields `None`
/// so the caller can print a "no data" report instead of failing.
pub(crate) fn parse_shape<T: DeserializeOwned>(body: &str) -> Result<Option<T>, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            debug!(error = %err, "response JSON has unexpected shape");
            Ok(None)
        }
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
