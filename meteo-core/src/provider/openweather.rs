use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::ProviderError,
    model::{Location, NOT_AVAILABLE, Report, Scalar, lenient, non_empty, or_na},
    provider::{LANGUAGE, ProviderId, fetch_body, parse_shape},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5";
const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Current conditions for `city,country_code`, in metric units.
    #[instrument(skip(self))]
    pub async fn fetch_current(&self, city: &str, country_code: &str) -> Result<Report, ProviderError> {
        let url = format!("{}/weather", self.base_url);
        let location = format!("{city},{country_code}");
        debug!(%url, "requesting OpenWeatherMap current weather");

        let body = fetch_body(self.http.get(&url).query(&[
            ("q", location.as_str()),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
            ("lang", LANGUAGE),
        ]))
        .await?;

        let report = parse_shape::<OwCurrentResponse>(&body)?
            .and_then(|parsed| parsed.into_report())
            .unwrap_or_else(Report::incomplete);

        Ok(report)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    #[serde(default, deserialize_with = "lenient")]
    temp: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    feels_like: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    humidity: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    pressure: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default, deserialize_with = "lenient")]
    description: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    #[serde(default, deserialize_with = "lenient")]
    speed: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default, deserialize_with = "non_empty")]
    weather: Option<Vec<OwWeather>>,
    #[serde(default, deserialize_with = "non_empty")]
    main: Option<OwMain>,
    #[serde(default, deserialize_with = "lenient")]
    wind: Option<OwWind>,
}

impl OwCurrentResponse {
    /// `None` unless both `weather` and `main` are present and non-empty.
    fn into_report(self) -> Option<Report> {
        let weather = self.weather?;
        let main = self.main?;

        let description = weather
            .first()
            .and_then(|w| w.description.as_ref())
            .map(|d| capitalize(&d.to_string()));
        let wind = self.wind.and_then(|w| w.speed).and_then(|s| s.as_f64()).map_or_else(
            || NOT_AVAILABLE.to_string(),
            |mps| format!("{:.2} m/s ({:.2} km/h)", mps, mps * MPS_TO_KMH),
        );

        let mut report = Report::new();
        report
            .line(format!("Descripción: {}", or_na(description.as_ref())))
            .line(format!("Temperatura: {}°C", or_na(main.temp.as_ref())))
            .line(format!("Sensación Térmica: {}°C", or_na(main.feels_like.as_ref())))
            .line(format!("Humedad: {}%", or_na(main.humidity.as_ref())))
            .line(format!("Viento: {wind}"))
            .line(format!("Presión: {} hPa", or_na(main.pressure.as_ref())));

        Some(report)
    }
}

/// Uppercase the first character and lowercase the rest.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    async fn report(&self, location: &Location) -> Result<Report, ProviderError> {
        self.fetch_current(&location.city, &location.country_code).await
    }
}
