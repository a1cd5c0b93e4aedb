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

const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), http: Client::new() }
    }

    #[instrument(skip(self))]
    pub async fn fetch_current(&self, city: &str) -> Result<Report, ProviderError> {
        let url = format!("{}/current.json", self.base_url);
        debug!(%url, "requesting WeatherAPI current conditions");

        let body = fetch_body(self.http.get(&url).query(&[
            ("key", self.api_key.as_str()),
            ("q", city),
            ("aqi", "no"),
            ("lang", LANGUAGE),
        ]))
        .await?;

        let report = parse_shape::<WaResponse>(&body)?
            .and_then(|parsed| parsed.current)
            .map(WaCurrent::into_report)
            .unwrap_or_else(Report::incomplete);

        Ok(report)
    }
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    #[serde(default, deserialize_with = "lenient")]
    text: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    #[serde(default, deserialize_with = "lenient")]
    temp_c: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    feelslike_c: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    humidity: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    wind_kph: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    pressure_mb: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    precip_mm: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    vis_km: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    condition: Option<WaCondition>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    #[serde(default, deserialize_with = "non_empty")]
    current: Option<WaCurrent>,
}

impl WaCurrent {
    fn into_report(self) -> Report {
        let condition = self.condition.and_then(|c| c.text);
        let wind = self
            .wind_kph
            .and_then(|kph| kph.as_f64())
            .map_or_else(|| NOT_AVAILABLE.to_string(), |kph| format!("{kph:.2} km/h"));

        let mut report = Report::new();
        report
            .line(format!("Descripción: {}", or_na(condition.as_ref())))
            .line(format!("Temperatura: {}°C", or_na(self.temp_c.as_ref())))
            .line(format!("Sensación Térmica: {}°C", or_na(self.feelslike_c.as_ref())))
            .line(format!("Humedad: {}%", or_na(self.humidity.as_ref())))
            .line(format!("Viento: {wind}"))
            // millibars and hPa are the same unit
            .line(format!("Presión: {} hPa", or_na(self.pressure_mb.as_ref())))
            .line(format!("Precipitación (última hora): {} mm", or_na(self.precip_mm.as_ref())))
            .line(format!("Visibilidad: {} km", or_na(self.vis_km.as_ref())));
        report
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    async fn report(&self, location: &Location) -> Result<Report, ProviderError> {
        self.fetch_current(&location.city).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::closed_port_url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_current_formats_report() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .and(query_param("key", "wa_key"))
            .and(query_param("q", "Madrid"))
            .and(query_param("aqi", "no"))
            .and(query_param("lang", "es"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "location": {"name": "Madrid", "country": "Spain"},
                "current": {
                    "temp_c": 14.2,
                    "feelslike_c": 13,
                    "humidity": 55,
                    "wind_kph": 11.2,
                    "pressure_mb": 1019.0,
                    "precip_mm": 0.0,
                    "vis_km": 10.0,
                    "condition": {"text": "Parcialmente nublado", "code": 1003}
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = WeatherApiProvider::with_base_url("wa_key".into(), mock_server.uri());
        let report = provider.fetch_current("Madrid").await.unwrap();

        assert_eq!(
            report.lines(),
            &[
                "Descripción: Parcialmente nublado",
                "Temperatura: 14.2°C",
                "Sensación Térmica: 13°C",
                "Humedad: 55%",
                "Viento: 11.20 km/h",
                "Presión: 1019.0 hPa",
                "Precipitación (última hora): 0.0 mm",
                "Visibilidad: 10.0 km",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_current_is_incomplete() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "location": {"name": "Madrid"}
            })))
            .mount(&mock_server)
            .await;

        let provider = WeatherApiProvider::with_base_url("k".into(), mock_server.uri());
        let report = provider.fetch_current("Madrid").await.unwrap();

        assert_eq!(report, Report::incomplete());
    }

    #[tokio::test]
    async fn test_partial_current_tolerates_missing_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {"temp_c": 20}
            })))
            .mount(&mock_server)
            .await;

        let provider = WeatherApiProvider::with_base_url("k".into(), mock_server.uri());
        let report = provider.fetch_current("Madrid").await.unwrap();

        assert!(report.contains("Temperatura: 20°C"));
        assert!(report.contains("Descripción: N/A"));
        assert!(report.contains("Visibilidad: N/A km"));
    }

    #[tokio::test]
    async fn test_empty_current_object_is_incomplete() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"current": {}})),
            )
            .mount(&mock_server)
            .await;

        let provider = WeatherApiProvider::with_base_url("k".into(), mock_server.uri());
        let report = provider.fetch_current("Madrid").await.unwrap();

        assert_eq!(report, Report::incomplete());
    }

    #[tokio::test]
    async fn test_mistyped_leaf_only_blanks_its_line() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {
                    "temp_c": 18,
                    "wind_kph": [7.2],
                    "vis_km": 10,
                    "condition": {"text": "Soleado"}
                }
            })))
            .mount(&mock_server)
            .await;

        let provider = WeatherApiProvider::with_base_url("k".into(), mock_server.uri());
        let report = provider.fetch_current("Madrid").await.unwrap();

        assert!(report.contains("Descripción: Soleado"));
        assert!(report.contains("Temperatura: 18°C"));
        assert!(report.contains("Viento: N/A"));
        assert!(report.contains("Visibilidad: 10 km"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let provider = WeatherApiProvider::with_base_url("k".into(), closed_port_url());
        let err = provider.fetch_current("Madrid").await.unwrap_err();

        assert!(matches!(err, ProviderError::Transport(_)));
        let lines = err.user_lines(ProviderId::WeatherApi);
        assert!(lines[0].starts_with("Error al conectar con WeatherAPI.com"));
    }

    #[tokio::test]
    async fn test_forbidden_key_is_status_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 2008, "message": "API key has been disabled."}
            })))
            .mount(&mock_server)
            .await;

        let provider = WeatherApiProvider::with_base_url("k".into(), mock_server.uri());
        let err = provider.fetch_current("Madrid").await.unwrap_err();

        assert!(matches!(err, ProviderError::Status { .. }));
        let lines = err.user_lines(ProviderId::WeatherApi);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Error al conectar con WeatherAPI.com: 403"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"current\": "))
            .mount(&mock_server)
            .await;

        let provider = WeatherApiProvider::with_base_url("k".into(), mock_server.uri());
        let err = provider.fetch_current("Madrid").await.unwrap_err();

        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn new_targets_production_endpoint() {
        let provider = WeatherApiProvider::new("k".into());
        assert_eq!(provider.base_url, "http://api.weatherapi.com/v1");
    }
}
