//! AEMET OpenData municipal daily forecast.
//!
//! AEMET answers the first request with a small envelope whose `datos` field
//! points at the real payload, so every forecast costs two requests.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header::ACCEPT};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::ProviderError,
    model::{Location, Report, Scalar, lenient, or_na},
    provider::{ProviderId, fetch_body, parse_shape},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://opendata.aemet.es/opendata/api";
const API_KEY_HEADER: &str = "api_key";
const ESTADO_OK: i64 = 200;

#[derive(Debug, Clone)]
pub struct AemetProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl AemetProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), http: Client::new() }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
    }

    /// Forecast for the first day AEMET returns for `municipality_code`.
    #[instrument(skip(self))]
    pub async fn fetch_daily_forecast(&self, municipality_code: &str) -> Result<Report, ProviderError> {
        let data_url = self.locate_forecast(municipality_code).await?;
        debug!(url = %data_url, "following AEMET data locator");

        let body = fetch_body(self.get(&data_url)).await?;

        let report = parse_shape::<Vec<AemetForecast>>(&body)?
            .and_then(|forecasts| forecasts.into_iter().next())
            .and_then(|forecast| forecast.prediccion)
            .and_then(|prediccion| prediccion.dia)
            .and_then(|days| days.into_iter().next())
            .map(AemetDay::into_report)
            .unwrap_or_else(Report::no_detailed_forecast);

        Ok(report)
    }

    /// First step: ask for the URL holding the forecast payload.
    async fn locate_forecast(&self, municipality_code: &str) -> Result<String, ProviderError> {
        let url =
            format!("{}/prediccion/especifica/municipio/diaria/{municipality_code}", self.base_url);
        debug!(%url, "requesting AEMET forecast locator");

        let body = fetch_body(self.get(&url)).await?;
        let envelope = parse_shape::<LocatorEnvelope>(&body)?.unwrap_or_default();

        let ok = envelope.estado.as_ref().and_then(Scalar::as_i64) == Some(ESTADO_OK);
        match envelope.datos {
            Some(datos) if ok && !datos.is_empty() => Ok(datos),
            _ => {
                warn!(estado = ?envelope.estado, "AEMET did not return a data URL");
                Err(ProviderError::Locator {
                    estado: or_na(envelope.estado.as_ref()),
                    descripcion: or_na(envelope.descripcion.as_ref()),
                })
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LocatorEnvelope {
    #[serde(default, deserialize_with = "lenient")]
    descripcion: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    estado: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    datos: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AemetForecast {
    #[serde(default, deserialize_with = "lenient")]
    prediccion: Option<Prediccion>,
}

#[derive(Debug, Deserialize)]
struct Prediccion {
    #[serde(default, deserialize_with = "lenient")]
    dia: Option<Vec<AemetDay>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AemetDay {
    #[serde(default, deserialize_with = "lenient")]
    fecha: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    estado_cielo: Option<Vec<SkyState>>,
    #[serde(default, deserialize_with = "lenient")]
    prob_precipitacion: Option<Vec<PeriodValue>>,
    #[serde(default, deserialize_with = "lenient")]
    viento: Option<Vec<Wind>>,
    #[serde(default, deserialize_with = "lenient")]
    temperatura: Option<Range>,
    #[serde(default, deserialize_with = "lenient")]
    sens_termica: Option<Range>,
    #[serde(default, deserialize_with = "lenient")]
    humedad_relativa: Option<Range>,
}

#[derive(Debug, Deserialize)]
struct SkyState {
    #[serde(default, deserialize_with = "lenient")]
    periodo: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    descripcion: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct PeriodValue {
    #[serde(default, deserialize_with = "lenient")]
    periodo: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    value: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    #[serde(default, deserialize_with = "lenient")]
    periodo: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    direccion: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    velocidad: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
struct Range {
    #[serde(default, deserialize_with = "lenient")]
    maxima: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient")]
    minima: Option<Scalar>,
}

impl AemetDay {
    fn into_report(self) -> Report {
        let mut report = Report::new();
        report.line(format!("Fecha de predicción: {}", or_na(self.fecha.as_ref())));

        report.line("Estado del cielo:");
        for sky in self.estado_cielo.unwrap_or_default() {
            report.line(format!(
                "  - Periodo {}: {}",
                or_na(sky.periodo.as_ref()),
                or_na(sky.descripcion.as_ref())
            ));
        }

        report.line("Precipitación:");
        for prob in self.prob_precipitacion.unwrap_or_default() {
            report.line(format!(
                "  - Periodo {}: {}%",
                or_na(prob.periodo.as_ref()),
                or_na(prob.value.as_ref())
            ));
        }

        report.line("Viento:");
        for wind in self.viento.unwrap_or_default() {
            report.line(format!(
                "  - Periodo {}: {} a {} km/h",
                or_na(wind.periodo.as_ref()),
                or_na(wind.direccion.as_ref()),
                or_na(wind.velocidad.as_ref())
            ));
        }

        let temperatura = self.temperatura.unwrap_or_default();
        report
            .line(format!("Temperatura Máxima: {}°C", or_na(temperatura.maxima.as_ref())))
            .line(format!("Temperatura Mínima: {}°C", or_na(temperatura.minima.as_ref())));

        // feels-like lines only appear when AEMET provides them
        let sens = self.sens_termica.unwrap_or_default();
        if let Some(max) = sens.maxima {
            report.line(format!("Sensación Térmica Máxima: {max}°C"));
        }
        if let Some(min) = sens.minima {
            report.line(format!("Sensación Térmica Mínima: {min}°C"));
        }

        let humedad = self.humedad_relativa.unwrap_or_default();
        report
            .line(format!("Humedad Relativa Máxima: {}%", or_na(humedad.maxima.as_ref())))
            .line(format!("Humedad Relativa Mínima: {}%", or_na(humedad.minima.as_ref())));

        report
    }
}

#[async_trait]
impl WeatherProvider for AemetProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Aemet
    }

    fn intro(&self, location: &Location) -> Option<String> {
        Some(format!(
            "Intentando obtener predicción para el municipio: {}",
            location.municipality_code
        ))
    }

    async fn report(&self, location: &Location) -> Result<Report, ProviderError> {
        self.fetch_daily_forecast(&location.municipality_code).await
    }
}
