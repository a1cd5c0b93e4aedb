use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Placeholder printed for any field the provider left out.
pub const NOT_AVAILABLE: &str = "N/A";

/// The single place every provider is asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub city: String,
    /// ISO country code appended to the city for OpenWeatherMap.
    pub country_code: String,
    /// INE municipality code used by AEMET.
    pub municipality_code: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            city: "Madrid".to_string(),
            country_code: "ES".to_string(),
            municipality_code: "28003".to_string(),
        }
    }
}

/// A JSON leaf as the provider sent it.
///
/// Numbers keep their original rendering (`10` stays `10`, `10.5` stays `10.5`)
/// and AEMET occasionally sends numbers as strings, so both are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
}

impl Scalar {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Number(n) => n.as_i64(),
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Field deserializer that turns a mistyped value into `None`.
///
/// Use with `#[serde(default, deserialize_with = "lenient")]` so one odd leaf
/// only blanks its own line.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`], but an empty object or array also counts as absent.
pub(crate) fn non_empty<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        value => Ok(serde_json::from_value(value).ok()),
    }
}

/// Render an optional field, falling back to [`NOT_AVAILABLE`].
pub fn or_na<T: fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), ToString::to_string)
}

/// Human-readable lines produced by one provider for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Report for a response that lacked the top-level data we need.
    pub fn incomplete() -> Self {
        let mut report = Self::new();
        report.line("No se pudieron obtener datos completos.");
        report
    }

    /// Report for an AEMET payload without a usable forecast day.
    pub fn no_detailed_forecast() -> Self {
        let mut report = Self::new();
        report.line("No se encontraron datos de predicción detallados.");
        report
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
