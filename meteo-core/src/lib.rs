//! Core library for the `meteo` CLI.
//!
//! This crate defines:
//! - Configuration & credential validation
//! - Clients for OpenWeatherMap, WeatherAPI.com and AEMET
//! - The report model and the sequential report runner
//!
//! It is used by `meteo-cli`, but can also be reused by other binaries.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod runner;

pub use config::{Config, Credential, Credentials, Endpoints, ProviderConfig, RunSettings};
pub use error::{CredentialError, ProviderError};
pub use model::{Location, Report};
pub use provider::{ProviderId, WeatherProvider};
pub use runner::run_report;
