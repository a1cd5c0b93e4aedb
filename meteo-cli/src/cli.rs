use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::Password;
use meteo_core::{Config, ProviderId, run_report};
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Weather report from several providers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the report from every configured provider (default).
    Report,

    /// Store the API key for a provider in the config file.
    Configure {
        /// Provider short name: "openweather", "weatherapi" or "aemet".
        provider: String,
    },

    /// Print where the config file lives.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command.unwrap_or(Command::Report) {
            Command::Report => {
                let settings = Config::load()?.into_run_settings_from_env();
                let mut stdout = std::io::stdout();
                run_report(&settings, Local::now().naive_local(), &mut stdout).await?;
            }
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                configure(id)?;
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
            }
        }

        Ok(())
    }
}

fn configure(id: ProviderId) -> anyhow::Result<()> {
    let api_key = Password::new(&format!("API key for {}:", id.display_name()))
        .without_confirmation()
        .with_help_message(&format!("{} takes precedence when set", id.env_var()))
        .prompt()
        .context("Failed to read API key")?;

    let mut config = Config::load()?;
    config.upsert_provider_api_key(id, api_key.trim().to_string());
    config.save()?;

    info!(provider = %id, "stored API key");
    println!(
        "Saved {} API key to {}",
        id.display_name(),
        Config::config_file_path()?.display()
    );

    Ok(())
}
