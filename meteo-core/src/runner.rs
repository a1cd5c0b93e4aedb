//! Sequential report across every provider.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::{
    config::RunSettings,
    provider::{ProviderId, provider_from_settings},
};

pub const FOOTER: &str = "--- Fin del reporte del tiempo ---";

/// Query every provider in order and write the full report to `out`.
///
/// Provider failures are printed as part of the report; only a failing
/// writer makes this return an error.
pub async fn run_report<W: Write>(
    settings: &RunSettings,
    now: NaiveDateTime,
    out: &mut W,
) -> Result<()> {
    let location = &settings.location;

    writeln!(out, "Tiempo actual para {} según diferentes fuentes:", location.city)
        .and_then(|()| writeln!(out, "Fecha y Hora Actual: {}", now.format("%Y-%m-%d %H:%M:%S")))
        .context("Failed to write report header")?;

    for &id in ProviderId::all() {
        let lines = provider_section(id, settings).await;
        writeln!(out).context("Failed to write report")?;
        for line in lines {
            writeln!(out, "{line}").context("Failed to write report")?;
        }
    }

    writeln!(out, "\n{FOOTER}").context("Failed to write report footer")?;
    out.flush().context("Failed to flush report")?;

    Ok(())
}

/// Lines printed for one provider: its section, or the configuration warning.
async fn provider_section(id: ProviderId, settings: &RunSettings) -> Vec<String> {
    let provider = match provider_from_settings(id, settings) {
        Ok(provider) => provider,
        Err(err) => {
            warn!(provider = %id, error = %err, "skipping provider");
            return vec![err.user_message()];
        }
    };

    let mut lines = vec![format!("--- {} ---", id.section_title())];
    lines.extend(provider.intro(&settings.location));

    match provider.report(&settings.location).await {
        Ok(report) => {
            info!(provider = %id, "provider report ready");
            lines.extend(report.lines().iter().cloned());
        }
        Err(err) => {
            warn!(provider = %id, error = %err, "provider request failed");
            lines.extend(err.user_lines(id));
        }
    }

    lines
}
