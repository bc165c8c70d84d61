use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::infrastructure::settings::Settings;

const CRATE_TARGET: &str = "keyward_server";

/// `RUST_LOG` важнее `settings.log_level`. В debug-режиме в строках лога
/// есть файл и номер строки, а отклонённые запросы (4xx) логируются на
/// уровне `debug`, так что фильтр для своего крейта поднимается до него.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(settings)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(settings.debug)
        .with_line_number(settings.debug)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

fn directives(settings: &Settings) -> String {
    let level = settings.log_level.trim();
    if !settings.debug || level.contains(CRATE_TARGET) {
        return level.to_string();
    }
    format!("{level},{CRATE_TARGET}=debug")
}
