use anyhow::{Result, anyhow};
use axum::http::HeaderValue;

use crate::infrastructure::debug_mode::DebugMode;
use crate::infrastructure::settings::Settings;

pub mod http;

#[derive(Debug, Clone)]
pub struct AppState {
    pub debug: DebugMode,
    /// `WWW-Authenticate` для ответов 401, если задан публичный endpoint.
    pub www_authenticate: Option<HeaderValue>,
}

impl AppState {
    pub fn new(debug: DebugMode, public_endpoint: Option<&str>) -> Result<Self> {
        let www_authenticate = public_endpoint
            .map(|endpoint| HeaderValue::from_str(&format!("Keyward uri=\"{endpoint}\"")))
            .transpose()
            .map_err(|err| anyhow!("invalid public endpoint: {err}"))?;

        Ok(Self {
            debug,
            www_authenticate,
        })
    }

    pub fn from_settings(settings: &Settings, debug: DebugMode) -> Result<Self> {
        Self::new(debug, settings.public_endpoint.as_deref())
    }
}
