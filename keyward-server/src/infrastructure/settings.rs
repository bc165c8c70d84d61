use anyhow::{Context, Result, anyhow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub http_addr: String,
    pub log_level: String,
    pub debug: bool,
    pub public_endpoint: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let http_addr = lookup("HTTP_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let log_level = lookup("LOG_LEVEL")
            .or_else(|| lookup("RUST_LOG"))
            .unwrap_or_else(|| "info".to_string());
        let debug = match lookup("DEBUG") {
            Some(raw) => parse_bool(&raw).context("Failed to parse DEBUG, expecting boolean")?,
            None => false,
        };
        let public_endpoint = get_optional(&lookup, "PUBLIC_ENDPOINT");

        if let Some(endpoint) = &public_endpoint {
            if endpoint.chars().any(|c| c.is_control() || c == '"') {
                return Err(anyhow!(
                    "PUBLIC_ENDPOINT must not contain quotes or control characters"
                ));
            }
        }

        Ok(Self {
            http_addr,
            log_level,
            debug,
            public_endpoint,
        })
    }
}

fn get_optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("unexpected boolean value '{other}'")),
    }
}
