use anyhow::Result;
use tracing::warn;

use keyward_server::infrastructure::debug_mode::DebugMode;
use keyward_server::infrastructure::logging::init_logging;
use keyward_server::infrastructure::settings::Settings;
use keyward_server::presentation::AppState;
use keyward_server::server::run_http;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    init_logging(&settings)?;

    let debug = DebugMode::new(settings.debug);
    if settings.debug {
        warn!("debug mode is on, error details are exposed to clients");
    }
    let state = AppState::from_settings(&settings, debug.clone())?;

    #[cfg(unix)]
    tokio::spawn(reload::debug_on_sighup(debug));

    run_http(&settings, state).await
}

#[cfg(unix)]
mod reload {
    use tokio::signal::unix::{SignalKind, signal};
    use tracing::{info, warn};

    use keyward_server::infrastructure::debug_mode::DebugMode;
    use keyward_server::infrastructure::settings::Settings;

    /// При перезагрузке применяется только `DEBUG`, остальное требует рестарта.
    pub(crate) async fn debug_on_sighup(debug: DebugMode) {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "SIGHUP handler not installed, settings reload disabled");
                return;
            }
        };

        while hangups.recv().await.is_some() {
            dotenvy::dotenv_override().ok();
            match Settings::from_env() {
                Ok(settings) => {
                    let previous = debug.set(settings.debug);
                    if previous != settings.debug {
                        info!(debug = settings.debug, "debug mode reloaded");
                    }
                }
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "settings reload failed, keeping debug mode")
                }
            }
        }
    }
}
