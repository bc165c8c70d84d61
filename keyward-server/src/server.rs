use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::infrastructure::settings::Settings;
use crate::presentation::AppState;
use crate::presentation::http::handlers;
use crate::presentation::http::middleware::panic::apply_catch_panic;
use crate::presentation::http::middleware::render::apply_render;
use crate::presentation::http::middleware::trace::apply_trace;

pub async fn run_http(settings: &Settings, state: AppState) -> anyhow::Result<()> {
    let app = build_router(handlers::routes(), state);

    let listener = TcpListener::bind(&settings.http_addr).await?;

    info!("HTTP server listening on {}", settings.http_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Оборачивает `routes` границей ошибок. Рендер стоит снаружи перехвата паник,
/// чтобы паники тоже рендерились с текущим debug-флагом.
pub fn build_router(routes: Router, state: AppState) -> Router {
    let app = apply_catch_panic(routes);
    let app = apply_render(app, state);
    apply_trace(app)
}
