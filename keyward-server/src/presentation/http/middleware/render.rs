use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::presentation::AppState;
use crate::presentation::http::app_error::{RaisedError, error_for_status, render};

/// Перерисовывает ошибки обработчиков с текущим значением debug-флага.
/// Ответы фреймворка со статусом ошибки, но без `ApiError` (405, отказ
/// экстрактора), получают конверт по статусу. Успешные ответы проходят без изменений.
pub async fn render_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let mut response = next.run(request).await;
    let raised = match response.extensions_mut().remove::<RaisedError>() {
        Some(RaisedError(raised)) => raised,
        None if response.status().is_client_error() || response.status().is_server_error() => {
            Arc::new(error_for_status(response.status(), &method, &path))
        }
        None => return response,
    };
    let allow = response.headers().get(header::ALLOW).cloned();

    let rendered = render(&raised, state.debug.is_enabled());
    if rendered.status.is_server_error() {
        error!(
            %method,
            %path,
            status = %rendered.status_line,
            detail = %raised.message(true),
            "request failed"
        );
    } else {
        debug!(
            %method,
            %path,
            status = %rendered.status_line,
            message = %rendered.body.error.message,
            "request rejected"
        );
    }

    let status = rendered.status;
    let mut response = rendered.into_response();
    if let Some(allow) = allow {
        response.headers_mut().insert(header::ALLOW, allow);
    }
    if status == StatusCode::UNAUTHORIZED {
        if let Some(value) = &state.www_authenticate {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value.clone());
        }
    }
    response
}

pub fn apply_render(router: Router, state: AppState) -> Router {
    router.layer(middleware::from_fn_with_state(state, render_errors))
}
