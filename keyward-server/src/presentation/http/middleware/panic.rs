use std::any::Any;

use axum::{
    Router,
    response::{IntoResponse, Response},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::domain::error::ApiError;

/// Паника превращается в `UnexpectedError`, текст паники виден только в debug-режиме.
pub fn apply_catch_panic(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else {
        "non-string panic payload".to_string()
    };

    ApiError::unexpected(format!("handler panicked: {detail}")).into_response()
}
