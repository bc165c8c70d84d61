//! Таксономия ошибок identity API и их рендеринг в JSON-ответы.
//!
//! - [`domain::error`]: виды ошибок, шаблоны сообщений и политика раскрытия;
//! - [`presentation::http::app_error`]: чистый рендерер в конверт
//!   `{"error": {"code", "title", "message"}}`;
//! - [`presentation::http::middleware::render`]: граница axum, которая
//!   рендерит ошибки с текущим значением debug-флага.
//!
//! Вне debug-режима чувствительные виды (`Unauthorized`, `Forbidden`, ...)
//! никогда не показывают клиенту переданный текст.

pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod server;

pub use domain::error::{ApiError, ErrorKind, KindDef};
pub use infrastructure::debug_mode::DebugMode;
pub use presentation::http::app_error::{AppResult, ErrorBody, ErrorEnvelope, RenderedError, render};
