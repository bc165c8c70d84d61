use std::sync::Arc;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::domain::error::{ApiError, ErrorKind};

/// Результат обработчика, ошибка которого рендерится в JSON-конверт.
pub type AppResult<T> = Result<T, ApiError>;

/// Конверт ошибки: `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// Тело ошибки.
    pub error: ErrorBody,
}

/// Тело ошибки.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Совпадает с HTTP-статусом ответа.
    pub code: u16,
    /// Reason phrase статуса.
    pub title: String,
    /// Сообщение для клиента, без переводов строк и двойных пробелов.
    pub message: String,
    /// Payload плагина аутентификации, если он есть.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub identity: Option<Value>,
}

/// Готовый к отправке ответ с ошибкой.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedError {
    /// HTTP-статус.
    pub status: StatusCode,
    /// Строка статуса вида `"404 Not Found"`.
    pub status_line: String,
    /// JSON-конверт.
    pub body: ErrorEnvelope,
}

impl RenderedError {
    /// Сериализует конверт в байты тела ответа.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.body)
    }
}

/// Рендерит ошибку с учётом debug-режима. Чистая функция: одинаковые
/// входы дают одинаковый результат.
pub fn render(error: &ApiError, debug: bool) -> RenderedError {
    let kind = error.kind();
    let status = kind.status();
    let code = status.as_u16();

    RenderedError {
        status,
        status_line: format!("{code} {}", kind.title()),
        body: ErrorEnvelope {
            error: ErrorBody {
                code,
                title: kind.title().to_string(),
                message: error.message(debug),
                identity: error.identity().cloned(),
            },
        },
    }
}

/// Исходная ошибка, оставленная в extensions ответа для повторного рендера
/// с актуальным debug-флагом.
#[derive(Debug, Clone)]
pub(crate) struct RaisedError(pub(crate) Arc<ApiError>);

impl IntoResponse for RenderedError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = render(&self, false).into_response();
        response
            .extensions_mut()
            .insert(RaisedError(Arc::new(self)));
        response
    }
}

/// Ошибка для ответа, который собрал сам фреймворк (405, отказ экстрактора
/// и т.п.) и который поэтому пришёл без `ApiError`. Тело такого ответа
/// клиенту не передаётся.
pub(crate) fn error_for_status(status: StatusCode, method: &Method, path: &str) -> ApiError {
    match status {
        StatusCode::NOT_FOUND => ApiError::not_found(path),
        StatusCode::METHOD_NOT_ALLOWED => ApiError::method_not_allowed(method.as_str(), path),
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::new(ErrorKind::RequestTooLarge),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => {
            ApiError::validation("request headers", "Content-Type: application/json")
        }
        StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::validation("request body", "the expected fields")
        }
        StatusCode::UNAUTHORIZED => ApiError::unauthorized(),
        StatusCode::FORBIDDEN => ApiError::forbidden(),
        StatusCode::NOT_IMPLEMENTED => ApiError::new(ErrorKind::NotImplemented),
        status if status.is_server_error() => {
            ApiError::unexpected(format!("inner service responded with {status}"))
        }
        _ => ApiError::validation("request", "well-formed input"),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // текст отказа описывает внутренности парсера, он уходит только в лог
        let error = match &rejection {
            JsonRejection::JsonSyntaxError(_) => {
                ApiError::validation("request body", "well-formed JSON")
            }
            JsonRejection::JsonDataError(_) => {
                ApiError::validation("request body", "the expected fields")
            }
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::validation("request headers", "Content-Type: application/json")
            }
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                ApiError::new(ErrorKind::RequestTooLarge)
            }
            _ => ApiError::validation("request body", "a readable JSON document"),
        };
        debug!(rejection = %rejection.body_text(), "json body rejected");
        error
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::unexpected(format!("{err:#}"))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.errors().keys().map(ToString::to_string).collect();
        fields.sort();
        ApiError::validation("request body", fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::{RaisedError, error_for_status, render};
    use crate::domain::error::{ApiError, ErrorKind};
    use anyhow::{Context, anyhow};
    use axum::{
        Json,
        body::Body,
        extract::FromRequest,
        http::{Method, Request, StatusCode, header},
        response::IntoResponse,
    };
    use serde_json::{Value, json};
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct CreateProjectDto {
        #[validate(length(min = 1))]
        name: String,
        #[validate(length(max = 8))]
        domain_id: String,
    }

    #[test]
    fn body_code_is_serialized_as_integer() {
        let rendered = render(&ApiError::not_found("x"), false);
        let bytes = rendered.to_json_bytes().expect("envelope must serialize");
        let json: Value = serde_json::from_slice(&bytes).expect("valid json");
        assert_eq!(json["error"]["code"], json!(404));
        assert!(json["error"]["code"].is_u64());
        assert!(json["error"].get("identity").is_none());
    }

    #[test]
    fn status_line_and_body_agree_for_every_kind() {
        for kind in ErrorKind::ALL {
            let rendered = render(&ApiError::new(kind), false);
            assert_eq!(rendered.status, kind.status(), "{kind:?}");
            assert_eq!(rendered.body.error.code, kind.status().as_u16(), "{kind:?}");
            assert_eq!(
                rendered.status_line,
                format!("{} {}", kind.status().as_u16(), rendered.body.error.title),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn framework_statuses_map_to_matching_kinds() {
        let get = Method::GET;
        let cases = [
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::METHOD_NOT_ALLOWED, ErrorKind::MethodNotAllowed),
            (StatusCode::PAYLOAD_TOO_LARGE, ErrorKind::RequestTooLarge),
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, ErrorKind::ValidationError),
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::ValidationError),
            (StatusCode::BAD_REQUEST, ErrorKind::ValidationError),
            (StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized),
            (StatusCode::FORBIDDEN, ErrorKind::Forbidden),
            (StatusCode::NOT_IMPLEMENTED, ErrorKind::NotImplemented),
            (StatusCode::BAD_GATEWAY, ErrorKind::UnexpectedError),
            (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::UnexpectedError),
        ];
        for (status, kind) in cases {
            assert_eq!(error_for_status(status, &get, "/x").kind(), kind, "{status}");
        }
    }

    #[test]
    fn method_not_allowed_status_names_method_and_path() {
        let error = error_for_status(StatusCode::METHOD_NOT_ALLOWED, &Method::POST, "/healthz");
        let rendered = render(&error, false);
        assert_eq!(rendered.status_line, "405 Method Not Allowed");
        assert_eq!(
            rendered.body.error.message,
            "The method POST is not allowed for /healthz."
        );
    }

    #[tokio::test]
    async fn json_syntax_rejection_hides_parser_details() {
        let request = Request::builder()
            .method(Method::POST)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{1}"))
            .expect("request must build");
        let rejection = Json::<Value>::from_request(request, &())
            .await
            .expect_err("body is not json");

        let error = ApiError::from(rejection);
        assert_eq!(error.kind(), ErrorKind::ValidationError);
        let message = render(&error, true).body.error.message;
        assert!(message.contains("well-formed JSON"));
        assert!(!message.contains("line 1"));
    }

    #[tokio::test]
    async fn missing_content_type_is_a_validation_error() {
        let request = Request::builder()
            .method(Method::POST)
            .body(Body::from("{}"))
            .expect("request must build");
        let rejection = Json::<Value>::from_request(request, &())
            .await
            .expect_err("content type is missing");

        let error = ApiError::from(rejection);
        assert_eq!(error.kind(), ErrorKind::ValidationError);
        assert_eq!(error.field("target"), Some("request headers"));
    }

    #[test]
    fn status_line_joins_code_and_title() {
        let rendered = render(&ApiError::forbidden(), false);
        assert_eq!(rendered.status, StatusCode::FORBIDDEN);
        assert_eq!(rendered.status_line, "403 Forbidden");
    }

    #[test]
    fn identity_is_rendered_for_auth_plugin_kinds() {
        let error = ApiError::new(ErrorKind::AdditionalAuthRequired)
            .with_identity(json!({"methods": ["totp"]}));
        let rendered = render(&error, false);
        assert_eq!(rendered.body.error.identity, Some(json!({"methods": ["totp"]})));
    }

    #[test]
    fn anyhow_chain_becomes_debug_only_detail() {
        let err = Err::<(), _>(anyhow!("connection refused"))
            .context("loading tenant catalog")
            .expect_err("must fail");
        let error = ApiError::from(err);

        assert_eq!(error.kind(), ErrorKind::UnexpectedError);
        assert!(!render(&error, false).body.error.message.contains("connection refused"));
        assert!(
            render(&error, true)
                .body
                .error
                .message
                .contains("loading tenant catalog: connection refused")
        );
    }

    #[test]
    fn validation_errors_name_failing_fields() {
        let dto = CreateProjectDto {
            name: String::new(),
            domain_id: "much-too-long".to_string(),
        };
        let errors = dto.validate().expect_err("dto must be invalid");
        let error = ApiError::from(errors);

        assert_eq!(error.kind(), ErrorKind::ValidationError);
        assert_eq!(error.field("attribute"), Some("domain_id, name"));
        let message = render(&error, false).body.error.message;
        assert!(message.contains("domain_id, name"));
        assert!(message.contains("request body"));
    }

    #[test]
    fn into_response_keeps_raised_error_for_late_rendering() {
        let response = ApiError::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let raised = response
            .extensions()
            .get::<RaisedError>()
            .expect("raised error must be attached");
        assert_eq!(raised.0.kind(), ErrorKind::Unauthorized);
    }
}
