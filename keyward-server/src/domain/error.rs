//! Таксономия ошибок API и политика раскрытия их деталей клиенту.

use std::collections::BTreeMap;
use std::fmt;

use http::StatusCode;
use serde_json::Value;
use strum::{EnumCount, EnumIter};
use thiserror::Error;

/// Значение, которое подставляется вместо незаполненного поля шаблона.
pub const MISSING_FIELD_VALUE: &str = "unknown";

/// Неизменяемое описание вида ошибки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDef {
    /// HTTP-статус.
    pub status: StatusCode,
    /// Короткий заголовок, совпадает с reason phrase статуса.
    pub title: &'static str,
    /// Шаблон сообщения с именованными полями вида `{target}`.
    pub template: &'static str,
    /// Свободный текст (`message`) показывается только в debug-режиме.
    pub security_sensitive: bool,
    /// Поле, значение которого дописывается к сообщению только в debug-режиме.
    pub debug_detail: Option<&'static str>,
}

impl KindDef {
    const fn public(status: StatusCode, title: &'static str, template: &'static str) -> Self {
        Self {
            status,
            title,
            template,
            security_sensitive: false,
            debug_detail: None,
        }
    }

    const fn guarded(status: StatusCode, title: &'static str, template: &'static str) -> Self {
        Self {
            status,
            title,
            template,
            security_sensitive: true,
            debug_detail: None,
        }
    }

    const fn with_debug_detail(mut self, field: &'static str) -> Self {
        self.debug_detail = Some(field);
        self
    }

    /// Имена полей шаблона в порядке появления.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.template;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                break;
            };
            names.push(&after[..end]);
            rest = &after[end + 1..];
        }
        names
    }
}

/// Закрытый реестр конкретных видов ошибок.
///
/// Базовой "абстрактной" ошибки здесь нет: корнем таксономии является сам
/// [`ApiError`], и отрендерить его можно только с конкретным видом.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum ErrorKind {
    /// Некорректный запрос: не найден ожидаемый атрибут.
    ValidationError,
    /// Строка не помещается в колонку хранилища.
    StringLengthExceeded,
    /// Атрибут запроса превышает допустимый размер.
    ValidationSizeError,
    /// Нет или неверны учётные данные.
    Unauthorized,
    /// Ошибка плагина аутентификации.
    AuthPluginError,
    /// Метод аутентификации не поддерживается.
    AuthMethodNotSupported,
    /// Требуются дополнительные шаги аутентификации.
    AdditionalAuthRequired,
    /// Аутентифицирован, но действие запрещено.
    Forbidden,
    /// Запрещено конкретное действие (`action`).
    ForbiddenAction,
    /// Ресурс не найден.
    NotFound,
    /// Endpoint каталога не найден.
    EndpointNotFound,
    /// Политика не найдена.
    PolicyNotFound,
    /// Роль не найдена.
    RoleNotFound,
    /// Сервис не найден.
    ServiceNotFound,
    /// Домен не найден.
    DomainNotFound,
    /// Проект (tenant) не найден.
    ProjectNotFound,
    /// Токен не найден.
    TokenNotFound,
    /// Пользователь не найден.
    UserNotFound,
    /// Группа не найдена.
    GroupNotFound,
    /// Trust не найден.
    TrustNotFound,
    /// Учётные данные не найдены.
    CredentialNotFound,
    /// Версия API не найдена.
    VersionNotFound,
    /// Метод не поддерживается для ресурса.
    MethodNotAllowed,
    /// Конфликт при сохранении.
    Conflict,
    /// Слишком большой запрос.
    RequestTooLarge,
    /// Непредвиденная внутренняя ошибка.
    UnexpectedError,
    /// Некорректный URL endpoint в конфигурации.
    MalformedEndpoint,
    /// Действие не реализовано.
    NotImplemented,
}

impl ErrorKind {
    /// Все конкретные виды ошибок. Длина массива проверяется по числу
    /// вариантов, поэтому новый вид без записи здесь не скомпилируется.
    pub const ALL: [ErrorKind; ErrorKind::COUNT] = [
        Self::ValidationError,
        Self::StringLengthExceeded,
        Self::ValidationSizeError,
        Self::Unauthorized,
        Self::AuthPluginError,
        Self::AuthMethodNotSupported,
        Self::AdditionalAuthRequired,
        Self::Forbidden,
        Self::ForbiddenAction,
        Self::NotFound,
        Self::EndpointNotFound,
        Self::PolicyNotFound,
        Self::RoleNotFound,
        Self::ServiceNotFound,
        Self::DomainNotFound,
        Self::ProjectNotFound,
        Self::TokenNotFound,
        Self::UserNotFound,
        Self::GroupNotFound,
        Self::TrustNotFound,
        Self::CredentialNotFound,
        Self::VersionNotFound,
        Self::MethodNotAllowed,
        Self::Conflict,
        Self::RequestTooLarge,
        Self::UnexpectedError,
        Self::MalformedEndpoint,
        Self::NotImplemented,
    ];

    /// Описание вида: статус, заголовок, шаблон и политика раскрытия.
    pub const fn def(self) -> KindDef {
        const BAD_REQUEST: &str = "Bad Request";
        const UNAUTHORIZED: &str = "Unauthorized";
        const FORBIDDEN: &str = "Forbidden";
        const INTERNAL: &str = "Internal Server Error";

        const fn not_found(template: &'static str) -> KindDef {
            KindDef::public(StatusCode::NOT_FOUND, "Not Found", template)
        }

        match self {
            Self::ValidationError => KindDef::public(
                StatusCode::BAD_REQUEST,
                BAD_REQUEST,
                "Expecting to find {attribute} in {target}. The server could not comply \
                 with the request since it is either malformed or otherwise incorrect. \
                 The client is assumed to be in error.",
            ),
            Self::StringLengthExceeded => KindDef::public(
                StatusCode::BAD_REQUEST,
                BAD_REQUEST,
                "String length exceeded. The length of string '{string}' exceeded \
                 the limit of column {type}(CHAR({length})).",
            ),
            Self::ValidationSizeError => KindDef::public(
                StatusCode::BAD_REQUEST,
                BAD_REQUEST,
                "Request attribute {attribute} must be less than or equal to {size}. \
                 The server could not comply with the request because the attribute \
                 size is invalid (too large). The client is assumed to be in error.",
            ),
            Self::Unauthorized => KindDef::guarded(
                StatusCode::UNAUTHORIZED,
                UNAUTHORIZED,
                "The request you have made requires authentication.",
            ),
            Self::AuthPluginError => KindDef::guarded(
                StatusCode::UNAUTHORIZED,
                UNAUTHORIZED,
                "Authentication plugin error.",
            ),
            Self::AuthMethodNotSupported => KindDef::guarded(
                StatusCode::UNAUTHORIZED,
                UNAUTHORIZED,
                "Attempted to authenticate with an unsupported method.",
            ),
            Self::AdditionalAuthRequired => KindDef::guarded(
                StatusCode::UNAUTHORIZED,
                UNAUTHORIZED,
                "Additional authentication steps required.",
            ),
            Self::Forbidden => KindDef::guarded(
                StatusCode::FORBIDDEN,
                FORBIDDEN,
                "You are not authorized to perform the requested action.",
            ),
            Self::ForbiddenAction => KindDef::guarded(
                StatusCode::FORBIDDEN,
                FORBIDDEN,
                "You are not authorized to perform the requested action: {action}.",
            ),
            Self::NotFound => not_found("Could not find: {target}."),
            Self::EndpointNotFound => not_found("Could not find endpoint: {endpoint_id}."),
            Self::PolicyNotFound => not_found("Could not find policy: {policy_id}."),
            Self::RoleNotFound => not_found("Could not find role: {role_id}."),
            Self::ServiceNotFound => not_found("Could not find service: {service_id}."),
            Self::DomainNotFound => not_found("Could not find domain: {domain_id}."),
            Self::ProjectNotFound => not_found("Could not find project: {project_id}."),
            Self::TokenNotFound => not_found("Could not find token: {token_id}."),
            Self::UserNotFound => not_found("Could not find user: {user_id}."),
            Self::GroupNotFound => not_found("Could not find group: {group_id}."),
            Self::TrustNotFound => not_found("Could not find trust: {trust_id}."),
            Self::CredentialNotFound => not_found("Could not find credential: {credential_id}."),
            Self::VersionNotFound => not_found("Could not find version: {version_id}."),
            Self::Conflict => KindDef::public(
                StatusCode::CONFLICT,
                "Conflict",
                "Conflict occurred attempting to store {type}. {details}",
            ),
            Self::MethodNotAllowed => KindDef::public(
                StatusCode::METHOD_NOT_ALLOWED,
                "Method Not Allowed",
                "The method {method} is not allowed for {target}.",
            ),
            Self::RequestTooLarge => KindDef::public(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request Entity Too Large",
                "Request is too large.",
            ),
            Self::UnexpectedError => KindDef::guarded(
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL,
                "An unexpected error prevented the server from fulfilling your request.",
            )
            .with_debug_detail("exception"),
            Self::MalformedEndpoint => KindDef::guarded(
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL,
                "Malformed endpoint URL (see ERROR log for details).",
            )
            .with_debug_detail("endpoint"),
            Self::NotImplemented => KindDef::public(
                StatusCode::NOT_IMPLEMENTED,
                "Not Implemented",
                "The action you have requested has not been implemented.",
            ),
        }
    }

    /// HTTP-статус вида.
    pub const fn status(self) -> StatusCode {
        self.def().status
    }

    /// Заголовок вида.
    pub const fn title(self) -> &'static str {
        self.def().title
    }

    /// Скрывается ли свободный текст вне debug-режима.
    pub const fn is_security_sensitive(self) -> bool {
        self.def().security_sensitive
    }

    /// Виды плагинов аутентификации, которые могут вернуть клиенту `identity`.
    pub const fn carries_identity(self) -> bool {
        matches!(
            self,
            Self::AuthPluginError | Self::AuthMethodNotSupported | Self::AdditionalAuthRequired
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status().as_u16(), self.title())
    }
}

/// Конкретный экземпляр ошибки API: вид, значения полей шаблона и
/// необязательное сообщение от вызывающего кода.
///
/// `Display` выводит только статус и заголовок, поэтому ошибку безопасно
/// логировать и пробрасывать через `?`.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct ApiError {
    kind: ErrorKind,
    fields: BTreeMap<&'static str, String>,
    message: Option<String>,
    identity: Option<Value>,
}

impl ApiError {
    /// Создаёт ошибку заданного вида без полей.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
            message: None,
            identity: None,
        }
    }

    /// Привязывает значение к полю шаблона.
    #[must_use]
    pub fn with_field(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.insert(name, value.into());
        self
    }

    /// Задаёт свободный текст. Для чувствительных видов он виден только в debug-режиме.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Прикладывает payload `identity` (только для видов плагинов аутентификации).
    #[must_use]
    pub fn with_identity(mut self, identity: Value) -> Self {
        self.identity = Some(identity);
        self
    }

    /// `ValidationError`: в `target` не найден `attribute`.
    pub fn validation(target: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError)
            .with_field("target", target)
            .with_field("attribute", attribute)
    }

    /// `StringLengthExceeded` для значения `string` в колонке `column_type(CHAR(length))`.
    pub fn string_length_exceeded(
        string: impl Into<String>,
        column_type: impl Into<String>,
        length: usize,
    ) -> Self {
        Self::new(ErrorKind::StringLengthExceeded)
            .with_field("string", string)
            .with_field("type", column_type)
            .with_field("length", length.to_string())
    }

    /// `ValidationSizeError`: `attribute` больше `size`.
    pub fn validation_size(attribute: impl Into<String>, size: usize) -> Self {
        Self::new(ErrorKind::ValidationSizeError)
            .with_field("attribute", attribute)
            .with_field("size", size.to_string())
    }

    /// `Unauthorized`.
    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    /// `Forbidden`.
    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    /// `ForbiddenAction`: имя действия показывается всегда.
    pub fn forbidden_action(action: impl Into<String>) -> Self {
        Self::new(ErrorKind::ForbiddenAction).with_field("action", action)
    }

    /// `NotFound` для произвольного `target`.
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound).with_field("target", target)
    }

    /// Ошибка семейства NotFound: `id` привязывается к первому полю шаблона вида.
    pub fn resource_not_found(kind: ErrorKind, id: impl Into<String>) -> Self {
        let error = Self::new(kind);
        match kind.def().placeholders().first() {
            Some(name) => error.with_field(name, id),
            None => error,
        }
    }

    /// `MethodNotAllowed`: ресурс `target` не принимает `method`.
    pub fn method_not_allowed(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed)
            .with_field("method", method)
            .with_field("target", target)
    }

    /// `Conflict` при сохранении `resource_type`.
    pub fn conflict(resource_type: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict)
            .with_field("type", resource_type)
            .with_field("details", details)
    }

    /// `UnexpectedError`; `exception` виден клиенту только в debug-режиме.
    pub fn unexpected(exception: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedError).with_field("exception", exception)
    }

    /// `MalformedEndpoint`; URL виден клиенту только в debug-режиме.
    pub fn malformed_endpoint(endpoint: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedEndpoint).with_field("endpoint", endpoint)
    }

    /// Вид ошибки.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Значение поля шаблона, если оно привязано.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Payload `identity`, если вид его допускает и он задан.
    pub fn identity(&self) -> Option<&Value> {
        self.identity
            .as_ref()
            .filter(|_| self.kind.carries_identity())
    }

    /// Сообщение для клиента с учётом политики раскрытия.
    ///
    /// Результат не содержит переводов строк и двойных пробелов.
    pub fn message(&self, debug: bool) -> String {
        let def = self.kind.def();
        let (filled, bound_any) = fill_template(def.template, &self.fields);

        let caller_text = self
            .message
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .filter(|_| debug || !def.security_sensitive);

        let mut parts: Vec<&str> = Vec::with_capacity(3);
        match caller_text {
            Some(text) if bound_any => {
                parts.push(&filled);
                parts.push(text);
            }
            Some(text) => parts.push(text),
            None => parts.push(&filled),
        }

        if debug {
            if let Some(detail) = def.debug_detail.and_then(|name| self.field(name)) {
                parts.push(detail);
            }
        }

        normalize_whitespace(&parts.join(" "))
    }
}

// один проход: подставленные значения повторно не разбираются
fn fill_template(template: &str, fields: &BTreeMap<&'static str, String>) -> (String, bool) {
    let mut out = String::with_capacity(template.len());
    let mut bound_any = false;
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };

        match fields.get(&after[..end]) {
            Some(value) => {
                out.push_str(value);
                bound_any = true;
            }
            None => out.push_str(MISSING_FIELD_VALUE),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    (out, bound_any)
}

fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::{ApiError, ErrorKind, MISSING_FIELD_VALUE, normalize_whitespace};
    use serde_json::json;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn registry_has_no_duplicates() {
        let unique: HashSet<_> = ErrorKind::ALL.iter().collect();
        assert_eq!(unique.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn registry_lists_every_variant_in_declaration_order() {
        let declared: Vec<ErrorKind> = ErrorKind::iter().collect();
        assert_eq!(declared, ErrorKind::ALL.to_vec());
    }

    #[test]
    fn method_not_allowed_names_method_and_target() {
        let error = ApiError::method_not_allowed("POST", "/healthz");
        assert_eq!(error.kind().status().as_u16(), 405);
        assert_eq!(
            error.message(false),
            "The method POST is not allowed for /healthz."
        );
    }

    #[test]
    fn every_kind_has_error_status_and_title() {
        for kind in ErrorKind::ALL {
            let def = kind.def();
            assert!(
                def.status.is_client_error() || def.status.is_server_error(),
                "{kind:?}"
            );
            assert!(!def.title.trim().is_empty(), "{kind:?}");
            assert!(!def.template.trim().is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn debug_detail_field_is_not_part_of_template() {
        for kind in ErrorKind::ALL {
            let def = kind.def();
            if let Some(detail) = def.debug_detail {
                assert!(def.security_sensitive, "{kind:?}");
                assert!(!def.placeholders().contains(&detail), "{kind:?}");
            }
        }
    }

    #[test]
    fn placeholders_are_listed_in_order() {
        assert_eq!(
            ErrorKind::ValidationError.def().placeholders(),
            vec!["attribute", "target"]
        );
        assert!(ErrorKind::Unauthorized.def().placeholders().is_empty());
    }

    #[test]
    fn missing_fields_fall_back_to_placeholder_value() {
        let message = ApiError::new(ErrorKind::NotFound).message(false);
        assert_eq!(message, format!("Could not find: {MISSING_FIELD_VALUE}."));
    }

    #[test]
    fn substituted_values_are_not_reinterpreted() {
        let message = ApiError::not_found("{action}").message(false);
        assert_eq!(message, "Could not find: {action}.");
    }

    #[test]
    fn resource_not_found_binds_kind_specific_field() {
        let error = ApiError::resource_not_found(ErrorKind::UserNotFound, "u-42");
        assert_eq!(error.field("user_id"), Some("u-42"));
        assert_eq!(error.message(false), "Could not find user: u-42.");
    }

    #[test]
    fn public_kind_keeps_fields_and_appends_caller_text() {
        let message = ApiError::not_found("project-1")
            .with_message("it was deleted")
            .message(false);
        assert_eq!(message, "Could not find: project-1. it was deleted");
    }

    #[test]
    fn caller_text_replaces_template_without_bound_fields() {
        let message = ApiError::new(ErrorKind::NotFound)
            .with_message("Overridden.")
            .message(false);
        assert_eq!(message, "Overridden.");
    }

    #[test]
    fn blank_caller_text_is_ignored() {
        let message = ApiError::unauthorized()
            .with_message(" \n ")
            .message(true);
        assert_eq!(message, "The request you have made requires authentication.");
    }

    #[test]
    fn sensitive_kind_hides_caller_text_outside_debug() {
        let error = ApiError::forbidden().with_message("policy rule admin_required");
        assert_eq!(
            error.message(false),
            "You are not authorized to perform the requested action."
        );
        assert_eq!(error.message(true), "policy rule admin_required");
    }

    #[test]
    fn forbidden_action_shows_action_and_gates_message() {
        let error = ApiError::forbidden_action("identity:delete_user").with_message("secret rule");

        let plain = error.message(false);
        assert!(plain.contains("identity:delete_user"));
        assert!(!plain.contains("secret rule"));

        let debug = error.message(true);
        assert!(debug.contains("identity:delete_user"));
        assert!(debug.contains("secret rule"));
    }

    #[test]
    fn unexpected_error_detail_is_debug_only() {
        let error = ApiError::unexpected("connection refused: db:5432");
        assert!(!error.message(false).contains("db:5432"));
        assert!(error.message(true).ends_with("connection refused: db:5432"));
    }

    #[test]
    fn identity_is_kept_only_for_auth_plugin_kinds() {
        let payload = json!({"methods": ["password", "totp"]});

        let plugin =
            ApiError::new(ErrorKind::AdditionalAuthRequired).with_identity(payload.clone());
        assert_eq!(plugin.identity(), Some(&payload));

        let plain = ApiError::unauthorized().with_identity(payload);
        assert!(plain.identity().is_none());
    }

    #[test]
    fn display_never_includes_message() {
        let error = ApiError::unauthorized().with_message("token abc expired");
        assert_eq!(error.to_string(), "401 Unauthorized");
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(normalize_whitespace("  a\n\n b\t c  "), "a b c");
    }
}
