use utoipa::openapi::{ContentBuilder, RefOr, ResponseBuilder};
use utoipa::{Modify, OpenApi};

use crate::presentation::http::app_error::{ErrorBody, ErrorEnvelope};
use crate::presentation::http::handlers::HealthzResponse;

#[derive(OpenApi)]
#[openapi(
    paths(crate::presentation::http::handlers::health_handler),
    components(schemas(ErrorEnvelope, ErrorBody, HealthzResponse)),
    tags(
        (name = "service", description = "Service endpoints")
    ),
    modifiers(&ErrorResponseAddon)
)]
pub struct ApiDoc;

/// Общий ответ `Error`, который возвращает любой endpoint при ошибке.
pub struct ErrorResponseAddon;

impl Modify for ErrorResponseAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.take().unwrap_or_default();
        components.responses.insert(
            "Error".to_string(),
            RefOr::T(
                ResponseBuilder::new()
                    .description("JSON error envelope")
                    .content(
                        "application/json",
                        ContentBuilder::new()
                            .schema(Some(RefOr::Ref(utoipa::openapi::Ref::from_schema_name(
                                "ErrorEnvelope",
                            ))))
                            .build(),
                    )
                    .build(),
            ),
        );
        openapi.components = Some(components);
    }
}
