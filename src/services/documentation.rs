//! OpenAPI description of the relay.

use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification of the rankings relay.
#[openapi(
    info(
        title = "Rankings relay",
        description = "Single-document store shared by the ranking editor and its displays"
    ),
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rankings::get_rankings,
        crate::routes::rankings::post_rankings,
        crate::routes::admin_settings::get_admin_settings,
        crate::routes::admin_settings::post_admin_settings,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::document::WriteAck,
            crate::dto::admin::AdminSettings,
            crate::dto::rankings::Entity,
            crate::dto::rankings::Mode,
            crate::dto::rankings::LayoutSettings,
            crate::dto::rankings::AnimationSettings,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rankings", description = "Latest ranking update shared by every display"),
        (name = "admin", description = "Durable editor snapshot"),
    )
)]
/// OpenAPI document of the relay routes.
pub struct ApiDoc;
