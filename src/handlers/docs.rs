use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use crate::handlers::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::liveness,
        crate::handlers::health::readiness,
        crate::handlers::auth::signup,
        crate::handlers::auth::login,
        crate::handlers::auth::current_user,
        crate::handlers::auth::credits,
        crate::handlers::payments::payment_success,
        crate::handlers::payments::paypal_client_id,
        crate::handlers::payments::paypal_webhook,
        crate::handlers::restore::restore,
    ),
    components(
        schemas(
            crate::models::Plan,
            crate::models::PayPalMode,
            crate::models::CreateUserRequest,
            crate::models::LoginRequest,
            crate::models::UserResponse,
            crate::models::AuthResponse,
            crate::models::CreditsResponse,
            crate::models::PaymentSuccessRequest,
            crate::models::PaymentSuccessResponse,
            crate::models::ClientIdResponse,
            crate::models::RestoreUpload,
            crate::models::RestoreResponse,
        )
    ),
    tags(
        (name = "auth", description = "Accounts and tokens"),
        (name = "payments", description = "PayPal checkout and credit packages"),
        (name = "restore", description = "Credit-gated photo restoration"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "Photo Restore API",
        version = "0.1.0",
        description = "Sign up, buy photo credits and restore old photos. Authenticated routes take the JWT in the x-auth-token header."
    )
)]
pub struct ApiDoc;

pub fn create_docs_router() -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
