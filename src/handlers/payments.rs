use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{
        ClientIdQuery, ClientIdResponse, NewPayment, PayPalMode, PaymentSuccessRequest,
        PaymentSuccessResponse, Plan,
    },
};

fn required(field: Option<String>) -> Option<String> {
    field.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[utoipa::path(
    post,
    path = "/api/auth/payment-success",
    tag = "payments",
    request_body = PaymentSuccessRequest,
    responses(
        (status = 200, description = "Plan and credits replaced", body = PaymentSuccessResponse),
        (status = 400, description = "Missing or invalid payment info"),
        (status = 402, description = "Order could not be verified with PayPal"),
        (status = 409, description = "Order already applied")
    )
)]
pub async fn payment_success(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(request): Json<PaymentSuccessRequest>,
) -> Result<Json<PaymentSuccessResponse>> {
    let missing = || AppError::Validation("Missing payment or plan info.".to_string());
    let plan_name = required(request.plan).ok_or_else(missing)?;
    let order_id = required(request.order_id).ok_or_else(missing)?;
    let payer_id = required(request.payer_id).ok_or_else(missing)?;

    let plan: Plan = plan_name.parse().map_err(AppError::Validation)?;
    if !plan.is_purchasable() {
        return Err(AppError::Validation(format!("Plan '{}' cannot be purchased.", plan)));
    }

    // Unreadable quantities count as a single photo.
    let quantity = request.qty.and_then(|qty| qty.parse()).unwrap_or(1);
    let quantity = i32::try_from(quantity)
        .ok()
        .filter(|qty| *qty >= 1)
        .ok_or_else(|| AppError::Validation("Quantity must be at least 1.".to_string()))?;
    let amount_minor = plan
        .price_minor(quantity)
        .ok_or_else(|| AppError::Validation("Quantity must be at least 1.".to_string()))?;

    let verified = match &state.order_verifier {
        Some(verifier) => {
            verifier.verify_order(&order_id, amount_minor).await?;
            true
        }
        None => {
            tracing::warn!(order_id = %order_id, "Applying PayPal order without server-side verification");
            false
        }
    };

    let user = state
        .store
        .apply_purchase(&NewPayment {
            user_id: auth.id,
            plan,
            order_id: order_id.clone(),
            payer_id,
            quantity,
            amount_minor,
            verified,
        })
        .await?;

    state.metrics.record_payment(plan.as_str());
    tracing::info!(
        user_id = %user.id,
        order_id = %order_id,
        plan = %plan,
        photo_credits = user.photo_credits,
        verified,
        "Payment applied"
    );

    Ok(Json(PaymentSuccessResponse {
        msg: "Plan and credits updated successfully.".to_string(),
        plan: user.plan,
        photo_credits: user.photo_credits,
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/paypal-client-id",
    tag = "payments",
    params(ClientIdQuery),
    responses(
        (status = 200, description = "Client id for the PayPal JS SDK", body = ClientIdResponse),
        (status = 500, description = "No client id configured for the mode")
    )
)]
pub async fn paypal_client_id(
    State(state): State<AppState>,
    Query(query): Query<ClientIdQuery>,
) -> Result<Json<ClientIdResponse>> {
    let mode = match query.mode.as_deref().map(str::trim).filter(|mode| !mode.is_empty()) {
        Some(requested) => requested
            .parse::<PayPalMode>()
            .map_err(AppError::Validation)?,
        None => state.config.paypal.default_mode,
    };

    let client_id = state
        .config
        .paypal
        .client_id(mode)
        .ok_or_else(|| AppError::PayPalNotConfigured(mode.as_str().to_string()))?;

    Ok(Json(ClientIdResponse {
        client_id: client_id.to_string(),
        mode,
        is_live: mode == PayPalMode::Live,
    }))
}

/// Acknowledges PayPal webhook deliveries. The payload is logged only;
/// credits are applied through `payment-success`.
#[utoipa::path(
    post,
    path = "/api/auth/paypal-webhook",
    tag = "payments",
    responses((status = 200, description = "Webhook received"))
)]
pub async fn paypal_webhook(Json(payload): Json<Value>) -> Json<Value> {
    tracing::info!(
        event_type = payload.get("event_type").and_then(|v| v.as_str()).unwrap_or("unknown"),
        "PayPal webhook received"
    );
    tracing::debug!(%payload, "PayPal webhook payload");

    Json(json!({ "msg": "Webhook received" }))
}
