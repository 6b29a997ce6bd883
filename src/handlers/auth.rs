use axum::{extract::State, Json};

use crate::{
    auth::PasswordService,
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{AuthResponse, CreateUserRequest, CreditsResponse, LoginRequest, UserResponse},
};

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input or email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<AuthResponse>> {
    let name = request.name.trim();
    let email = request.email.trim();
    PasswordService::validate_signup(name, email, &request.password)?;

    if state.store.find_by_email(email).await?.is_some() {
        return Err(AppError::UserExists);
    }

    let password_hash = PasswordService::hash_password_blocking(request.password).await?;

    // A concurrent signup can still win the race; the store reports it as
    // UserExists through the unique index.
    let user = state.store.create_user(name, email, &password_hash).await?;
    tracing::info!(user_id = %user.id, "New user registered");

    let token = state.jwt.generate_token(user.id)?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = state
        .store
        .find_by_email(request.email.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !PasswordService::verify_password_blocking(request.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.jwt.generate_token(user.id)?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found")
    )
)]
pub async fn current_user(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<UserResponse>> {
    let user = state
        .store
        .find_by_id(auth.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/api/auth/user/credits",
    tag = "auth",
    responses(
        (status = 200, description = "Remaining credits and plan", body = CreditsResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found")
    )
)]
pub async fn credits(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<CreditsResponse>> {
    let user = state
        .store
        .find_by_id(auth.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(CreditsResponse {
        photo_credits: user.photo_credits,
        plan: user.plan,
    }))
}
