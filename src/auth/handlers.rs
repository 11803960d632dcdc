use actix_web::{HttpResponse, web};
use tracing::{debug, error, info, instrument};

use crate::{
    auth::{
        auth::AuthUser, jwt::generate_access_token, password::verify_password,
        session::SessionRegistry,
    },
    config::Config,
    error::{AppError, AppResult},
    models::{LoginReqDto, LoginResponse},
    store::RecordStore,
};

/// Login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Session token issued", body = LoginResponse),
        (status = 400, description = "Username or password missing", body = Object, example = json!({
            "error": "Username and password are required"
        })),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(store, config, user))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<RecordStore>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    let (username, password) = match (&user.username, &user.password) {
        (Some(u), Some(p)) if !u.trim().is_empty() && !p.is_empty() => (u.trim(), p.as_str()),
        _ => {
            info!("Validation failed: empty username or password");
            return Err(AppError::BadRequest(
                "Username and password are required".into(),
            ));
        }
    };

    debug!(username, "Fetching credentials");

    let credentials = match store.find_credentials(username).await? {
        Some(c) => c,
        None => {
            info!(username, "Invalid credentials: user not found");
            return Err(AppError::Unauthorized("Invalid username or password".into()));
        }
    };

    if !verify_password(password, &credentials.password) {
        info!(username, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid username or password".into()));
    }

    let employee = credentials.employee;

    let (token, _claims) =
        generate_access_token(&employee, &config.jwt_secret, config.access_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign session token");
                AppError::Internal("Failed to issue session".into())
            },
        )?;

    info!(employee_id = %employee.employee_id, role = %employee.role, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: config.access_token_ttl,
        user: employee,
    }))
}

/// Logout
///
/// Ends the presented session. Later requests with the same token get 401.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(auth: AuthUser, sessions: web::Data<SessionRegistry>) -> HttpResponse {
    sessions.revoke(&auth.jti).await;
    info!(employee_id = %auth.employee_id, "Session revoked");

    HttpResponse::NoContent().finish()
}
