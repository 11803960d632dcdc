use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::{debug, warn};

use crate::auth::auth::AuthUser;
use crate::auth::guard::is_allowed;
use crate::auth::jwt::verify_token;
use crate::auth::session::SessionRegistry;
use crate::config::Config;
use crate::error::AppError;

fn reject(req: ServiceRequest, err: AppError) -> ServiceResponse<BoxBody> {
    let resp = err.error_response();
    req.into_response(resp)
}

/// Authenticates the bearer token, then evaluates the route-guard table for
/// the caller's role before the request reaches any handler.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("App config missing".into()))?;
    let sessions = req
        .app_data::<Data<SessionRegistry>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("Session registry missing".into()))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_owned(),
            Err(_) => {
                return Ok(reject(
                    req,
                    AppError::Unauthorized("Invalid Authorization header encoding".into()),
                ));
            }
        },
        None => {
            return Ok(reject(
                req,
                AppError::Unauthorized("Missing Authorization header".into()),
            ));
        }
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return Ok(reject(
                req,
                AppError::Unauthorized("Authorization header must start with Bearer".into()),
            ));
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected token");
            return Ok(reject(
                req,
                AppError::Unauthorized("Invalid or expired token".into()),
            ));
        }
    };

    if sessions.is_revoked(&claims.jti) {
        return Ok(reject(req, AppError::Unauthorized("Session has ended".into())));
    }

    let path = req
        .path()
        .strip_prefix(config.api_prefix.as_str())
        .unwrap_or(req.path())
        .to_owned();

    if !is_allowed(claims.role, &path) {
        warn!(user = %claims.username, role = %claims.role, path = %path, "Route denied for role");
        return Ok(reject(
            req,
            AppError::Forbidden("Not allowed for your role".into()),
        ));
    }

    req.extensions_mut().insert(AuthUser {
        employee_id: claims.sub,
        username: claims.username,
        role: claims.role,
        jti: claims.jti,
    });

    next.call(req).await
}
