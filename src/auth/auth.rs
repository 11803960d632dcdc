use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::{error::AppError, model::role::Role};

/// The caller's session, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Employee identifier, e.g. `EMP002`.
    pub employee_id: String,
    pub username: String,
    pub role: Role,
    pub jti: String,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthUser>().cloned();

        ready(user.ok_or_else(|| AppError::Unauthorized("Not authenticated".into()).into()))
    }
}
