use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{employee::Employee, role::Role};

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "admin")]
    pub username: Option<String>,
    #[schema(example = "admin")]
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: &'static str,
    /// Seconds until the token expires.
    #[schema(example = 28800)]
    pub expires_in: usize,
    pub user: Employee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Employee identifier, e.g. `EMP002`.
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
}
