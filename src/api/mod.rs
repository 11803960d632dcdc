use crate::error::AppError;

/// Builds an initialised test service around `store` with the full route
/// table, test config and a fresh session registry.
#[cfg(test)]
macro_rules! test_app {
    ($store:expr) => {{
        let config = $crate::config::Config::for_tests();
        let sessions = $crate::auth::session::SessionRegistry::new(config.access_token_ttl);
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($store))
                .app_data(actix_web::web::Data::new(sessions))
                .app_data(actix_web::web::Data::new(config.clone()))
                .configure(move |cfg| $crate::routes::configure(cfg, config)),
        )
        .await
    }};
}

/// Logs in through the real endpoint and yields the bearer token.
#[cfg(test)]
macro_rules! login_as {
    ($app:expr, $username:expr, $password:expr) => {{
        let body: serde_json::Value = actix_web::test::call_and_read_body_json(
            $app,
            $crate::api::testing::login_request($username, $password).to_request(),
        )
        .await;
        body["token"].as_str().expect("login returns a token").to_string()
    }};
}

#[cfg(test)]
pub(crate) use login_as;
#[cfg(test)]
pub(crate) use test_app;

pub mod employee;
pub mod me;
pub mod salary;
pub mod salary_excel;
mod upload;

/// Unwraps a mandatory request field, treating blank strings as missing.
pub(crate) fn required<T: Required>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value
        .filter(|v| !v.is_blank())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

pub(crate) trait Required {
    fn is_blank(&self) -> bool {
        false
    }
}

impl Required for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Required for f64 {}
impl Required for i32 {}
impl Required for u32 {}
impl Required for chrono::NaiveDate {}
