use crate::{
    api::{employee, me, salary, salary_excel},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond((60_000 / requests_per_min as u64).max(1))
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("limiter period and burst are non-zero");
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Malformed bodies and query strings get the same JSON error shape as
    // everything else.
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    );

    // Public: must be registered ahead of the protected scope.
    cfg.service(
        web::resource(format!("{}/auth/login", config.api_prefix))
            .wrap(login_limiter)
            .route(web::post().to(handlers::login)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication + role guard
            .wrap(protected_limiter) // rate limiting
            .route("/auth/logout", web::post().to(handlers::logout))
            .service(
                web::scope("/me")
                    .route("", web::get().to(me::profile))
                    .route("/salaries", web::get().to(me::salaries)),
            )
            .service(
                web::scope("/employees")
                    // ahead of /{id}, which would otherwise answer 405
                    .route("/import", web::post().to(employee::import_employees))
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    // /employees/{id}/salaries
                    .service(
                        web::resource("/{id}/salaries")
                            .route(web::get().to(employee::employee_salaries)),
                    ),
            )
            .service(
                web::scope("/salaries")
                    // fixed paths first so they never parse as an id
                    .route("/import", web::post().to(salary_excel::import_salaries))
                    .route("/template", web::get().to(salary_excel::download_template))
                    .route("/export", web::get().to(salary_excel::export))
                    // /salaries
                    .service(
                        web::resource("")
                            .route(web::get().to(salary::list_salaries))
                            .route(web::post().to(salary::create_salary)),
                    )
                    // /salaries/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(salary::get_salary))
                            .route(web::put().to(salary::update_salary))
                            .route(web::delete().to(salary::delete_salary)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    use crate::api::test_app;
    use crate::api::testing::{demo_store, login_request};

    #[actix_web::test]
    async fn login_validates_and_issues_tokens() {
        let app = test_app!(demo_store().await);

        let resp = test::call_service(&app, login_request("admin", "admin").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["role"], "admin");
        assert_eq!(body["token_type"], "Bearer");
        assert!(body["user"].get("password").is_none());

        let resp = test::call_service(&app, login_request("admin", "wrong").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(&app, login_request("nobody", "x").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(&app, login_request("admin", "").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn malformed_json_gets_a_json_error_body() {
        let app = test_app!(demo_store().await);

        let req = login_request("admin", "admin")
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }
}
