//! Self-service routes. Both read the identity from the session token, never
//! from the request, so an employee can only ever see their own records.

use actix_web::{HttpResponse, web};

use crate::{
    api::salary::PeriodQuery,
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{employee::Employee, salary::SalaryRecord},
    store::RecordStore,
};

/// Current profile
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "The caller's employee profile", body = Employee),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Account was deleted after login")
    ),
    tag = "Me",
    security(("bearer_auth" = []))
)]
pub async fn profile(auth: AuthUser, store: web::Data<RecordStore>) -> AppResult<HttpResponse> {
    let employee = store
        .find_employee_by_identifier(&auth.employee_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".into()))?;

    Ok(HttpResponse::Ok().json(employee))
}

/// Own salary history
#[utoipa::path(
    get,
    path = "/api/me/salaries",
    params(PeriodQuery),
    responses(
        (status = 200, description = "The caller's salary records, newest first", body = [SalaryRecord]),
        (status = 401, description = "Not authenticated")
    ),
    tag = "Me",
    security(("bearer_auth" = []))
)]
pub async fn salaries(
    auth: AuthUser,
    store: web::Data<RecordStore>,
    query: web::Query<PeriodQuery>,
) -> AppResult<HttpResponse> {
    let records = store
        .list_employee_salaries(&auth.employee_id, query.year, query.month)
        .await?;

    Ok(HttpResponse::Ok().json(records))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    use crate::api::testing::{authed, demo_store, peer};
    use crate::api::{login_as, test_app};

    #[actix_web::test]
    async fn employee_sees_only_own_records() {
        let app = test_app!(demo_store().await);
        let token = login_as!(&app, "zhangsan", "123456");

        let req = authed(test::TestRequest::get().uri("/api/me"), &token).to_request();
        let me: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(me["employee_id"], "EMP002");

        let req = authed(test::TestRequest::get().uri("/api/me/salaries"), &token).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["employee_id"] == "EMP002"));
        assert_eq!(rows[0]["month"], 6);
    }

    #[actix_web::test]
    async fn employee_is_kept_out_of_admin_routes() {
        let app = test_app!(demo_store().await);
        let token = login_as!(&app, "lisi", "123456");

        for uri in ["/api/employees", "/api/salaries", "/api/salaries/template"] {
            let req = authed(test::TestRequest::get().uri(uri), &token).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn logout_ends_the_session() {
        let app = test_app!(demo_store().await);
        let token = login_as!(&app, "wangwu", "123456");

        let req = authed(test::TestRequest::post().uri("/api/auth/logout"), &token).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = authed(test::TestRequest::get().uri("/api/me"), &token).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Session has ended");
    }

    #[actix_web::test]
    async fn requests_without_a_token_are_unauthorized() {
        let app = test_app!(demo_store().await);

        let req = test::TestRequest::get()
            .uri("/api/me")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
