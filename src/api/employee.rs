use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::{
    api::{required, salary::PeriodQuery, upload::read_upload},
    auth::password::hash_password,
    config::Config,
    error::{AppError, AppResult},
    excel::{employee_import, reconcile::ImportReport},
    model::{
        employee::{Employee, NewEmployee},
        role::Role,
        salary::SalaryRecord,
    },
    store::RecordStore,
    utils::{
        db_utils::{FieldMap, SqlValue},
        username_filter,
    },
};

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP005")]
    pub employee_id: Option<String>,
    #[schema(example = "zhaoliu")]
    pub username: Option<String>,
    #[schema(example = "123456")]
    pub password: Option<String>,
    #[schema(example = "赵六")]
    pub name: Option<String>,
    #[schema(example = "技术部")]
    pub department: Option<String>,
    #[schema(example = "工程师")]
    pub position: Option<String>,
    #[schema(example = "2024-03-01", format = "date", value_type = Option<String>)]
    pub join_date: Option<NaiveDate>,
    /// Defaults to `employee`.
    pub role: Option<Role>,
}

/// Profile fields are always rewritten; credentials and role only when sent.
#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub username: Option<String>,
    /// New password in clear text; hashed before it is stored.
    pub password: Option<String>,
    #[schema(example = "赵六")]
    pub name: Option<String>,
    #[schema(example = "市场部")]
    pub department: Option<String>,
    #[schema(example = "市场专员")]
    pub position: Option<String>,
    #[schema(example = "2024-03-01", format = "date", value_type = Option<String>)]
    pub join_date: Option<NaiveDate>,
    pub role: Option<Role>,
}

fn hash(password: &str) -> AppResult<String> {
    hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal("Failed to store password".into())
    })
}

async fn ensure_username_free(
    store: &RecordStore,
    username: &str,
    excluding: Option<&str>,
) -> AppResult<()> {
    // A filter negative skips the query; the unique index catches any miss.
    if username_filter::might_exist(username) && store.username_taken(username, excluding).await? {
        return Err(AppError::Conflict(format!(
            "Username {} is already taken",
            username
        )));
    }
    Ok(())
}

async fn find_or_404(store: &RecordStore, employee_id: &str) -> AppResult<Employee> {
    store
        .find_employee_by_identifier(employee_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "All employees ordered by name", body = [Employee])
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(store: web::Data<RecordStore>) -> AppResult<HttpResponse> {
    let employees = store.list_employees().await?;
    debug!(count = employees.len(), "Employees listed");
    Ok(HttpResponse::Ok().json(employees))
}

/// Get employee
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee identifier, e.g. EMP002")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "error": "Employee EMP404 not found"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    store: web::Data<RecordStore>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let employee = find_or_404(&store, &path).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Create employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "A required field is missing", body = Object, example = json!({
            "error": "name is required"
        })),
        (status = 409, description = "Identifier or username already in use")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    store: web::Data<RecordStore>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    let payload = payload.into_inner();

    let employee_id = required(payload.employee_id, "employee_id")?.trim().to_string();
    let username = required(payload.username, "username")?.trim().to_string();
    let password = required(payload.password, "password")?;
    let name = required(payload.name, "name")?;
    let department = required(payload.department, "department")?;
    let position = required(payload.position, "position")?;
    let join_date = required(payload.join_date, "join_date")?;

    if store.find_employee_by_identifier(&employee_id).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Employee {} already exists",
            employee_id
        )));
    }
    ensure_username_free(&store, &username, None).await?;

    let employee = store
        .insert_employee(&NewEmployee {
            employee_id,
            username,
            password_hash: hash(&password)?,
            name,
            department,
            position,
            join_date,
            role: payload.role.unwrap_or(Role::Employee),
        })
        .await?;

    username_filter::insert(&employee.username);
    info!(employee_id = %employee.employee_id, "Employee created");

    Ok(HttpResponse::Created().json(employee))
}

/// Update employee
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee identifier")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "A required field is missing"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Username already in use")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    store: web::Data<RecordStore>,
    path: web::Path<String>,
    payload: web::Json<UpdateEmployee>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    let payload = payload.into_inner();

    let mut fields = FieldMap::new();
    fields.insert("name", SqlValue::Text(required(payload.name, "name")?));
    fields.insert(
        "department",
        SqlValue::Text(required(payload.department, "department")?),
    );
    fields.insert(
        "position",
        SqlValue::Text(required(payload.position, "position")?),
    );
    fields.insert(
        "join_date",
        SqlValue::Date(required(payload.join_date, "join_date")?),
    );

    let current = find_or_404(&store, &employee_id).await?;

    let new_username = payload
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty() && *u != current.username);
    if let Some(username) = &new_username {
        ensure_username_free(&store, username, Some(&employee_id)).await?;
        fields.insert("username", SqlValue::Text(username.clone()));
    }
    if let Some(password) = payload.password.filter(|p| !p.is_empty()) {
        fields.insert("password", SqlValue::Text(hash(&password)?));
    }
    if let Some(role) = payload.role {
        fields.insert("role", SqlValue::Text(role.to_string()));
    }

    if store.update_employee(&employee_id, &fields).await? == 0 {
        return Err(AppError::NotFound(format!(
            "Employee {} not found",
            employee_id
        )));
    }

    if let Some(username) = &new_username {
        username_filter::remove(&current.username);
        username_filter::insert(username);
    }
    info!(employee_id = %employee_id, columns = fields.len(), "Employee updated");

    let updated = find_or_404(&store, &employee_id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Delete employee
///
/// Removes the employee together with every salary record it owns.
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee identifier")),
    responses(
        (status = 200, description = "Employee and salary history deleted", body = Object, example = json!({
            "message": "Employee deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    store: web::Data<RecordStore>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let employee = find_or_404(&store, &path).await?;

    if !store.delete_employee_cascade(&employee.employee_id).await? {
        return Err(AppError::NotFound(format!(
            "Employee {} not found",
            employee.employee_id
        )));
    }

    username_filter::remove(&employee.username);
    info!(employee_id = %employee.employee_id, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deleted" })))
}

/// Employee salary history
#[utoipa::path(
    get,
    path = "/api/employees/{id}/salaries",
    params(("id", Path, description = "Employee identifier"), PeriodQuery),
    responses(
        (status = 200, description = "Salary records, newest first", body = [SalaryRecord]),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn employee_salaries(
    store: web::Data<RecordStore>,
    path: web::Path<String>,
    query: web::Query<PeriodQuery>,
) -> AppResult<HttpResponse> {
    let employee = find_or_404(&store, &path).await?;
    let records = store
        .list_employee_salaries(&employee.employee_id, query.year, query.month)
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Import employees from a spreadsheet
///
/// Creates one account per row. Columns are matched by their Chinese or
/// English header; blank usernames fall back to the employee identifier and
/// blank passwords to `123456`. Duplicate identifiers or usernames, whether
/// already stored or repeated within the sheet, are reported per row.
#[utoipa::path(
    post,
    path = "/api/employees/import",
    request_body(content = Object, content_type = "multipart/form-data", description = "Roster spreadsheet in the `file` field"),
    responses(
        (status = 200, description = "Import finished, possibly with row errors", body = ImportReport, example = json!({
            "success": 3,
            "errors": [{ "row": 4, "message": "username zhangsan is already taken" }]
        })),
        (status = 400, description = "File missing, empty or unreadable")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_import", skip_all)]
pub async fn import_employees(
    store: web::Data<RecordStore>,
    config: web::Data<Config>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let bytes = read_upload(&mut payload, &config).await?;
    info!(bytes = bytes.len(), "Employee import started");
    let report = employee_import::import_employees(&store, &bytes).await?;

    Ok(HttpResponse::Ok().json(report))
}
