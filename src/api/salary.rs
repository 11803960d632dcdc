use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::required,
    error::{AppError, AppResult},
    model::salary::{SalaryFields, SalaryKey, SalaryRecord, SalaryWithEmployee},
    store::{RecordStore, SalaryFilter},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalaryQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub department: Option<String>,
}

impl From<SalaryQuery> for SalaryFilter {
    fn from(q: SalaryQuery) -> Self {
        SalaryFilter {
            year: q.year,
            month: q.month,
            department: q.department.filter(|d| !d.trim().is_empty()),
        }
    }
}

/// Salary line-item as submitted by the admin form. Any `total_salary` in the
/// body is ignored; the total is always recomputed.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SalaryInput {
    #[schema(example = "EMP002")]
    pub employee_id: Option<String>,
    #[schema(example = 2024)]
    pub year: Option<i32>,
    #[schema(example = 1)]
    pub month: Option<u32>,
    #[schema(example = 5000.0)]
    pub base_salary: Option<f64>,
    pub position_salary: Option<f64>,
    pub performance_salary: Option<f64>,
    pub work_time_type: Option<String>,
    pub attendance_status: Option<String>,
    pub full_time: Option<f64>,
    pub other: Option<f64>,
    pub weekday_overtime_hours: Option<f64>,
    pub weekend_overtime_hours: Option<f64>,
    pub holiday_overtime_hours: Option<f64>,
    pub overtime_pay: Option<f64>,
    pub bonus: Option<f64>,
    pub allowance: Option<f64>,
    pub deduction: Option<f64>,
    #[schema(example = "2024-01-31", format = "date", value_type = Option<String>)]
    pub payment_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

impl SalaryInput {
    fn into_parts(self) -> AppResult<(SalaryKey, SalaryFields)> {
        let employee_id = required(self.employee_id, "employee_id")?.trim().to_string();
        let year = required(self.year, "year")?;
        let month = required(self.month, "month")?;
        if !(1..=12).contains(&month) {
            return Err(AppError::BadRequest(format!("invalid month: {}", month)));
        }

        let mut fields = SalaryFields::new(required(self.payment_date, "payment_date")?);
        fields.base_salary = required(self.base_salary, "base_salary")?;
        fields.position_salary = self.position_salary.unwrap_or_default();
        fields.performance_salary = self.performance_salary.unwrap_or_default();
        fields.full_time = self.full_time.unwrap_or_default();
        fields.other = self.other.unwrap_or_default();
        fields.overtime_pay = self.overtime_pay.unwrap_or_default();
        fields.bonus = self.bonus.unwrap_or_default();
        fields.allowance = self.allowance.unwrap_or_default();
        fields.deduction = self.deduction.unwrap_or_default();
        fields.weekday_overtime_hours = self.weekday_overtime_hours.unwrap_or_default();
        fields.weekend_overtime_hours = self.weekend_overtime_hours.unwrap_or_default();
        fields.holiday_overtime_hours = self.holiday_overtime_hours.unwrap_or_default();
        fields.work_time_type = self.work_time_type.unwrap_or_default();
        fields.attendance_status = self.attendance_status.unwrap_or_default();
        fields.remarks = self.remarks.unwrap_or_default();

        Ok((
            SalaryKey {
                employee_id,
                year,
                month,
            },
            fields,
        ))
    }
}

async fn ensure_employee_exists(store: &RecordStore, employee_id: &str) -> AppResult<()> {
    match store.find_employee_by_identifier(employee_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest(format!(
            "Employee {} does not exist",
            employee_id
        ))),
    }
}

fn period_conflict(key: &SalaryKey) -> AppError {
    AppError::Conflict(format!(
        "Salary record for {} {}-{:02} already exists",
        key.employee_id, key.year, key.month
    ))
}

async fn find_or_404(store: &RecordStore, id: i64) -> AppResult<SalaryRecord> {
    store
        .find_salary_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Salary record {} not found", id)))
}

/// List salaries
#[utoipa::path(
    get,
    path = "/api/salaries",
    params(SalaryQuery),
    responses(
        (status = 200, description = "Salary records with employee details", body = [SalaryWithEmployee])
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn list_salaries(
    store: web::Data<RecordStore>,
    query: web::Query<SalaryQuery>,
) -> AppResult<HttpResponse> {
    let filter = SalaryFilter::from(query.into_inner());
    let rows = store.list_salaries(&filter).await?;
    debug!(?filter, count = rows.len(), "Salaries listed");
    Ok(HttpResponse::Ok().json(rows))
}

/// Get salary record
#[utoipa::path(
    get,
    path = "/api/salaries/{id}",
    params(("id", Path, description = "Salary record id")),
    responses(
        (status = 200, description = "Salary record", body = SalaryRecord),
        (status = 404, description = "Salary record not found")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn get_salary(
    store: web::Data<RecordStore>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let record = find_or_404(&store, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Create salary record
#[utoipa::path(
    post,
    path = "/api/salaries",
    request_body = SalaryInput,
    responses(
        (status = 201, description = "Salary record created", body = SalaryRecord),
        (status = 400, description = "Missing field or unknown employee", body = Object, example = json!({
            "error": "base_salary is required"
        })),
        (status = 409, description = "Employee already has a record for that month")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn create_salary(
    store: web::Data<RecordStore>,
    payload: web::Json<SalaryInput>,
) -> AppResult<HttpResponse> {
    let (key, fields) = payload.into_inner().into_parts()?;

    ensure_employee_exists(&store, &key.employee_id).await?;
    if store.find_salary(&key).await?.is_some() {
        return Err(period_conflict(&key));
    }

    let id = store.insert_salary(&key, &fields).await?;
    info!(id, employee_id = %key.employee_id, year = key.year, month = key.month, "Salary created");

    let record = find_or_404(&store, id).await?;
    Ok(HttpResponse::Created().json(record))
}

/// Update salary record
///
/// Replaces every field of the record; the total is recomputed.
#[utoipa::path(
    put,
    path = "/api/salaries/{id}",
    params(("id", Path, description = "Salary record id")),
    request_body = SalaryInput,
    responses(
        (status = 200, description = "Salary record updated", body = SalaryRecord),
        (status = 400, description = "Missing field or unknown employee"),
        (status = 404, description = "Salary record not found"),
        (status = 409, description = "Another record already covers that month")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn update_salary(
    store: web::Data<RecordStore>,
    path: web::Path<i64>,
    payload: web::Json<SalaryInput>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let (key, fields) = payload.into_inner().into_parts()?;

    find_or_404(&store, id).await?;
    ensure_employee_exists(&store, &key.employee_id).await?;
    if let Some(other) = store.find_salary(&key).await? {
        if other.id != id {
            return Err(period_conflict(&key));
        }
    }

    store.update_salary(id, &key, &fields).await?;
    info!(id, employee_id = %key.employee_id, "Salary updated");

    let record = find_or_404(&store, id).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Delete salary record
#[utoipa::path(
    delete,
    path = "/api/salaries/{id}",
    params(("id", Path, description = "Salary record id")),
    responses(
        (status = 200, description = "Salary record deleted", body = Object, example = json!({
            "message": "Salary record deleted"
        })),
        (status = 404, description = "Salary record not found")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn delete_salary(
    store: web::Data<RecordStore>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    if store.delete_salary(id).await? == 0 {
        return Err(AppError::NotFound(format!("Salary record {} not found", id)));
    }
    info!(id, "Salary deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Salary record deleted" })))
}
