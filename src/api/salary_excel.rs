use actix_multipart::Multipart;
use actix_web::{
    HttpResponse,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web,
};
use tracing::{info, instrument};

use crate::{
    api::{salary::SalaryQuery, upload::read_upload},
    config::Config,
    error::AppResult,
    excel::{
        XLSX_CONTENT_TYPE,
        reconcile::{self, ImportReport},
        template::{export_salaries, salary_template},
    },
    store::{RecordStore, SalaryFilter},
};

fn attachment(filename: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename.to_string())],
        })
        .body(bytes)
}

/// Import salaries from a spreadsheet
///
/// Every data row is matched to an employee by name and upserted by
/// employee and month. Row problems are reported individually and never stop
/// the rest of the batch.
#[utoipa::path(
    post,
    path = "/api/salaries/import",
    request_body(content = Object, content_type = "multipart/form-data", description = "Spreadsheet in the `file` field"),
    responses(
        (status = 200, description = "Import finished, possibly with row errors", body = ImportReport, example = json!({
            "success": 11,
            "errors": [{ "row": 5, "message": "employee not found: 赵六" }]
        })),
        (status = 400, description = "File missing, empty or unreadable", body = Object, example = json!({
            "error": "no file uploaded"
        }))
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
#[instrument(name = "salary_import", skip_all)]
pub async fn import_salaries(
    store: web::Data<RecordStore>,
    config: web::Data<Config>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let bytes = read_upload(&mut payload, &config).await?;
    info!(bytes = bytes.len(), "Salary import started");
    let report = reconcile::import_salaries(&store, &bytes).await?;

    Ok(HttpResponse::Ok().json(report))
}

/// Download the import template
#[utoipa::path(
    get,
    path = "/api/salaries/template",
    responses(
        (status = 200, description = "Template workbook with one example row", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn download_template() -> AppResult<HttpResponse> {
    let bytes = salary_template()?;
    Ok(attachment("salary_template.xlsx", bytes))
}

/// Export salaries
///
/// Same layout as the import template, so an edited export can be uploaded
/// again.
#[utoipa::path(
    get,
    path = "/api/salaries/export",
    params(SalaryQuery),
    responses(
        (status = 200, description = "Workbook with one row per salary record", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn export(
    store: web::Data<RecordStore>,
    query: web::Query<SalaryQuery>,
) -> AppResult<HttpResponse> {
    let filter = SalaryFilter::from(query.into_inner());
    let rows = store.list_salaries(&filter).await?;
    info!(?filter, count = rows.len(), "Salary export");

    let bytes = export_salaries(&rows)?;
    Ok(attachment("salary_export.xlsx", bytes))
}
