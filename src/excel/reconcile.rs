//! Applies an uploaded salary sheet to the store, one row at a time.
//!
//! A row either lands (inserted, or updated in place when the employee
//! already has a record for that month) or produces exactly one error entry.
//! Only an unreadable or empty upload stops the batch.

use chrono::{Datelike, Local, NaiveDate};
use derive_more::Display;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::parser::{Cell, ImportRow, parse_rows};
use super::*;
use crate::error::AppError;
use crate::model::employee::Employee;
use crate::model::salary::{SalaryFields, SalaryKey};
use crate::store::RecordStore;

static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})年(\d{1,2})月$").expect("year-month pattern is valid"));

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RowError {
    #[schema(example = 2)]
    pub row: u32,
    #[schema(example = "employee not found: 赵六")]
    pub message: String,
}

#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct ImportReport {
    #[schema(example = 12)]
    pub success: usize,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Display)]
enum RowFailure {
    #[display(fmt = "employee not found: {}", _0)]
    EmployeeNotFound(String),
    #[display(fmt = "invalid year-month \"{}\", expected YYYY年MM月", _0)]
    InvalidYearMonth(String),
    #[display(fmt = "invalid year: {}", _0)]
    InvalidYear(String),
    #[display(fmt = "invalid month: {}", _0)]
    InvalidMonth(String),
    #[display(fmt = "invalid payment date: {}", _0)]
    InvalidPaymentDate(String),
    #[display(fmt = "{}", _0)]
    Store(sqlx::Error),
}

impl From<sqlx::Error> for RowFailure {
    fn from(e: sqlx::Error) -> Self {
        RowFailure::Store(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Applied {
    Inserted,
    Updated,
}

/// Parses `bytes` and reconciles every data row against the store. Fails
/// only when the upload itself is unusable or the roster cannot be loaded.
pub async fn import_salaries(store: &RecordStore, bytes: &[u8]) -> Result<ImportReport, AppError> {
    let rows = parse_rows(bytes)?;
    let employees = store.list_employees().await?;
    let today = Local::now().date_naive();

    let report = reconcile_rows(store, &employees, &rows, today).await;

    info!(
        rows = rows.len(),
        success = report.success,
        errors = report.errors.len(),
        "Salary import finished"
    );
    Ok(report)
}

/// Processes `rows` in sheet order. `today` supplies the default period and
/// payment date for rows that leave them blank.
pub async fn reconcile_rows(
    store: &RecordStore,
    employees: &[Employee],
    rows: &[ImportRow],
    today: NaiveDate,
) -> ImportReport {
    let mut report = ImportReport::default();

    for row in rows {
        match apply_row(store, employees, row, today).await {
            Ok((applied, id)) => {
                debug!(row = row.row, id, ?applied, "Row applied");
                report.success += 1;
            }
            Err(failure) => {
                warn!(row = row.row, error = %failure, "Row rejected");
                report.errors.push(RowError {
                    row: row.row,
                    message: failure.to_string(),
                });
            }
        }
    }

    report
}

async fn apply_row(
    store: &RecordStore,
    employees: &[Employee],
    row: &ImportRow,
    today: NaiveDate,
) -> Result<(Applied, i64), RowFailure> {
    let name = row.text(COL_NAME);
    let employee = employees
        .iter()
        .find(|e| e.name == name)
        .ok_or(RowFailure::EmployeeNotFound(name))?;

    let (year, month) = resolve_period(row, today)?;
    let fields = extract_fields(row, today)?;

    let key = SalaryKey {
        employee_id: employee.employee_id.clone(),
        year,
        month,
    };

    match store.find_salary(&key).await? {
        Some(existing) => {
            store.update_salary(existing.id, &key, &fields).await?;
            Ok((Applied::Updated, existing.id))
        }
        None => Ok((Applied::Inserted, store.insert_salary(&key, &fields).await?)),
    }
}

fn resolve_period(row: &ImportRow, today: NaiveDate) -> Result<(i32, u32), RowFailure> {
    match row.cell(COL_YEAR_MONTH) {
        Cell::Empty => {}
        // Excel likes to turn "2024年01月" into a real date
        Cell::Date(d) => return Ok((d.year(), d.month())),
        other => {
            let raw = other.as_text();
            return parse_year_month(&raw).ok_or(RowFailure::InvalidYearMonth(raw));
        }
    }

    let year = match row.cell(COL_YEAR) {
        Cell::Empty => today.year(),
        cell => cell
            .as_integer()
            .and_then(|y| i32::try_from(y).ok())
            .filter(|y| (1000..=9999).contains(y))
            .ok_or_else(|| RowFailure::InvalidYear(cell.as_text()))?,
    };

    let month = match row.cell(COL_MONTH) {
        Cell::Empty => today.month(),
        cell => cell
            .as_integer()
            .and_then(|m| u32::try_from(m).ok())
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| RowFailure::InvalidMonth(cell.as_text()))?,
    };

    Ok((year, month))
}

fn parse_year_month(raw: &str) -> Option<(i32, u32)> {
    let caps = YEAR_MONTH.captures(raw.trim())?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok().filter(|m| (1..=12).contains(m))?;
    Some((year, month))
}

fn extract_fields(row: &ImportRow, today: NaiveDate) -> Result<SalaryFields, RowFailure> {
    let payment_date = match row.cell(COL_PAYMENT_DATE) {
        Cell::Empty => today,
        Cell::Date(d) => *d,
        other => {
            let raw = other.as_text();
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(&raw, "%Y/%m/%d"))
                .map_err(|_| RowFailure::InvalidPaymentDate(raw))?
        }
    };

    Ok(SalaryFields {
        base_salary: row.number(COL_BASE),
        position_salary: row.number(COL_POSITION),
        performance_salary: row.number(COL_PERFORMANCE),
        full_time: row.number(COL_FULL_TIME),
        other: row.number(COL_OTHER),
        overtime_pay: row.number(COL_OVERTIME_PAY),
        bonus: row.number(COL_BONUS),
        allowance: row.number(COL_ALLOWANCE),
        deduction: row.number(COL_DEDUCTION),
        weekday_overtime_hours: row.number(COL_WEEKDAY_HOURS),
        weekend_overtime_hours: row.number(COL_WEEKEND_HOURS),
        holiday_overtime_hours: row.number(COL_HOLIDAY_HOURS),
        work_time_type: row.text(COL_WORK_TIME_TYPE),
        attendance_status: row.text(COL_ATTENDANCE),
        payment_date,
        remarks: row.text(COL_REMARKS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::fixtures::{SheetValue::*, workbook};
    use crate::excel::template::salary_template;
    use crate::store::testing::store_with_staff;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    async fn run(store: &RecordStore, bytes: &[u8]) -> ImportReport {
        let rows = parse_rows(bytes).unwrap();
        let employees = store.list_employees().await.unwrap();
        reconcile_rows(store, &employees, &rows, today()).await
    }

    fn key(employee_id: &str, year: i32, month: u32) -> SalaryKey {
        SalaryKey {
            employee_id: employee_id.into(),
            year,
            month,
        }
    }

    fn zhang_san_january() -> Vec<u8> {
        workbook(
            &[
                COL_NAME,
                COL_YEAR_MONTH,
                COL_BASE,
                COL_POSITION,
                COL_PERFORMANCE,
                COL_FULL_TIME,
                COL_OVERTIME_PAY,
                COL_BONUS,
                COL_ALLOWANCE,
                COL_DEDUCTION,
                "实发工资",
            ],
            &[vec![
                Str("张三"),
                Str("2024年01月"),
                Num(5000.0),
                Num(2000.0),
                Num(1500.0),
                Num(200.0),
                Num(500.0),
                Num(1000.0),
                Num(300.0),
                Num(200.0),
                Num(99999.0),
            ]],
        )
    }

    #[actix_web::test]
    async fn total_is_recomputed_from_components() {
        let store = store_with_staff().await;

        let report = run(&store, &zhang_san_january()).await;
        assert_eq!(report.success, 1);
        assert!(report.errors.is_empty());

        let record = store.find_salary(&key("EMP002", 2024, 1)).await.unwrap().unwrap();
        assert_eq!(record.total_salary, 10300.0);
        assert_eq!(record.payment_date, today());
    }

    #[actix_web::test]
    async fn reimport_updates_in_place() {
        let store = store_with_staff().await;

        run(&store, &zhang_san_january()).await;
        let first = store.find_salary(&key("EMP002", 2024, 1)).await.unwrap().unwrap();

        let changed = workbook(
            &[COL_NAME, COL_YEAR_MONTH, COL_BASE, COL_REMARKS],
            &[vec![Str("张三"), Str("2024年1月"), Num(6000.0), Str("调薪")]],
        );
        let report = run(&store, &changed).await;
        assert_eq!(report.success, 1);

        let history = store.list_employee_salaries("EMP002", None, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, first.id);
        assert_eq!(history[0].total_salary, 6000.0);
        assert_eq!(history[0].remarks, "调薪");
    }

    #[actix_web::test]
    async fn unknown_employees_are_reported_per_row() {
        let store = store_with_staff().await;
        let bytes = workbook(
            &[COL_NAME, COL_YEAR_MONTH, COL_BASE],
            &[
                vec![Str("赵六"), Str("2024年01月"), Num(5000.0)],
                vec![Str("张三"), Str("2024年01月"), Num(5000.0)],
                vec![Str("钱七"), Str("2024年01月"), Num(5000.0)],
                vec![Str("李四"), Str("2024年01月"), Num(4000.0)],
            ],
        );

        let report = run(&store, &bytes).await;

        assert_eq!(report.success, 2);
        assert_eq!(
            report.errors,
            vec![
                RowError {
                    row: 2,
                    message: "employee not found: 赵六".into()
                },
                RowError {
                    row: 4,
                    message: "employee not found: 钱七".into()
                },
            ]
        );
    }

    #[actix_web::test]
    async fn malformed_period_is_a_row_error() {
        let store = store_with_staff().await;
        let bytes = workbook(
            &[COL_NAME, COL_YEAR_MONTH, COL_BASE],
            &[
                vec![Str("张三"), Str("2024-01"), Num(5000.0)],
                vec![Str("李四"), Str("2024年13月"), Num(5000.0)],
                vec![Str("李四"), Str("2024年02月"), Num(5000.0)],
            ],
        );

        let report = run(&store, &bytes).await;

        assert_eq!(report.success, 1);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].row, 2);
        assert!(report.errors[0].message.contains("2024-01"));
        assert_eq!(report.errors[1].row, 3);
    }

    #[actix_web::test]
    async fn separate_columns_default_to_current_period() {
        let store = store_with_staff().await;
        let bytes = workbook(
            &[COL_NAME, COL_YEAR, COL_MONTH, COL_BASE],
            &[
                vec![Str("张三"), Num(2023.0), Num(11.0), Num(5000.0)],
                vec![Str("李四"), Blank, Blank, Num(4000.0)],
                vec![Str("张三"), Str("明年"), Blank, Num(4000.0)],
            ],
        );

        let report = run(&store, &bytes).await;

        assert_eq!(report.success, 2);
        assert!(store.find_salary(&key("EMP002", 2023, 11)).await.unwrap().is_some());
        assert!(store.find_salary(&key("EMP003", 2024, 5)).await.unwrap().is_some());
        assert_eq!(report.errors[0].message, "invalid year: 明年");
    }

    #[actix_web::test]
    async fn non_numeric_amounts_count_as_zero() {
        let store = store_with_staff().await;
        let bytes = workbook(
            &[COL_NAME, COL_YEAR_MONTH, COL_BASE, COL_BONUS],
            &[
                vec![Str("张三"), Str("2024年01月"), Num(5000.0), Str("NaN")],
                vec![Str("李四"), Str("2024年01月"), Num(4000.0), Str("inf")],
            ],
        );

        let report = run(&store, &bytes).await;

        assert_eq!(report.success, 2);
        assert!(report.errors.is_empty());
        for (employee_id, base) in [("EMP002", 5000.0), ("EMP003", 4000.0)] {
            let record = store.find_salary(&key(employee_id, 2024, 1)).await.unwrap().unwrap();
            assert_eq!(record.bonus, 0.0);
            assert_eq!(record.total_salary, base);
        }
    }

    #[actix_web::test]
    async fn bad_payment_date_is_a_row_error() {
        let store = store_with_staff().await;
        let bytes = workbook(
            &[COL_NAME, COL_YEAR_MONTH, COL_PAYMENT_DATE],
            &[
                vec![Str("张三"), Str("2024年01月"), Str("下周")],
                vec![Str("李四"), Str("2024年01月"), Str("2024/01/31")],
            ],
        );

        let report = run(&store, &bytes).await;

        assert_eq!(report.success, 1);
        assert_eq!(report.errors[0].message, "invalid payment date: 下周");
        let record = store.find_salary(&key("EMP003", 2024, 1)).await.unwrap().unwrap();
        assert_eq!(record.payment_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[actix_web::test]
    async fn store_failures_do_not_stop_the_batch() {
        let store = store_with_staff().await;
        let employees = store.list_employees().await.unwrap();
        sqlx::query("DROP TABLE salaries")
            .execute(store.pool())
            .await
            .unwrap();

        let bytes = workbook(
            &[COL_NAME, COL_YEAR_MONTH],
            &[
                vec![Str("张三"), Str("2024年01月")],
                vec![Str("李四"), Str("2024年01月")],
            ],
        );
        let rows = parse_rows(&bytes).unwrap();
        let report = reconcile_rows(&store, &employees, &rows, today()).await;

        assert_eq!(report.success, 0);
        let lines: Vec<u32> = report.errors.iter().map(|e| e.row).collect();
        assert_eq!(lines, vec![2, 3]);
        assert!(report.errors[0].message.contains("salaries"));
    }

    #[actix_web::test]
    async fn template_round_trips_cleanly() {
        let store = store_with_staff().await;

        let report = import_salaries(&store, &salary_template().unwrap())
            .await
            .unwrap();

        assert_eq!(report.success, 1);
        assert!(report.errors.is_empty());
        let record = store.find_salary(&key("EMP002", 2024, 1)).await.unwrap().unwrap();
        assert_eq!(record.total_salary, 10400.0);
        assert_eq!(record.other, 100.0);
        assert_eq!(record.weekday_overtime_hours, 10.0);
        assert_eq!(record.holiday_overtime_hours, 4.0);
        assert_eq!(record.work_time_type, "全职");
    }

    #[actix_web::test]
    async fn unusable_upload_fails_the_whole_call() {
        let store = store_with_staff().await;

        let err = import_salaries(&store, b"").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let header_only = workbook(&[COL_NAME, COL_YEAR_MONTH], &[]);
        let err = import_salaries(&store, &header_only).await.unwrap_err();
        assert_eq!(err.to_string(), "spreadsheet contains no data rows");
    }

    #[test]
    fn year_month_pattern_is_strict() {
        assert_eq!(parse_year_month("2024年01月"), Some((2024, 1)));
        assert_eq!(parse_year_month("2024年1月"), Some((2024, 1)));
        assert_eq!(parse_year_month("24年01月"), None);
        assert_eq!(parse_year_month("2024年01月工资"), None);
        assert_eq!(parse_year_month("2024年00月"), None);
    }
}
