//! Bulk creation of employee accounts from an uploaded roster sheet.
//!
//! Rows are validated one by one against the accounts already stored and
//! against earlier rows of the same sheet. A rejected row lands in the
//! report; every other row is inserted.

use std::collections::HashSet;

use chrono::{Local, NaiveDate};
use derive_more::Display;
use tracing::{debug, info, warn};

use super::parser::{Cell, ImportRow, parse_rows};
use super::reconcile::{ImportReport, RowError};
use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::model::{employee::NewEmployee, role::Role};
use crate::store::RecordStore;
use crate::utils::username_filter;

const EMPLOYEE_ID: &[&str] = &["员工ID", "员工工号", "工号", "employee_id"];
const USERNAME: &[&str] = &["用户名", "登录名", "username"];
const PASSWORD: &[&str] = &["密码", "登录密码", "password"];
const NAME: &[&str] = &["姓名", "员工姓名", "name"];
const DEPARTMENT: &[&str] = &["部门", "所属部门", "department"];
const POSITION: &[&str] = &["职位", "岗位", "position"];
const JOIN_DATE: &[&str] = &["入职日期", "入职时间", "join_date"];
const ROLE: &[&str] = &["角色", "权限", "role"];

/// Password given to rows that leave the password column blank.
pub const DEFAULT_PASSWORD: &str = "123456";

#[derive(Debug, Display)]
enum RowFailure {
    #[display(fmt = "{} is required", _0)]
    Missing(&'static str),
    #[display(fmt = "employee {} already exists", _0)]
    DuplicateEmployeeId(String),
    #[display(fmt = "username {} is already taken", _0)]
    DuplicateUsername(String),
    #[display(fmt = "invalid join date: {}", _0)]
    InvalidJoinDate(String),
    #[display(fmt = "failed to hash password")]
    Hash,
    #[display(fmt = "{}", _0)]
    Store(sqlx::Error),
}

/// Identifiers and usernames already claimed, by the store or by an
/// earlier row of the sheet.
#[derive(Debug, Default)]
struct Claimed {
    employee_ids: HashSet<String>,
    usernames: HashSet<String>,
}

/// Parses `bytes` and creates one account per valid row.
pub async fn import_employees(store: &RecordStore, bytes: &[u8]) -> Result<ImportReport, AppError> {
    let rows = parse_rows(bytes)?;
    let today = Local::now().date_naive();

    let report = import_rows(store, &rows, today).await?;

    info!(
        rows = rows.len(),
        success = report.success,
        errors = report.errors.len(),
        "Employee import finished"
    );
    Ok(report)
}

/// Validates and inserts `rows` in sheet order. `today` is the join date
/// for rows that leave it blank.
pub async fn import_rows(
    store: &RecordStore,
    rows: &[ImportRow],
    today: NaiveDate,
) -> Result<ImportReport, AppError> {
    let mut claimed = Claimed::default();
    for employee in store.list_employees().await? {
        claimed.employee_ids.insert(employee.employee_id);
        claimed.usernames.insert(employee.username);
    }

    let mut report = ImportReport::default();
    for row in rows {
        let outcome = match validate(row, &claimed, today) {
            Ok(employee) => insert(store, &mut claimed, employee).await,
            Err(failure) => Err(failure),
        };

        match outcome {
            Ok(employee_id) => {
                debug!(row = row.row, %employee_id, "Employee imported");
                report.success += 1;
            }
            Err(failure) => {
                warn!(row = row.row, error = %failure, "Employee row rejected");
                report.errors.push(RowError {
                    row: row.row,
                    message: failure.to_string(),
                });
            }
        }
    }

    Ok(report)
}

fn validate(row: &ImportRow, claimed: &Claimed, today: NaiveDate) -> Result<NewEmployee, RowFailure> {
    let employee_id = row.any_of(EMPLOYEE_ID).as_text();
    if employee_id.is_empty() {
        return Err(RowFailure::Missing("employee_id"));
    }
    if claimed.employee_ids.contains(&employee_id) {
        return Err(RowFailure::DuplicateEmployeeId(employee_id));
    }

    let username = match row.any_of(USERNAME).as_text() {
        u if u.is_empty() => employee_id.clone(),
        u => u,
    };
    if claimed.usernames.contains(&username) {
        return Err(RowFailure::DuplicateUsername(username));
    }

    let password = match row.any_of(PASSWORD).as_text() {
        p if p.is_empty() => DEFAULT_PASSWORD.to_string(),
        p => p,
    };

    let name = present(row, NAME, "name")?;
    let department = present(row, DEPARTMENT, "department")?;
    let position = present(row, POSITION, "position")?;

    let join_date = match row.any_of(JOIN_DATE) {
        Cell::Empty => today,
        Cell::Date(d) => *d,
        other => {
            let raw = other.as_text();
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(&raw, "%Y/%m/%d"))
                .map_err(|_| RowFailure::InvalidJoinDate(raw))?
        }
    };

    // anything unrecognised becomes a regular employee
    let role = row
        .any_of(ROLE)
        .as_text()
        .to_lowercase()
        .parse()
        .unwrap_or(Role::Employee);

    let password_hash = hash_password(&password).map_err(|_| RowFailure::Hash)?;

    Ok(NewEmployee {
        employee_id,
        username,
        password_hash,
        name,
        department,
        position,
        join_date,
        role,
    })
}

fn present(row: &ImportRow, columns: &[&str], field: &'static str) -> Result<String, RowFailure> {
    let value = row.any_of(columns).as_text();
    if value.is_empty() {
        Err(RowFailure::Missing(field))
    } else {
        Ok(value)
    }
}

async fn insert(
    store: &RecordStore,
    claimed: &mut Claimed,
    employee: NewEmployee,
) -> Result<String, RowFailure> {
    let created = store
        .insert_employee(&employee)
        .await
        .map_err(RowFailure::Store)?;

    username_filter::insert(&created.username);
    claimed.employee_ids.insert(created.employee_id.clone());
    claimed.usernames.insert(created.username);
    Ok(created.employee_id)
}
