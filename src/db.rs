use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::auth::password::hash_password;
use crate::model::salary::SalaryFields;

pub async fn init_db(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid DATABASE_URL: {}", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database")
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            employee_id TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            name TEXT NOT NULL,
            department TEXT NOT NULL,
            position TEXT NOT NULL,
            join_date TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'employee' CHECK (role IN ('admin', 'employee'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS salaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            employee_id TEXT NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            base_salary REAL NOT NULL,
            position_salary REAL NOT NULL DEFAULT 0,
            performance_salary REAL NOT NULL DEFAULT 0,
            work_time_type TEXT NOT NULL DEFAULT '',
            attendance_status TEXT NOT NULL DEFAULT '',
            full_time REAL NOT NULL DEFAULT 0,
            other REAL NOT NULL DEFAULT 0,
            weekday_overtime_hours REAL NOT NULL DEFAULT 0,
            weekend_overtime_hours REAL NOT NULL DEFAULT 0,
            holiday_overtime_hours REAL NOT NULL DEFAULT 0,
            overtime_pay REAL NOT NULL DEFAULT 0,
            bonus REAL NOT NULL DEFAULT 0,
            allowance REAL NOT NULL DEFAULT 0,
            deduction REAL NOT NULL DEFAULT 0,
            total_salary REAL NOT NULL,
            payment_date TEXT NOT NULL,
            remarks TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (employee_id) REFERENCES employees (employee_id)
                ON UPDATE CASCADE ON DELETE CASCADE,
            UNIQUE (employee_id, year, month)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

struct SeedEmployee {
    employee_id: &'static str,
    username: &'static str,
    password: &'static str,
    name: &'static str,
    department: &'static str,
    position: &'static str,
    join_date: &'static str,
    role: &'static str,
}

const SEED_EMPLOYEES: [SeedEmployee; 4] = [
    SeedEmployee { employee_id: "EMP001", username: "admin", password: "admin", name: "管理员", department: "管理部", position: "系统管理员", join_date: "2020-01-01", role: "admin" },
    SeedEmployee { employee_id: "EMP002", username: "zhangsan", password: "123456", name: "张三", department: "技术部", position: "高级工程师", join_date: "2020-01-15", role: "employee" },
    SeedEmployee { employee_id: "EMP003", username: "lisi", password: "123456", name: "李四", department: "市场部", position: "市场经理", join_date: "2019-05-20", role: "employee" },
    SeedEmployee { employee_id: "EMP004", username: "wangwu", password: "123456", name: "王五", department: "财务部", position: "会计", join_date: "2021-03-10", role: "employee" },
];

// (employee, month, base, position, performance, overtime pay, bonus, allowance, deduction), all 2023
const SEED_SALARIES: [(&str, u32, f64, f64, f64, f64, f64, f64, f64); 8] = [
    ("EMP001", 5, 15000.0, 8000.0, 3000.0, 0.0, 5000.0, 2000.0, 1000.0),
    ("EMP001", 6, 15000.0, 8000.0, 3000.0, 0.0, 5000.0, 2000.0, 1000.0),
    ("EMP002", 5, 8000.0, 5000.0, 2000.0, 1000.0, 2000.0, 1000.0, 500.0),
    ("EMP002", 6, 8000.0, 5000.0, 2500.0, 1500.0, 3000.0, 1000.0, 500.0),
    ("EMP003", 5, 6000.0, 4000.0, 1500.0, 800.0, 1500.0, 800.0, 400.0),
    ("EMP003", 6, 6000.0, 4000.0, 1800.0, 1000.0, 1800.0, 800.0, 400.0),
    ("EMP004", 5, 5000.0, 3000.0, 1200.0, 500.0, 1000.0, 500.0, 300.0),
    ("EMP004", 6, 5000.0, 3000.0, 1500.0, 600.0, 1200.0, 500.0, 300.0),
];

/// Inserts the demo accounts and their May/June 2023 salaries. Existing rows
/// are left untouched.
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!(existing, "Skipping demo seed, employees already present");
        return Ok(());
    }

    for emp in &SEED_EMPLOYEES {
        let hashed = hash_password(emp.password)
            .map_err(|e| anyhow::anyhow!("Failed to hash seed password: {}", e))?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO employees
            (employee_id, username, password, name, department, position, join_date, role)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(emp.employee_id)
        .bind(emp.username)
        .bind(hashed)
        .bind(emp.name)
        .bind(emp.department)
        .bind(emp.position)
        .bind(emp.join_date)
        .bind(emp.role)
        .execute(pool)
        .await?;
    }

    for (employee_id, month, base, position, performance, overtime, bonus, allowance, deduction) in
        SEED_SALARIES
    {
        let payment_date = NaiveDate::from_ymd_opt(2023, month, 10).context("Invalid seed date")?;
        let mut fields = SalaryFields::new(payment_date);
        fields.base_salary = base;
        fields.position_salary = position;
        fields.performance_salary = performance;
        fields.overtime_pay = overtime;
        fields.bonus = bonus;
        fields.allowance = allowance;
        fields.deduction = deduction;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO salaries
            (employee_id, year, month, base_salary, position_salary, performance_salary,
             overtime_pay, bonus, allowance, deduction, total_salary, payment_date)
            VALUES (?, 2023, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(month)
        .bind(fields.base_salary)
        .bind(fields.position_salary)
        .bind(fields.performance_salary)
        .bind(fields.overtime_pay)
        .bind(fields.bonus)
        .bind(fields.allowance)
        .bind(fields.deduction)
        .bind(fields.total())
        .bind(fields.payment_date)
        .execute(pool)
        .await?;
    }

    info!(
        employees = SEED_EMPLOYEES.len(),
        salaries = SEED_SALARIES.len(),
        "Demo data seeded"
    );
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Single-connection in-memory database with the schema applied.
    pub async fn memory_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();

        init_schema(&pool).await.unwrap();
        pool
    }
}
