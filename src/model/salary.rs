use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// (employee, year, month) identifies at most one salary record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SalaryKey {
    pub employee_id: String,
    pub year: i32,
    pub month: u32,
}

/// Every mutable part of a salary line-item. The total is derived from these
/// and is never accepted from a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryFields {
    pub base_salary: f64,
    pub position_salary: f64,
    pub performance_salary: f64,
    pub full_time: f64,
    pub other: f64,
    pub overtime_pay: f64,
    pub bonus: f64,
    pub allowance: f64,
    pub deduction: f64,

    pub weekday_overtime_hours: f64,
    pub weekend_overtime_hours: f64,
    pub holiday_overtime_hours: f64,

    pub work_time_type: String,
    pub attendance_status: String,
    pub payment_date: NaiveDate,
    pub remarks: String,
}

impl SalaryFields {
    /// Zeroed components paid on `payment_date`.
    pub fn new(payment_date: NaiveDate) -> Self {
        Self {
            base_salary: 0.0,
            position_salary: 0.0,
            performance_salary: 0.0,
            full_time: 0.0,
            other: 0.0,
            overtime_pay: 0.0,
            bonus: 0.0,
            allowance: 0.0,
            deduction: 0.0,
            weekday_overtime_hours: 0.0,
            weekend_overtime_hours: 0.0,
            holiday_overtime_hours: 0.0,
            work_time_type: String::new(),
            attendance_status: String::new(),
            payment_date,
            remarks: String::new(),
        }
    }

    pub fn total(&self) -> f64 {
        self.base_salary
            + self.position_salary
            + self.performance_salary
            + self.full_time
            + self.other
            + self.overtime_pay
            + self.bonus
            + self.allowance
            - self.deduction
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SalaryRecord {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "EMP002")]
    pub employee_id: String,
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = 5000.0)]
    pub base_salary: f64,
    pub position_salary: f64,
    pub performance_salary: f64,
    pub work_time_type: String,
    pub attendance_status: String,
    pub full_time: f64,
    pub other: f64,
    pub weekday_overtime_hours: f64,
    pub weekend_overtime_hours: f64,
    pub holiday_overtime_hours: f64,
    pub overtime_pay: f64,
    pub bonus: f64,
    pub allowance: f64,
    pub deduction: f64,

    #[schema(example = 10300.0)]
    pub total_salary: f64,

    #[schema(example = "2024-01-31", value_type = String, format = "date")]
    pub payment_date: NaiveDate,
    pub remarks: String,
}

/// Salary row joined with the owning employee, as listed for administrators.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct SalaryWithEmployee {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: SalaryRecord,
    pub name: String,
    pub department: String,
    pub position: String,
}
