use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// An employee as exposed over the API. The credential hash lives only in
/// [`EmployeeCredentials`] and is never serialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 2,
        "employee_id": "EMP002",
        "username": "zhangsan",
        "name": "张三",
        "department": "技术部",
        "position": "高级工程师",
        "join_date": "2020-01-15",
        "role": "employee"
    })
)]
pub struct Employee {
    #[schema(example = 2)]
    pub id: i64,

    /// Human-readable identifier, referenced by salary records.
    #[schema(example = "EMP002")]
    pub employee_id: String,

    #[schema(example = "zhangsan")]
    pub username: String,

    #[schema(example = "张三")]
    pub name: String,

    #[schema(example = "技术部")]
    pub department: String,

    #[schema(example = "高级工程师")]
    pub position: String,

    #[schema(example = "2020-01-15", value_type = String, format = "date")]
    pub join_date: NaiveDate,

    #[sqlx(try_from = "String")]
    pub role: Role,
}

#[derive(Debug, sqlx::FromRow)]
pub struct EmployeeCredentials {
    #[sqlx(flatten)]
    pub employee: Employee,
    pub password: String,
}

/// Insert payload for the store; `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub employee_id: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub department: String,
    pub position: String,
    pub join_date: NaiveDate,
    pub role: Role,
}
