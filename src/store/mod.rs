//! Relational storage of employees and their monthly salary records.
//!
//! The store owns the two invariants the rest of the crate relies on: one
//! salary record per (employee, year, month), and no salary row outliving its
//! employee.

mod employees;
mod salaries;

pub use salaries::SalaryFilter;

use sqlx::SqlitePool;

#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
pub mod testing {
    use super::RecordStore;
    use crate::model::{employee::NewEmployee, role::Role};
    use chrono::NaiveDate;

    pub async fn memory_store() -> RecordStore {
        RecordStore::new(crate::db::testing::memory_pool().await)
    }

    pub fn new_employee(employee_id: &str, username: &str, name: &str) -> NewEmployee {
        NewEmployee {
            employee_id: employee_id.to_string(),
            username: username.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            name: name.to_string(),
            department: "技术部".to_string(),
            position: "工程师".to_string(),
            join_date: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
            role: Role::Employee,
        }
    }

    /// Store holding 张三 (EMP002) and 李四 (EMP003).
    pub async fn store_with_staff() -> RecordStore {
        let store = memory_store().await;
        store
            .insert_employee(&new_employee("EMP002", "zhangsan", "张三"))
            .await
            .unwrap();
        store
            .insert_employee(&new_employee("EMP003", "lisi", "李四"))
            .await
            .unwrap();
        store
    }
}
