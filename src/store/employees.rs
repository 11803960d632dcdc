use tracing::debug;

use super::RecordStore;
use crate::model::employee::{Employee, EmployeeCredentials, NewEmployee};
use crate::utils::db_utils::{FieldMap, build_update_sql, execute_update};

const EMPLOYEE_COLUMNS: &str =
    "id, employee_id, username, name, department, position, join_date, role";

/// Columns an update may touch, in the order they are written.
pub const UPDATABLE_COLUMNS: [&str; 7] = [
    "username",
    "password",
    "name",
    "department",
    "position",
    "join_date",
    "role",
];

impl RecordStore {
    /// All employees ordered by display name.
    pub async fn list_employees(&self) -> Result<Vec<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&format!(
            "SELECT {} FROM employees ORDER BY name",
            EMPLOYEE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_employee_by_identifier(
        &self,
        employee_id: &str,
    ) -> Result<Option<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&format!(
            "SELECT {} FROM employees WHERE employee_id = ?",
            EMPLOYEE_COLUMNS
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<EmployeeCredentials>, sqlx::Error> {
        sqlx::query_as::<_, EmployeeCredentials>(&format!(
            "SELECT {}, password FROM employees WHERE username = ?",
            EMPLOYEE_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// True when another employee already uses `username`.
    pub async fn username_taken(
        &self,
        username: &str,
        excluding: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE username = ? AND employee_id IS NOT ?)",
        )
        .bind(username)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn insert_employee(&self, employee: &NewEmployee) -> Result<Employee, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees
            (employee_id, username, password, name, department, position, join_date, role)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.employee_id)
        .bind(&employee.username)
        .bind(&employee.password_hash)
        .bind(&employee.name)
        .bind(&employee.department)
        .bind(&employee.position)
        .bind(employee.join_date)
        .bind(employee.role.to_string())
        .execute(&self.pool)
        .await?;

        debug!(employee_id = %employee.employee_id, "Employee inserted");

        Ok(Employee {
            id: result.last_insert_rowid(),
            employee_id: employee.employee_id.clone(),
            username: employee.username.clone(),
            name: employee.name.clone(),
            department: employee.department.clone(),
            position: employee.position.clone(),
            join_date: employee.join_date,
            role: employee.role,
        })
    }

    /// Applies a sparse update; returns the number of rows touched (0 or 1).
    pub async fn update_employee(
        &self,
        employee_id: &str,
        fields: &FieldMap,
    ) -> Result<u64, crate::error::AppError> {
        let update = build_update_sql(
            "employees",
            &UPDATABLE_COLUMNS,
            fields,
            "employee_id",
            employee_id,
        )?;

        Ok(execute_update(&self.pool, update).await?)
    }

    /// Deletes the employee and every salary record referencing it in one
    /// transaction. Returns false when no such employee exists.
    pub async fn delete_employee_cascade(&self, employee_id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let salaries = sqlx::query("DELETE FROM salaries WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let employees = sqlx::query("DELETE FROM employees WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if employees == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        debug!(employee_id, salaries, "Employee deleted with salary records");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{memory_store, new_employee, store_with_staff};
    use crate::utils::db_utils::SqlValue;

    #[actix_web::test]
    async fn lists_by_name_without_credentials() {
        let store = store_with_staff().await;

        let names: Vec<_> = store
            .list_employees()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names.len(), 2);

        let creds = store.find_credentials("zhangsan").await.unwrap().unwrap();
        assert_eq!(creds.employee.employee_id, "EMP002");
        assert_eq!(creds.password, "not-a-real-hash");
    }

    #[actix_web::test]
    async fn duplicate_username_violates_uniqueness() {
        let store = store_with_staff().await;

        let err = store
            .insert_employee(&new_employee("EMP010", "zhangsan", "张三丰"))
            .await
            .unwrap_err();
        let db_err = err.as_database_error().unwrap();
        assert!(db_err.is_unique_violation());
    }

    #[actix_web::test]
    async fn username_taken_excludes_self() {
        let store = store_with_staff().await;

        assert!(store.username_taken("zhangsan", None).await.unwrap());
        assert!(store.username_taken("zhangsan", Some("EMP003")).await.unwrap());
        assert!(!store.username_taken("zhangsan", Some("EMP002")).await.unwrap());
        assert!(!store.username_taken("nobody", None).await.unwrap());
    }

    #[actix_web::test]
    async fn sparse_update_touches_only_given_columns() {
        let store = store_with_staff().await;

        let mut fields = FieldMap::new();
        fields.insert("position", SqlValue::Text("架构师".into()));
        let affected = store.update_employee("EMP002", &fields).await.unwrap();
        assert_eq!(affected, 1);

        let emp = store.find_employee_by_identifier("EMP002").await.unwrap().unwrap();
        assert_eq!(emp.position, "架构师");
        assert_eq!(emp.username, "zhangsan");

        let missing = store.update_employee("EMP404", &fields).await.unwrap();
        assert_eq!(missing, 0);
    }

    #[actix_web::test]
    async fn deleting_unknown_employee_reports_false() {
        let store = memory_store().await;
        assert!(!store.delete_employee_cascade("EMP404").await.unwrap());
    }
}
