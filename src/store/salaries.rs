use sqlx::{QueryBuilder, Sqlite};

use super::RecordStore;
use crate::model::salary::{SalaryFields, SalaryKey, SalaryRecord, SalaryWithEmployee};

/// Optional filters for the administrator salary listing and export.
#[derive(Debug, Default, Clone)]
pub struct SalaryFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub department: Option<String>,
}

impl RecordStore {
    pub async fn find_salary(&self, key: &SalaryKey) -> Result<Option<SalaryRecord>, sqlx::Error> {
        sqlx::query_as::<_, SalaryRecord>(
            "SELECT * FROM salaries WHERE employee_id = ? AND year = ? AND month = ?",
        )
        .bind(&key.employee_id)
        .bind(key.year)
        .bind(key.month)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_salary_by_id(&self, id: i64) -> Result<Option<SalaryRecord>, sqlx::Error> {
        sqlx::query_as::<_, SalaryRecord>("SELECT * FROM salaries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Inserts a record; the total is computed here from `fields`.
    pub async fn insert_salary(
        &self,
        key: &SalaryKey,
        fields: &SalaryFields,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO salaries
            (employee_id, year, month, base_salary, position_salary, performance_salary,
             work_time_type, attendance_status, full_time, other,
             weekday_overtime_hours, weekend_overtime_hours, holiday_overtime_hours,
             overtime_pay, bonus, allowance, deduction, total_salary, payment_date, remarks)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&key.employee_id)
        .bind(key.year)
        .bind(key.month)
        .bind(fields.base_salary)
        .bind(fields.position_salary)
        .bind(fields.performance_salary)
        .bind(&fields.work_time_type)
        .bind(&fields.attendance_status)
        .bind(fields.full_time)
        .bind(fields.other)
        .bind(fields.weekday_overtime_hours)
        .bind(fields.weekend_overtime_hours)
        .bind(fields.holiday_overtime_hours)
        .bind(fields.overtime_pay)
        .bind(fields.bonus)
        .bind(fields.allowance)
        .bind(fields.deduction)
        .bind(fields.total())
        .bind(fields.payment_date)
        .bind(&fields.remarks)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Rewrites every mutable column of record `id` in place, recomputing the
    /// total. The record keeps its id.
    pub async fn update_salary(
        &self,
        id: i64,
        key: &SalaryKey,
        fields: &SalaryFields,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE salaries
            SET employee_id = ?, year = ?, month = ?,
                base_salary = ?, position_salary = ?, performance_salary = ?,
                work_time_type = ?, attendance_status = ?, full_time = ?, other = ?,
                weekday_overtime_hours = ?, weekend_overtime_hours = ?, holiday_overtime_hours = ?,
                overtime_pay = ?, bonus = ?, allowance = ?, deduction = ?,
                total_salary = ?, payment_date = ?, remarks = ?
            WHERE id = ?
            "#,
        )
        .bind(&key.employee_id)
        .bind(key.year)
        .bind(key.month)
        .bind(fields.base_salary)
        .bind(fields.position_salary)
        .bind(fields.performance_salary)
        .bind(&fields.work_time_type)
        .bind(&fields.attendance_status)
        .bind(fields.full_time)
        .bind(fields.other)
        .bind(fields.weekday_overtime_hours)
        .bind(fields.weekend_overtime_hours)
        .bind(fields.holiday_overtime_hours)
        .bind(fields.overtime_pay)
        .bind(fields.bonus)
        .bind(fields.allowance)
        .bind(fields.deduction)
        .bind(fields.total())
        .bind(fields.payment_date)
        .bind(&fields.remarks)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_salary(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM salaries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Salary rows joined with employee details, ordered by department then
    /// name.
    pub async fn list_salaries(
        &self,
        filter: &SalaryFilter,
    ) -> Result<Vec<SalaryWithEmployee>, sqlx::Error> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT s.*, e.name, e.department, e.position
            FROM salaries s
            JOIN employees e ON s.employee_id = e.employee_id
            WHERE 1 = 1
            "#,
        );

        if let Some(year) = filter.year {
            query.push(" AND s.year = ").push_bind(year);
        }
        if let Some(month) = filter.month {
            query.push(" AND s.month = ").push_bind(month);
        }
        if let Some(department) = &filter.department {
            query.push(" AND e.department = ").push_bind(department.clone());
        }

        query.push(" ORDER BY e.department, e.name, s.year DESC, s.month DESC");

        query
            .build_query_as::<SalaryWithEmployee>()
            .fetch_all(&self.pool)
            .await
    }

    /// One employee's pay history, newest period first.
    pub async fn list_employee_salaries(
        &self,
        employee_id: &str,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<Vec<SalaryRecord>, sqlx::Error> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM salaries WHERE employee_id = ");
        query.push_bind(employee_id.to_string());

        if let Some(year) = year {
            query.push(" AND year = ").push_bind(year);
        }
        if let Some(month) = month {
            query.push(" AND month = ").push_bind(month);
        }

        query.push(" ORDER BY year DESC, month DESC");

        query
            .build_query_as::<SalaryRecord>()
            .fetch_all(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::store_with_staff;
    use chrono::NaiveDate;

    fn key(employee_id: &str, year: i32, month: u32) -> SalaryKey {
        SalaryKey {
            employee_id: employee_id.to_string(),
            year,
            month,
        }
    }

    fn fields(base: f64) -> SalaryFields {
        let mut fields = SalaryFields::new(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        fields.base_salary = base;
        fields.deduction = 100.0;
        fields
    }

    #[actix_web::test]
    async fn one_record_per_employee_and_month() {
        let store = store_with_staff().await;

        store.insert_salary(&key("EMP002", 2024, 1), &fields(5000.0)).await.unwrap();
        let err = store
            .insert_salary(&key("EMP002", 2024, 1), &fields(6000.0))
            .await
            .unwrap_err();
        assert!(err.as_database_error().unwrap().is_unique_violation());
    }

    #[actix_web::test]
    async fn unknown_employee_is_rejected_by_foreign_key() {
        let store = store_with_staff().await;

        let err = store
            .insert_salary(&key("EMP404", 2024, 1), &fields(5000.0))
            .await
            .unwrap_err();
        assert!(err.as_database_error().is_some());
    }

    #[actix_web::test]
    async fn update_keeps_identity_and_recomputes_total() {
        let store = store_with_staff().await;
        let k = key("EMP002", 2024, 2);

        let id = store.insert_salary(&k, &fields(5000.0)).await.unwrap();
        assert_eq!(store.update_salary(id, &k, &fields(7000.0)).await.unwrap(), 1);

        let record = store.find_salary(&k).await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.base_salary, 7000.0);
        assert_eq!(record.total_salary, 6900.0);
    }

    #[actix_web::test]
    async fn cascade_removes_salary_history() {
        let store = store_with_staff().await;
        store.insert_salary(&key("EMP002", 2024, 1), &fields(5000.0)).await.unwrap();
        store.insert_salary(&key("EMP002", 2024, 2), &fields(5000.0)).await.unwrap();
        store.insert_salary(&key("EMP003", 2024, 1), &fields(4000.0)).await.unwrap();

        assert!(store.delete_employee_cascade("EMP002").await.unwrap());

        let history = store.list_employee_salaries("EMP002", None, None).await.unwrap();
        assert!(history.is_empty());
        let others = store.list_employee_salaries("EMP003", None, None).await.unwrap();
        assert_eq!(others.len(), 1);
    }

    #[actix_web::test]
    async fn listing_filters_and_orders() {
        let store = store_with_staff().await;
        store.insert_salary(&key("EMP002", 2023, 12), &fields(5000.0)).await.unwrap();
        store.insert_salary(&key("EMP002", 2024, 1), &fields(5000.0)).await.unwrap();
        store.insert_salary(&key("EMP003", 2024, 1), &fields(4000.0)).await.unwrap();

        let january = store
            .list_salaries(&SalaryFilter {
                year: Some(2024),
                month: Some(1),
                department: None,
            })
            .await
            .unwrap();
        assert_eq!(january.len(), 2);

        let history = store.list_employee_salaries("EMP002", None, None).await.unwrap();
        assert_eq!((history[0].year, history[0].month), (2024, 1));
        assert_eq!((history[1].year, history[1].month), (2023, 12));

        let none = store
            .list_salaries(&SalaryFilter {
                department: Some("市场部".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
