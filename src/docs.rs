use crate::api::employee::{CreateEmployee, UpdateEmployee};
use crate::api::salary::SalaryInput;
use crate::excel::reconcile::{ImportReport, RowError};
use crate::model::employee::Employee;
use crate::model::role::Role;
use crate::model::salary::{SalaryRecord, SalaryWithEmployee};
use crate::models::{LoginReqDto, LoginResponse};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payroll API",
        version = "1.0.0",
        description = r#"
## Payroll Management

Employee records and monthly salary line-items for a small organisation.

### Key Features
- **Employees**: create, edit and delete staff accounts (deletes cascade to salary history)
- **Salaries**: per-month salary records with a server-computed total
- **Excel import**: bulk upsert from a spreadsheet, with per-row error reporting
- **Excel template & export**: download a blank template or the current records in the import layout
- **Self-service**: employees read their own profile and pay history under `/me`

### Security
All endpoints except login need a **Bearer** token from `/api/auth/login`.
Administrators reach every route; employees only `/me` and `/auth`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::logout,

        crate::api::me::profile,
        crate::api::me::salaries,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::employee_salaries,
        crate::api::employee::import_employees,

        crate::api::salary::list_salaries,
        crate::api::salary::get_salary,
        crate::api::salary::create_salary,
        crate::api::salary::update_salary,
        crate::api::salary::delete_salary,

        crate::api::salary_excel::import_salaries,
        crate::api::salary_excel::download_template,
        crate::api::salary_excel::export
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            Role,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            SalaryRecord,
            SalaryWithEmployee,
            SalaryInput,
            ImportReport,
            RowError
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and logout"),
        (name = "Me", description = "Self-service for the signed-in employee"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Salary", description = "Salary records, Excel import and export"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/salaries/import"));
        assert!(doc.paths.paths.contains_key("/api/employees/import"));
        assert!(doc.paths.paths.contains_key("/api/employees/{id}/salaries"));
        assert!(doc.paths.paths.contains_key("/api/me"));

        let components = doc.components.expect("components are generated");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
