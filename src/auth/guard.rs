use crate::model::role::Role;

pub struct RouteGuard {
    pub role: Role,
    /// Path prefixes below the API prefix this role may call.
    pub prefixes: &'static [&'static str],
}

/// The one place that decides which role reaches which routes. Employees only
/// see their own profile and pay history through `/me`.
pub const ROUTE_GUARDS: &[RouteGuard] = &[
    RouteGuard {
        role: Role::Admin,
        prefixes: &["/auth", "/me", "/employees", "/salaries"],
    },
    RouteGuard {
        role: Role::Employee,
        prefixes: &["/auth", "/me"],
    },
];

/// `path` is relative to the API prefix, e.g. `/employees/EMP002`.
pub fn is_allowed(role: Role, path: &str) -> bool {
    ROUTE_GUARDS
        .iter()
        .filter(|guard| guard.role == role)
        .flat_map(|guard| guard.prefixes.iter())
        .any(|prefix| matches_prefix(path, prefix))
}

// Segment-aware: "/me" covers "/me/salaries" but not "/members".
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_reaches_management_routes() {
        assert!(is_allowed(Role::Admin, "/employees"));
        assert!(is_allowed(Role::Admin, "/employees/EMP002/salaries"));
        assert!(is_allowed(Role::Admin, "/salaries/import"));
        assert!(is_allowed(Role::Admin, "/me"));
    }

    #[test]
    fn employee_is_limited_to_own_routes() {
        assert!(is_allowed(Role::Employee, "/me"));
        assert!(is_allowed(Role::Employee, "/me/salaries"));
        assert!(is_allowed(Role::Employee, "/auth/logout"));
        assert!(!is_allowed(Role::Employee, "/employees"));
        assert!(!is_allowed(Role::Employee, "/salaries/template"));
    }

    #[test]
    fn prefixes_match_whole_segments() {
        assert!(!is_allowed(Role::Employee, "/members"));
        assert!(!is_allowed(Role::Admin, "/salaries-archive"));
    }
}
