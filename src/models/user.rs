use std::fmt;

use serde::{Deserialize, Serialize};

/// Account families. Each one lives in its own table with a shared core layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Department,
    Office,
}

impl Role {
    /// Lookup order when the caller does not name a role.
    pub const SEARCH_ORDER: [Role; 3] = [Role::Department, Role::Office, Role::Admin];

    pub fn table(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Department => "department_users",
            Role::Office => "office_users",
        }
    }

    pub fn supports_lock(&self) -> bool {
        matches!(self, Role::Department)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Department => "Department user",
            Role::Office => "Office user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Department => "department",
            Role::Office => "office",
        })
    }
}

/// A credential-store row. Columns a role's table lacks come back as `None`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    pub dept_id: Option<String>,
    pub hod: Option<String>,
    pub degree_level: Option<String>,
    pub academic_year: Option<String>,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub locked: Option<bool>,
}

impl User {
    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

/// Profile columns shared by create and update. Columns the target role's
/// table does not have are ignored.
#[derive(Debug, Clone, Default)]
pub struct UserFields {
    pub username: String,
    pub email: String,
    pub name: String,
    pub mobile: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub dept_id: Option<String>,
    pub hod: Option<String>,
    pub degree_level: Option<String>,
    pub academic_year: Option<String>,
}

impl UserFields {
    /// Editable columns of each role's table, in bind order.
    pub fn columns(role: Role) -> &'static [&'static str] {
        match role {
            Role::Admin => &["username", "email", "name", "mobile", "role", "academic_year"],
            Role::Department => &[
                "username",
                "email",
                "name",
                "mobile",
                "department",
                "dept_id",
                "hod",
                "degree_level",
                "academic_year",
            ],
            Role::Office => &["username", "email", "name", "mobile", "department", "academic_year"],
        }
    }

    pub fn column(&self, name: &str) -> Option<&str> {
        match name {
            "username" => Some(&self.username),
            "email" => Some(&self.email),
            "name" => Some(&self.name),
            "mobile" => Some(&self.mobile),
            "role" => self.role.as_deref(),
            "department" => self.department.as_deref(),
            "dept_id" => self.dept_id.as_deref(),
            "hod" => self.hod.as_deref(),
            "degree_level" => self.degree_level.as_deref(),
            "academic_year" => self.academic_year.as_deref(),
            _ => None,
        }
    }

    /// Copy the columns `role` owns onto an existing row.
    pub fn apply_to(&self, role: Role, user: &mut User) {
        let has = |c: &str| Self::columns(role).iter().any(|col| *col == c);
        user.username = self.username.clone();
        user.email = self.email.clone();
        user.name = Some(self.name.clone());
        user.mobile = Some(self.mobile.clone());
        user.academic_year = self.academic_year.clone();
        if has("role") {
            user.role = self.role.clone();
        }
        if has("department") {
            user.department = self.department.clone();
        }
        if has("dept_id") {
            user.dept_id = self.dept_id.clone();
            user.hod = self.hod.clone();
            user.degree_level = self.degree_level.clone();
        }
    }
}

/// A new account; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub fields: UserFields,
    pub password_hash: String,
}

/// Replacement values for an existing account. The stored hash stays
/// untouched when `password_hash` is `None`.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub fields: UserFields,
    pub password_hash: Option<String>,
}

/// Outbound view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dept_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hod: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree_level: Option<String>,
    pub academic_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl UserResponse {
    pub fn from_user(user: User, account: Role) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            mobile: user.mobile,
            role: user.role.unwrap_or_else(|| account.to_string()),
            department: user.department,
            dept_id: user.dept_id,
            hod: user.hod,
            degree_level: user.degree_level,
            academic_year: user.academic_year,
            locked: user.locked,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_row() -> User {
        User {
            id: 7,
            username: "old".into(),
            email: "old@example.com".into(),
            name: None,
            mobile: None,
            role: None,
            department: None,
            dept_id: None,
            hod: None,
            degree_level: None,
            academic_year: None,
            password_hash: "$2b$04$hash".into(),
            locked: Some(true),
        }
    }

    fn fields() -> UserFields {
        UserFields {
            username: "hod".into(),
            email: "hod@example.com".into(),
            name: "Head".into(),
            mobile: "900".into(),
            role: Some("Nodal Officer".into()),
            department: Some("Physics".into()),
            dept_id: Some("D01".into()),
            hod: Some("Dr. Rao".into()),
            degree_level: Some("UG".into()),
            academic_year: Some("2024-25".into()),
        }
    }

    #[test]
    fn apply_only_touches_columns_the_role_owns() {
        let mut office = blank_row();
        fields().apply_to(Role::Office, &mut office);
        assert_eq!(office.department.as_deref(), Some("Physics"));
        assert!(office.role.is_none());
        assert!(office.dept_id.is_none());

        let mut dept = blank_row();
        fields().apply_to(Role::Department, &mut dept);
        assert_eq!(dept.degree_level.as_deref(), Some("UG"));
        assert!(dept.is_locked());
    }

    #[test]
    fn column_lookup_follows_bind_order() {
        let f = fields();
        let bound: Vec<Option<&str>> = UserFields::columns(Role::Admin)
            .iter()
            .map(|c| f.column(c))
            .collect();
        assert_eq!(bound[0], Some("hod"));
        assert_eq!(bound[4], Some("Nodal Officer"));
        assert_eq!(f.column("password"), None);
    }

    #[test]
    fn response_never_serializes_the_hash() {
        let body = serde_json::to_value(UserResponse::from_user(blank_row(), Role::Department)).unwrap();
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());
        assert_eq!(body["role"], "department");
        assert_eq!(body["locked"], true);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut user = blank_row();
        assert_eq!(user.display_name(), "old");
        user.name = Some("Someone".into());
        assert_eq!(user.display_name(), "Someone");
    }
}
