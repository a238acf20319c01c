use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::settings::MaintenanceStatus;
use crate::models::user::{UserFields, UserResponse};

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields including password are required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields including password are required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields including password are required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields including password are required"))]
    pub mobile: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields including password are required"))]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, alias = "dept_id")]
    pub dept_id: Option<String>,
    #[serde(default)]
    pub hod: Option<String>,
    #[serde(default, alias = "degree_level")]
    pub degree_level: Option<String>,
    #[serde(default, alias = "academic_year")]
    pub academic_year: Option<String>,
}

impl CreateUserRequest {
    pub fn fields(&self) -> UserFields {
        UserFields {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            name: self.name.trim().to_string(),
            mobile: self.mobile.trim().to_string(),
            role: non_blank(self.role.clone()),
            department: non_blank(self.department.clone()),
            dept_id: non_blank(self.dept_id.clone()),
            hod: non_blank(self.hod.clone()),
            degree_level: non_blank(self.degree_level.clone()),
            academic_year: non_blank(self.academic_year.clone()),
        }
    }
}

/// Same shape as creation; a blank password keeps the current one.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields except password are required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields except password are required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields except password are required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields except password are required"))]
    pub mobile: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, alias = "dept_id")]
    pub dept_id: Option<String>,
    #[serde(default)]
    pub hod: Option<String>,
    #[serde(default, alias = "degree_level")]
    pub degree_level: Option<String>,
    #[serde(default, alias = "academic_year")]
    pub academic_year: Option<String>,
}

impl UpdateUserRequest {
    pub fn fields(&self) -> UserFields {
        UserFields {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            name: self.name.trim().to_string(),
            mobile: self.mobile.trim().to_string(),
            role: non_blank(self.role.clone()),
            department: non_blank(self.department.clone()),
            dept_id: non_blank(self.dept_id.clone()),
            hod: non_blank(self.hod.clone()),
            degree_level: non_blank(self.degree_level.clone()),
            academic_year: non_blank(self.academic_year.clone()),
        }
    }

    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub locked: bool,
}

#[derive(Debug, Deserialize)]
pub struct AcademicYearRequest {
    #[serde(default, rename = "newAcademicYear", alias = "new_academic_year")]
    pub new_academic_year: String,
}

/// `enabled` wins over the legacy `maintenance` key.
#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub maintenance: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MaintenanceRequest {
    pub fn enabled(&self) -> bool {
        self.enabled.or(self.maintenance).unwrap_or(false)
    }

    pub fn message(&self) -> String {
        self.message.clone().unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct MaintenanceResponse {
    pub success: bool,
    pub maintenance: MaintenanceStatus,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintenance_request_prefers_enabled() {
        let req: MaintenanceRequest = serde_json::from_str(r#"{"maintenance":true}"#).unwrap();
        assert!(req.enabled());
        assert_eq!(req.message(), "");

        let req: MaintenanceRequest =
            serde_json::from_str(r#"{"enabled":false,"maintenance":true,"message":"x"}"#).unwrap();
        assert!(!req.enabled());
        assert_eq!(req.message(), "x");

        let req: MaintenanceRequest = serde_json::from_str("{}").unwrap();
        assert!(!req.enabled());
    }

    #[test]
    fn create_request_normalizes_fields() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username":" hod ","email":"HOD@Example.com","name":"H","mobile":"1",
                "password":"pw","deptId":"D01","degree_level":"UG","hod":"  "}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        let fields = req.fields();
        assert_eq!(fields.username, "hod");
        assert_eq!(fields.email, "hod@example.com");
        assert_eq!(fields.dept_id.as_deref(), Some("D01"));
        assert_eq!(fields.degree_level.as_deref(), Some("UG"));
        assert!(fields.hod.is_none());
    }

    #[test]
    fn update_request_treats_blank_password_as_absent() {
        let req: UpdateUserRequest = serde_json::from_str(
            r#"{"username":"u","email":"e@x.y","name":"n","mobile":"m","password":"  "}"#,
        )
        .unwrap();
        assert!(req.new_password().is_none());

        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"username":"u","email":"","name":"n","mobile":"m"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn academic_year_accepts_both_spellings() {
        let a: AcademicYearRequest = serde_json::from_str(r#"{"newAcademicYear":"2025-26"}"#).unwrap();
        let b: AcademicYearRequest = serde_json::from_str(r#"{"new_academic_year":"2025-26"}"#).unwrap();
        assert_eq!(a.new_academic_year, b.new_academic_year);
    }
}
