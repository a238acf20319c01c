use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::user::{Role, User};
use crate::services::otp_service::ResetRequested;

// Missing fields deserialize as empty so handlers can answer with the
// portal's own 400 messages instead of a serde rejection.

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password are required"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password are required"))]
    pub password: String,

    /// Restrict the lookup to one account table.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub otp: String,
    #[serde(default, alias = "new_password")]
    pub new_password: String,
}

/// Codes typed into numeric inputs arrive as JSON numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a string or number",
        )),
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        MessageResponse {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub reset: ResetRequested,
}

/// The subset of the account returned on login.
#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub department: Option<String>,
    pub dept_id: Option<String>,
    pub academic_year: Option<String>,
}

impl LoginUser {
    pub fn new(user: User, role: Role) -> Self {
        LoginUser {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            role: user.role.unwrap_or_else(|| role.to_string()),
            department: user.department,
            dept_id: user.dept_id,
            academic_year: user.academic_year,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: LoginUser,
}
