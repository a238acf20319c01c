use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of `password_resets`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PasswordReset {
    pub id: i64,
    pub email: String,
    pub otp: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    /// Unconsumed and not yet expired at `now`.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

/// Insert payload for a fresh code.
#[derive(Debug, Clone)]
pub struct NewPasswordReset {
    pub email: String,
    pub otp: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
