use std::sync::Arc;

use chrono::Duration;
use rand::Rng;
use serde::Serialize;

use crate::database::{PasswordResetRepository, UserRepository};
use crate::errors::{AppError, Result};
use crate::models::otp::NewPasswordReset;
use crate::models::user::{Role, User};
use crate::services::clock::Clock;
use crate::services::notification::{Notification, NotificationDispatcher};
use crate::services::password::PasswordHasher;

pub const OTP_TTL_MINUTES: i64 = 10;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Outcome of a reset request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequested {
    pub masked_email: String,
    /// Set only when mail is unconfigured outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_for_testing: Option<String>,
}

/// Uniform 6-digit code in 100000..=999999.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

/// `jo***@example.com` style masking; keeps the first two characters of the
/// local part and the whole domain.
pub fn mask_email(email: &str) -> String {
    match email.rfind('@') {
        Some(at) if at >= 2 => {
            let prefix: String = email[..at].chars().take(2).collect();
            format!("{}***{}", prefix, &email[at..])
        }
        _ => email.to_string(),
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// OTP-based password reset across all account tables.
pub struct OtpService {
    users: Arc<dyn UserRepository>,
    resets: Arc<dyn PasswordResetRepository>,
    hasher: PasswordHasher,
    notifications: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    production: bool,
}

impl OtpService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        resets: Arc<dyn PasswordResetRepository>,
        hasher: PasswordHasher,
        notifications: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        production: bool,
    ) -> Self {
        Self {
            users,
            resets,
            hasher,
            notifications,
            clock,
            production,
        }
    }

    async fn find_account(&self, email: &str) -> Result<(Role, User)> {
        for role in Role::SEARCH_ORDER {
            if let Some(user) = self.users.find_by_email(role, email).await? {
                return Ok((role, user));
            }
        }
        Err(AppError::not_found("No account found"))
    }

    pub async fn request_reset(&self, raw_email: &str) -> Result<ResetRequested> {
        let email = normalize_email(raw_email);
        if email.is_empty() {
            return Err(AppError::invalid_data("Email is required"));
        }

        let (role, user) = self.find_account(&email).await?;

        let otp = generate_otp();
        let now = self.clock.now();
        self.resets
            .insert(&NewPasswordReset {
                email: email.clone(),
                otp: otp.clone(),
                expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
                created_at: now,
            })
            .await?;

        let masked_email = mask_email(&email);
        tracing::info!(role = %role, user_id = user.id, email = %masked_email, "password reset code issued");

        if !self.notifications.has_mailer() {
            if self.production {
                tracing::error!("reset code generated but outbound mail is not configured");
                return Err(AppError::ServiceUnavailable(
                    "Email service not configured. Please contact the administrator.".to_string(),
                ));
            }
            tracing::warn!(email = %masked_email, "mail disabled; returning reset code in response");
            return Ok(ResetRequested {
                masked_email,
                otp_for_testing: Some(otp),
            });
        }

        self.notifications.dispatch(Notification::ResetCode {
            to: user.email,
            code: otp,
        });

        Ok(ResetRequested {
            masked_email,
            otp_for_testing: None,
        })
    }

    /// Side-effect free; may be called any number of times before the reset.
    pub async fn verify_otp(&self, raw_email: &str, raw_otp: &str) -> Result<()> {
        let email = normalize_email(raw_email);
        let otp = raw_otp.trim();
        if email.is_empty() || otp.is_empty() {
            return Err(AppError::invalid_data("Email and OTP are required"));
        }

        self.find_account(&email).await?;
        self.resets
            .find_redeemable(&email, otp, self.clock.now())
            .await?
            .ok_or(AppError::InvalidOrExpiredOtp)?;
        Ok(())
    }

    /// Re-checks the code, stores the new hash and consumes the matched row.
    ///
    /// The password write and the consumption are separate statements.
    pub async fn reset_password(&self, raw_email: &str, raw_otp: &str, new_password: &str) -> Result<()> {
        let email = normalize_email(raw_email);
        let otp = raw_otp.trim();
        if email.is_empty() || otp.is_empty() || new_password.is_empty() {
            return Err(AppError::invalid_data("Email, OTP, and new password are required"));
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::invalid_data(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let (role, user) = self.find_account(&email).await?;
        let reset = self
            .resets
            .find_redeemable(&email, otp, self.clock.now())
            .await?
            .ok_or(AppError::InvalidOrExpiredOtp)?;

        let hash = self.hasher.hash(new_password).await?;
        self.users.update_password_by_email(role, &email, &hash).await?;
        self.resets.mark_used(reset.id).await?;

        tracing::info!(role = %role, user_id = user.id, reset_id = reset.id, "password reset completed");

        self.notifications.dispatch(Notification::PasswordChanged {
            to: user.email.clone(),
            name: user.display_name().to_string(),
            username: user.username,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::user::{NewUser, UserFields};
    use crate::services::clock::ManualClock;
    use crate::services::notification::RecordingMailer;

    struct Harness {
        service: OtpService,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        mailer: Arc<RecordingMailer>,
        dispatcher: NotificationDispatcher,
    }

    async fn harness(with_mailer: bool, production: bool) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = NotificationDispatcher::spawn(
            with_mailer.then(|| mailer.clone() as Arc<dyn crate::services::notification::Mailer>),
        );
        let hasher = PasswordHasher::with_cost(4);

        UserRepository::insert(
            store.as_ref(),
            Role::Department,
            &NewUser {
                fields: UserFields {
                    username: "physics".into(),
                    email: "user@example.com".into(),
                    name: "Physics HOD".into(),
                    mobile: "9000000000".into(),
                    ..UserFields::default()
                },
                password_hash: hasher.hash("old-password").await.unwrap(),
            },
        )
        .await
        .unwrap();

        let service = OtpService::new(
            store.clone(),
            store.clone(),
            hasher,
            dispatcher.clone(),
            clock.clone(),
            production,
        );
        Harness {
            service,
            store,
            clock,
            mailer,
            dispatcher,
        }
    }

    async fn latest_code(h: &Harness) -> String {
        h.store.list_for_email("user@example.com").await.unwrap()[0].otp.clone()
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..1000 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn masks_email() {
        assert_eq!(mask_email("user@example.com"), "us***@example.com");
        assert_eq!(mask_email("ab@x.io"), "ab***@x.io");
        assert_eq!(mask_email("a@x.io"), "a@x.io");
        assert_eq!(mask_email("not-an-email"), "not-an-email");
    }

    #[tokio::test]
    async fn request_persists_code_and_queues_email() {
        let h = harness(true, true).await;
        let before = h.clock.now();

        let ack = h.service.request_reset("  User@Example.com ").await.unwrap();
        assert_eq!(ack.masked_email, "us***@example.com");
        assert!(ack.otp_for_testing.is_none());

        let rows = h.store.list_for_email("user@example.com").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].used);
        assert_eq!(rows[0].expires_at - before, Duration::minutes(10));

        h.dispatcher.flush().await;
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html.contains(&rows[0].otp));
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let h = harness(true, false).await;
        let err = h.service.request_reset("ghost@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(
            h.service.request_reset("   ").await.unwrap_err(),
            AppError::ValidationError(_)
        ));
    }

    #[tokio::test]
    async fn unconfigured_mail_depends_on_environment() {
        let dev = harness(false, false).await;
        let ack = dev.service.request_reset("user@example.com").await.unwrap();
        assert_eq!(ack.otp_for_testing, Some(latest_code(&dev).await));

        let prod = harness(false, true).await;
        let err = prod.service.request_reset("user@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn verify_is_repeatable_until_expiry() {
        let h = harness(true, false).await;
        h.service.request_reset("user@example.com").await.unwrap();
        let code = latest_code(&h).await;

        for _ in 0..3 {
            h.service.verify_otp("user@example.com", &code).await.unwrap();
        }
        assert!(matches!(
            h.service.verify_otp("user@example.com", "000000").await,
            Err(AppError::InvalidOrExpiredOtp)
        ));

        h.clock.advance(Duration::minutes(10));
        assert!(matches!(
            h.service.verify_otp("user@example.com", &code).await,
            Err(AppError::InvalidOrExpiredOtp)
        ));
    }

    #[tokio::test]
    async fn reset_consumes_only_the_matched_row() {
        let h = harness(true, false).await;
        h.service.request_reset("user@example.com").await.unwrap();
        h.clock.advance(Duration::seconds(1));
        h.service.request_reset("user@example.com").await.unwrap();
        let code = latest_code(&h).await;

        h.service
            .reset_password("user@example.com", &code, "brand-new-pass")
            .await
            .unwrap();

        let rows = h.store.list_for_email("user@example.com").await.unwrap();
        assert!(rows[0].used);
        assert!(!rows[1].used);

        assert!(matches!(
            h.service.verify_otp("user@example.com", &code).await,
            Err(AppError::InvalidOrExpiredOtp)
        ));
        assert!(matches!(
            h.service.reset_password("user@example.com", &code, "another-pass").await,
            Err(AppError::InvalidOrExpiredOtp)
        ));

        let user = h
            .store
            .find_by_email(Role::Department, "user@example.com")
            .await
            .unwrap()
            .unwrap();
        let hasher = PasswordHasher::with_cost(4);
        assert!(hasher.verify("brand-new-pass", &user.password_hash).await);
        assert!(!hasher.verify("old-password", &user.password_hash).await);

        h.dispatcher.flush().await;
        let subjects: Vec<String> = h.mailer.sent().into_iter().map(|m| m.subject).collect();
        assert!(subjects.last().unwrap().ends_with("Password Changed"));
    }

    #[tokio::test]
    async fn reset_validates_before_touching_storage() {
        let h = harness(true, false).await;
        h.service.request_reset("user@example.com").await.unwrap();
        let code = latest_code(&h).await;

        let err = h
            .service
            .reset_password("user@example.com", &code, "short")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters");

        assert!(matches!(
            h.service.reset_password("user@example.com", "", "long-enough").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            h.service.reset_password("nobody@example.com", &code, "long-enough").await,
            Err(AppError::NotFound(_))
        ));

        let rows = h.store.list_for_email("user@example.com").await.unwrap();
        assert!(!rows[0].used);
    }

    #[tokio::test]
    async fn password_length_boundary_is_eight_characters() {
        let h = harness(true, false).await;
        h.service.request_reset("user@example.com").await.unwrap();
        let code = latest_code(&h).await;

        assert!(matches!(
            h.service.reset_password("user@example.com", &code, "seven77").await,
            Err(AppError::ValidationError(_))
        ));
        h.service
            .reset_password("user@example.com", &code, "eight888")
            .await
            .unwrap();

        let rows = h.store.list_for_email("user@example.com").await.unwrap();
        assert!(rows[0].used);
    }

    #[tokio::test]
    async fn expired_code_cannot_reset() {
        let h = harness(true, false).await;
        h.service.request_reset("user@example.com").await.unwrap();
        let code = latest_code(&h).await;

        h.clock.advance(Duration::minutes(10) + Duration::seconds(1));
        assert!(matches!(
            h.service.reset_password("user@example.com", &code, "brand-new-pass").await,
            Err(AppError::InvalidOrExpiredOtp)
        ));
    }
}
