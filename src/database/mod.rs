//! Persistence seams.
//!
//! Handlers and services talk to these traits only. `mysql` backs them with a
//! pooled sqlx connection; `memory` keeps everything in process for tests and
//! local tooling.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::models::otp::{NewPasswordReset, PasswordReset};
use crate::models::user::{NewUser, Role, User, UserUpdate};

pub mod connection;
pub mod memory;
pub mod mysql;
pub mod retry;

/// Role-keyed access to the three credential tables.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self, role: Role) -> Result<Vec<User>>;
    async fn find_by_id(&self, role: Role, id: i64) -> Result<Option<User>>;
    async fn find_by_username(&self, role: Role, username: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<User>>;

    /// True when another row (not `exclude_id`) already uses the username or email.
    async fn exists_with_username_or_email(
        &self,
        role: Role,
        username: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool>;

    async fn insert(&self, role: Role, user: &NewUser) -> Result<i64>;
    async fn update(&self, role: Role, id: i64, update: &UserUpdate) -> Result<bool>;
    async fn update_password_by_email(&self, role: Role, email: &str, password_hash: &str) -> Result<bool>;
    async fn delete(&self, role: Role, id: i64) -> Result<bool>;

    /// Only department rows carry a lock; other roles report `false`.
    async fn set_locked(&self, role: Role, id: i64, locked: bool) -> Result<bool>;

    async fn set_academic_year_all(&self, academic_year: &str) -> Result<()>;
}

#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    async fn insert(&self, reset: &NewPasswordReset) -> Result<i64>;

    /// Most recent row for `email` + `otp` that is unused and expires after `now`.
    async fn find_redeemable(&self, email: &str, otp: &str, now: DateTime<Utc>) -> Result<Option<PasswordReset>>;

    /// Flip `used` on exactly one row.
    async fn mark_used(&self, id: i64) -> Result<()>;

    async fn list_for_email(&self, email: &str) -> Result<Vec<PasswordReset>>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_many(&self, names: &[&str]) -> Result<HashMap<String, String>>;
    async fn upsert(&self, name: &str, value: &str) -> Result<()>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<()>;
}

/// All repositories the application needs, behind trait objects.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub resets: Arc<dyn PasswordResetRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub probe: Arc<dyn HealthProbe>,
}

impl Store {
    pub fn mysql(pool: sqlx::MySqlPool, retry: retry::RetryPolicy) -> Self {
        let db = Arc::new(mysql::MySqlStore::new(pool, retry));
        Store {
            users: db.clone(),
            resets: db.clone(),
            settings: db.clone(),
            probe: db,
        }
    }

    pub fn memory(store: Arc<memory::MemoryStore>) -> Self {
        Store {
            users: store.clone(),
            resets: store.clone(),
            settings: store.clone(),
            probe: store,
        }
    }
}
