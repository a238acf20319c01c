use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{HealthProbe, PasswordResetRepository, SettingsRepository, UserRepository};
use crate::errors::{AppError, Result};
use crate::models::otp::{NewPasswordReset, PasswordReset};
use crate::models::user::{NewUser, Role, User, UserUpdate};

#[derive(Default)]
struct Tables {
    users: HashMap<Role, Vec<User>>,
    resets: Vec<PasswordReset>,
    settings: HashMap<String, String>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn rows(&self, role: Role) -> &[User] {
        self.users.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    fn rows_mut(&mut self, role: Role) -> &mut Vec<User> {
        self.users.entry(role).or_default()
    }
}

/// Process-local store with the same semantics as the MySQL tables.
///
/// Settings reads and health pings can be switched to fail so tests can
/// exercise the fail-open and 503 paths.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    settings_unavailable: AtomicBool,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_settings_unavailable(&self, unavailable: bool) {
        self.settings_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list(&self, role: Role) -> Result<Vec<User>> {
        self.check_online()?;
        Ok(self.tables().rows(role).to_vec())
    }

    async fn find_by_id(&self, role: Role, id: i64) -> Result<Option<User>> {
        self.check_online()?;
        Ok(self.tables().rows(role).iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, role: Role, username: &str) -> Result<Option<User>> {
        self.check_online()?;
        Ok(self
            .tables()
            .rows(role)
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<User>> {
        self.check_online()?;
        Ok(self.tables().rows(role).iter().find(|u| u.email == email).cloned())
    }

    async fn exists_with_username_or_email(
        &self,
        role: Role,
        username: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        self.check_online()?;
        Ok(self.tables().rows(role).iter().any(|u| {
            Some(u.id) != exclude_id && (u.username == username || u.email == email)
        }))
    }

    async fn insert(&self, role: Role, user: &NewUser) -> Result<i64> {
        self.check_online()?;
        let mut tables = self.tables();
        let id = tables.next_id();
        let mut row = User {
            id,
            username: String::new(),
            email: String::new(),
            name: None,
            mobile: None,
            role: None,
            department: None,
            dept_id: None,
            hod: None,
            degree_level: None,
            academic_year: None,
            password_hash: user.password_hash.clone(),
            locked: role.supports_lock().then_some(false),
        };
        user.fields.apply_to(role, &mut row);
        tables.rows_mut(role).push(row);
        Ok(id)
    }

    async fn update(&self, role: Role, id: i64, update: &UserUpdate) -> Result<bool> {
        self.check_online()?;
        let mut tables = self.tables();
        let Some(row) = tables.rows_mut(role).iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        update.fields.apply_to(role, row);
        if let Some(hash) = &update.password_hash {
            row.password_hash = hash.clone();
        }
        Ok(true)
    }

    async fn update_password_by_email(&self, role: Role, email: &str, password_hash: &str) -> Result<bool> {
        self.check_online()?;
        let mut tables = self.tables();
        let mut changed = false;
        for row in tables.rows_mut(role).iter_mut().filter(|u| u.email == email) {
            row.password_hash = password_hash.to_string();
            changed = true;
        }
        Ok(changed)
    }

    async fn delete(&self, role: Role, id: i64) -> Result<bool> {
        self.check_online()?;
        let mut tables = self.tables();
        let rows = tables.rows_mut(role);
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() != before)
    }

    async fn set_locked(&self, role: Role, id: i64, locked: bool) -> Result<bool> {
        self.check_online()?;
        if !role.supports_lock() {
            return Ok(false);
        }
        let mut tables = self.tables();
        match tables.rows_mut(role).iter_mut().find(|u| u.id == id) {
            Some(row) => {
                row.locked = Some(locked);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_academic_year_all(&self, academic_year: &str) -> Result<()> {
        self.check_online()?;
        let mut tables = self.tables();
        for rows in tables.users.values_mut() {
            for row in rows.iter_mut() {
                row.academic_year = Some(academic_year.to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PasswordResetRepository for MemoryStore {
    async fn insert(&self, reset: &NewPasswordReset) -> Result<i64> {
        self.check_online()?;
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.resets.push(PasswordReset {
            id,
            email: reset.email.clone(),
            otp: reset.otp.clone(),
            expires_at: reset.expires_at,
            used: false,
            created_at: reset.created_at,
        });
        Ok(id)
    }

    async fn find_redeemable(&self, email: &str, otp: &str, now: DateTime<Utc>) -> Result<Option<PasswordReset>> {
        self.check_online()?;
        Ok(self
            .tables()
            .resets
            .iter()
            .filter(|r| r.email == email && r.otp == otp && r.is_redeemable(now))
            .max_by_key(|r| (r.created_at, r.id))
            .cloned())
    }

    async fn mark_used(&self, id: i64) -> Result<()> {
        self.check_online()?;
        if let Some(row) = self.tables().resets.iter_mut().find(|r| r.id == id) {
            row.used = true;
        }
        Ok(())
    }

    async fn list_for_email(&self, email: &str) -> Result<Vec<PasswordReset>> {
        self.check_online()?;
        let mut rows: Vec<PasswordReset> = self
            .tables()
            .resets
            .iter()
            .filter(|r| r.email == email)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn get_many(&self, names: &[&str]) -> Result<HashMap<String, String>> {
        if self.settings_unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        self.check_online()?;
        let tables = self.tables();
        Ok(names
            .iter()
            .filter_map(|n| tables.settings.get(*n).map(|v| (n.to_string(), v.clone())))
            .collect())
    }

    async fn upsert(&self, name: &str, value: &str) -> Result<()> {
        self.check_online()?;
        self.tables()
            .settings
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserFields;
    use chrono::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            fields: UserFields {
                username: username.into(),
                email: email.into(),
                name: "Someone".into(),
                mobile: "9999999999".into(),
                ..UserFields::default()
            },
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_check_respects_exclusion() {
        let store = MemoryStore::new();
        let id = UserRepository::insert(&store, Role::Admin, &new_user("root", "root@example.com"))
            .await
            .unwrap();

        assert!(store
            .exists_with_username_or_email(Role::Admin, "root", "other@example.com", None)
            .await
            .unwrap());
        assert!(!store
            .exists_with_username_or_email(Role::Admin, "root", "root@example.com", Some(id))
            .await
            .unwrap());
        assert!(!store
            .exists_with_username_or_email(Role::Office, "root", "root@example.com", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn redeemable_prefers_newest_unused_unexpired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (otp, created, ttl) in [("111111", 0, 10), ("111111", 1, 10), ("222222", 2, -1)] {
            PasswordResetRepository::insert(
                &store,
                &NewPasswordReset {
                    email: "a@b.c".into(),
                    otp: otp.into(),
                    expires_at: now + Duration::minutes(ttl),
                    created_at: now + Duration::seconds(created),
                },
            )
            .await
            .unwrap();
        }

        let hit = store.find_redeemable("a@b.c", "111111", now).await.unwrap().unwrap();
        assert_eq!(hit.created_at, now + Duration::seconds(1));
        assert!(store.find_redeemable("a@b.c", "222222", now).await.unwrap().is_none());

        store.mark_used(hit.id).await.unwrap();
        let next = store.find_redeemable("a@b.c", "111111", now).await.unwrap().unwrap();
        assert_ne!(next.id, hit.id);
        assert_eq!(store.list_for_email("a@b.c").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn lock_only_applies_to_department_rows() {
        let store = MemoryStore::new();
        let dept = UserRepository::insert(&store, Role::Department, &new_user("d", "d@x.y"))
            .await
            .unwrap();
        let office = UserRepository::insert(&store, Role::Office, &new_user("o", "o@x.y"))
            .await
            .unwrap();

        assert!(store.set_locked(Role::Department, dept, true).await.unwrap());
        assert!(!store.set_locked(Role::Office, office, true).await.unwrap());
        let row = store.find_by_id(Role::Department, dept).await.unwrap().unwrap();
        assert!(row.is_locked());
    }
}
