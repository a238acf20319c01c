use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    mysql::{MySqlArguments, MySqlPool},
    query::Query,
    MySql,
};

use super::retry::RetryPolicy;
use super::{HealthProbe, PasswordResetRepository, SettingsRepository, UserRepository};
use crate::errors::Result;
use crate::models::otp::{NewPasswordReset, PasswordReset};
use crate::models::user::{NewUser, Role, User, UserFields, UserUpdate};

/// sqlx-backed implementation of every repository trait.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    retry: RetryPolicy,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }
}

/// Column list that maps every role's table onto `User`.
fn select_columns(role: Role) -> &'static str {
    match role {
        Role::Admin => {
            "id, username, email, name, mobile, role, NULL AS department, NULL AS dept_id, \
             NULL AS hod, NULL AS degree_level, academic_year, password, NULL AS locked"
        }
        Role::Department => {
            "id, username, email, name, mobile, NULL AS role, department, dept_id, \
             hod, degree_level, academic_year, password, locked"
        }
        Role::Office => {
            "id, username, email, name, mobile, NULL AS role, department, NULL AS dept_id, \
             NULL AS hod, NULL AS degree_level, academic_year, password, NULL AS locked"
        }
    }
}

fn bind_fields<'a>(
    mut query: Query<'a, MySql, MySqlArguments>,
    role: Role,
    fields: &'a UserFields,
) -> Query<'a, MySql, MySqlArguments> {
    for column in UserFields::columns(role) {
        query = query.bind(fields.column(column));
    }
    query
}

fn insert_sql(role: Role) -> String {
    let columns = UserFields::columns(role);
    let placeholders = vec!["?"; columns.len() + 1].join(", ");
    format!(
        "INSERT INTO {} ({}, password) VALUES ({})",
        role.table(),
        columns.join(", "),
        placeholders
    )
}

fn update_sql(role: Role, with_password: bool) -> String {
    let mut assignments: Vec<String> = UserFields::columns(role)
        .iter()
        .map(|c| format!("{} = ?", c))
        .collect();
    if with_password {
        assignments.push("password = ?".to_string());
    }
    format!("UPDATE {} SET {} WHERE id = ?", role.table(), assignments.join(", "))
}

#[async_trait]
impl UserRepository for MySqlStore {
    async fn list(&self, role: Role) -> Result<Vec<User>> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", select_columns(role), role.table());
        self.retry
            .query("users.list", || sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool))
            .await
    }

    async fn find_by_id(&self, role: Role, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?", select_columns(role), role.table());
        self.retry
            .query("users.find_by_id", || {
                sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool)
            })
            .await
    }

    async fn find_by_username(&self, role: Role, username: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE username = ? LIMIT 1",
            select_columns(role),
            role.table()
        );
        self.retry
            .query("users.find_by_username", || {
                sqlx::query_as::<_, User>(&sql).bind(username).fetch_optional(&self.pool)
            })
            .await
    }

    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE email = ? LIMIT 1",
            select_columns(role),
            role.table()
        );
        self.retry
            .query("users.find_by_email", || {
                sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&self.pool)
            })
            .await
    }

    async fn exists_with_username_or_email(
        &self,
        role: Role,
        username: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let sql = match exclude_id {
            Some(_) => format!(
                "SELECT COUNT(*) FROM {} WHERE (username = ? OR email = ?) AND id <> ?",
                role.table()
            ),
            None => format!("SELECT COUNT(*) FROM {} WHERE username = ? OR email = ?", role.table()),
        };
        let count: i64 = self
            .retry
            .query("users.exists", || {
                let mut query = sqlx::query_scalar::<MySql, i64>(&sql).bind(username).bind(email);
                if let Some(id) = exclude_id {
                    query = query.bind(id);
                }
                query.fetch_one(&self.pool)
            })
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, role: Role, user: &NewUser) -> Result<i64> {
        let sql = insert_sql(role);
        let result = self
            .retry
            .query("users.insert", || {
                bind_fields(sqlx::query(&sql), role, &user.fields)
                    .bind(&user.password_hash)
                    .execute(&self.pool)
            })
            .await?;
        Ok(result.last_insert_id() as i64)
    }

    async fn update(&self, role: Role, id: i64, update: &UserUpdate) -> Result<bool> {
        let sql = update_sql(role, update.password_hash.is_some());
        let result = self
            .retry
            .query("users.update", || {
                let mut query = bind_fields(sqlx::query(&sql), role, &update.fields);
                if let Some(hash) = &update.password_hash {
                    query = query.bind(hash);
                }
                query.bind(id).execute(&self.pool)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_password_by_email(&self, role: Role, email: &str, password_hash: &str) -> Result<bool> {
        let sql = format!("UPDATE {} SET password = ? WHERE email = ?", role.table());
        let result = self
            .retry
            .query("users.update_password", || {
                sqlx::query(&sql)
                    .bind(password_hash)
                    .bind(email)
                    .execute(&self.pool)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, role: Role, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", role.table());
        let result = self
            .retry
            .query("users.delete", || sqlx::query(&sql).bind(id).execute(&self.pool))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_locked(&self, role: Role, id: i64, locked: bool) -> Result<bool> {
        if !role.supports_lock() {
            return Ok(false);
        }
        let sql = format!("UPDATE {} SET locked = ? WHERE id = ?", role.table());
        let result = self
            .retry
            .query("users.set_locked", || {
                sqlx::query(&sql).bind(locked).bind(id).execute(&self.pool)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_academic_year_all(&self, academic_year: &str) -> Result<()> {
        for role in [Role::Department, Role::Office, Role::Admin] {
            let sql = format!("UPDATE {} SET academic_year = ?", role.table());
            self.retry
                .query("users.set_academic_year", || {
                    sqlx::query(&sql).bind(academic_year).execute(&self.pool)
                })
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PasswordResetRepository for MySqlStore {
    async fn insert(&self, reset: &NewPasswordReset) -> Result<i64> {
        let result = self
            .retry
            .query("password_resets.insert", || {
                sqlx::query(
                    "INSERT INTO password_resets (email, otp, expires_at, used, created_at) \
                     VALUES (?, ?, ?, 0, ?)",
                )
                .bind(&reset.email)
                .bind(&reset.otp)
                .bind(reset.expires_at)
                .bind(reset.created_at)
                .execute(&self.pool)
            })
            .await?;
        Ok(result.last_insert_id() as i64)
    }

    async fn find_redeemable(&self, email: &str, otp: &str, now: DateTime<Utc>) -> Result<Option<PasswordReset>> {
        self.retry
            .query("password_resets.find_redeemable", || {
                sqlx::query_as::<_, PasswordReset>(
                    "SELECT id, email, otp, expires_at, used, created_at FROM password_resets \
                     WHERE email = ? AND otp = ? AND used = 0 AND expires_at > ? \
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                )
                .bind(email)
                .bind(otp)
                .bind(now)
                .fetch_optional(&self.pool)
            })
            .await
    }

    async fn mark_used(&self, id: i64) -> Result<()> {
        self.retry
            .query("password_resets.mark_used", || {
                sqlx::query("UPDATE password_resets SET used = 1 WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
            })
            .await?;
        Ok(())
    }

    async fn list_for_email(&self, email: &str) -> Result<Vec<PasswordReset>> {
        self.retry
            .query("password_resets.list", || {
                sqlx::query_as::<_, PasswordReset>(
                    "SELECT id, email, otp, expires_at, used, created_at FROM password_resets \
                     WHERE email = ? ORDER BY created_at DESC, id DESC",
                )
                .bind(email)
                .fetch_all(&self.pool)
            })
            .await
    }
}

#[async_trait]
impl SettingsRepository for MySqlStore {
    async fn get_many(&self, names: &[&str]) -> Result<HashMap<String, String>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT name, value FROM app_settings WHERE name IN ({})",
            vec!["?"; names.len()].join(", ")
        );
        let rows: Vec<(String, String)> = self
            .retry
            .query("app_settings.get", || {
                let mut query = sqlx::query_as::<MySql, (String, String)>(&sql);
                for name in names {
                    query = query.bind(*name);
                }
                query.fetch_all(&self.pool)
            })
            .await?;
        Ok(rows.into_iter().collect())
    }

    async fn upsert(&self, name: &str, value: &str) -> Result<()> {
        self.retry
            .query("app_settings.upsert", || {
                sqlx::query(
                    "INSERT INTO app_settings (name, value) VALUES (?, ?) \
                     ON DUPLICATE KEY UPDATE value = VALUES(value)",
                )
                .bind(name)
                .bind(value)
                .execute(&self.pool)
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for MySqlStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
