// Schema bootstrap for the tables this service owns.
use sqlx::MySqlPool;

use crate::errors::Result;

const OWNED_TABLES: [&str; 2] = [
    r#"CREATE TABLE IF NOT EXISTS password_resets (
        id BIGINT AUTO_INCREMENT PRIMARY KEY,
        email VARCHAR(255) NOT NULL,
        otp VARCHAR(6) NOT NULL,
        expires_at DATETIME NOT NULL,
        used TINYINT(1) NOT NULL DEFAULT 0,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        INDEX idx_password_resets_email (email)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS app_settings (
        name VARCHAR(64) PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
    )"#,
];

/// Minimal credential tables for a fresh deployment. Existing installs
/// already have richer versions of these, which `IF NOT EXISTS` leaves alone.
const USER_TABLES: [&str; 3] = [
    r#"CREATE TABLE IF NOT EXISTS admin (
        id INT AUTO_INCREMENT PRIMARY KEY,
        username VARCHAR(100) NOT NULL UNIQUE,
        email VARCHAR(255) NOT NULL UNIQUE,
        name VARCHAR(255),
        mobile VARCHAR(20),
        role VARCHAR(100),
        password VARCHAR(255) NOT NULL,
        academic_year VARCHAR(20)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS department_users (
        id INT AUTO_INCREMENT PRIMARY KEY,
        username VARCHAR(100) NOT NULL UNIQUE,
        email VARCHAR(255) NOT NULL UNIQUE,
        name VARCHAR(255),
        mobile VARCHAR(20),
        department VARCHAR(255),
        dept_id VARCHAR(50),
        hod VARCHAR(255),
        degree_level VARCHAR(50),
        academic_year VARCHAR(20),
        password VARCHAR(255) NOT NULL,
        locked TINYINT(1) NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS office_users (
        id INT AUTO_INCREMENT PRIMARY KEY,
        username VARCHAR(100) NOT NULL UNIQUE,
        email VARCHAR(255) NOT NULL UNIQUE,
        name VARCHAR(255),
        mobile VARCHAR(20),
        department VARCHAR(255),
        academic_year VARCHAR(20),
        password VARCHAR(255) NOT NULL
    )"#,
];

pub async fn ensure_schema(pool: &MySqlPool, include_user_tables: bool) -> Result<()> {
    for ddl in OWNED_TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }
    if include_user_tables {
        for ddl in USER_TABLES {
            sqlx::query(ddl).execute(pool).await?;
        }
    }
    tracing::info!(include_user_tables, "database schema ensured");
    Ok(())
}
