pub mod auth;
pub mod auth_otp;
pub mod health;
pub mod maintenance;
pub mod users;
