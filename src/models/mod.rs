pub mod otp;
pub mod settings;
pub mod user;
