pub mod clock;
pub mod maintenance;
pub mod notification;
pub mod otp_service;
pub mod password;
pub mod token;
