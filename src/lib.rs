pub mod app;
pub mod auth;
pub mod config;
pub mod otp;
pub mod state;
