use std::{fmt, time::Duration};

use anyhow::Context;
use serde::Deserialize;

/// Validity window of an issued token when `JWT_TTL_HOURS` is not set.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 72;

/// Upper bound accepted for `JWT_TTL_HOURS` (ten years).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

/// Budget for a single auth call when `REQUEST_TIMEOUT_SECS` is not set.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl_hours", &self.ttl_hours)
            .finish()
    }
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct OtpConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub service_id: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for OtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("service_id", &self.service_id)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub otp: OtpConfig,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            ttl_hours: validate_ttl_hours(env_or("JWT_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS))
                .context("invalid JWT_TTL_HOURS")?,
        };
        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: env_or("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib),
            iterations: env_or("PASSWORD_HASH_ITERATIONS", defaults.iterations),
            parallelism: env_or("PASSWORD_HASH_PARALLELISM", defaults.parallelism),
        };
        let otp = OtpConfig {
            account_sid: std::env::var("TWILIO_ACCOUNT_SID")
                .context("TWILIO_ACCOUNT_SID is not set")?,
            auth_token: std::env::var("TWILIO_AUTHTOKEN").context("TWILIO_AUTHTOKEN is not set")?,
            service_id: std::env::var("TWILIO_SERVICES_ID")
                .context("TWILIO_SERVICES_ID is not set")?,
            base_url: std::env::var("TWILIO_BASE_URL")
                .unwrap_or_else(|_| "https://verify.twilio.com".into()),
            timeout_secs: env_or("OTP_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        Ok(Self {
            database_url,
            jwt,
            password,
            otp,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn validate_ttl_hours(hours: i64) -> anyhow::Result<i64> {
    anyhow::ensure!(
        (1..=MAX_TOKEN_TTL_HOURS).contains(&hours),
        "token lifetime must be between 1 and {MAX_TOKEN_TTL_HOURS} hours, got {hours}"
    );
    Ok(hours)
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
