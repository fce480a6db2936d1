use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::{claims::Claims, error::AuthError},
    config::{JwtConfig, MAX_TOKEN_TTL_HOURS},
    state::AppState,
};

/// Signing material and validity window for bearer tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    /// The lifetime is clamped to `0..=MAX_TOKEN_TTL_HOURS`; `AppConfig::from_env`
    /// already rejects anything outside `1..=MAX_TOKEN_TTL_HOURS`.
    pub fn from_config(cfg: &JwtConfig) -> Self {
        let hours = cfg.ttl_hours.clamp(0, MAX_TOKEN_TTL_HOURS) as u64;
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            ttl: Duration::from_secs(hours * 3600),
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.auth.keys().clone()
    }
}

#[cfg(test)]
pub(crate) fn test_keys(secret: &str) -> JwtKeys {
    JwtKeys::from_config(&JwtConfig {
        secret: secret.into(),
        ttl_hours: crate::config::DEFAULT_TOKEN_TTL_HOURS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify_roundtrip() {
        let keys = test_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, "a@x.com").expect("issue");
        assert!(!token.is_empty());
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 72 * 3600);
    }

    #[test]
    fn honours_configured_window() {
        let keys = JwtKeys::from_config(&JwtConfig {
            secret: "s".into(),
            ttl_hours: 1,
        });
        let claims = keys.verify(&keys.issue(Uuid::new_v4(), "b@x.com").unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn out_of_range_window_is_clamped() {
        let huge = JwtKeys::from_config(&JwtConfig {
            secret: "s".into(),
            ttl_hours: i64::MAX,
        });
        let claims = huge.verify(&huge.issue(Uuid::new_v4(), "e@x.com").unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_TOKEN_TTL_HOURS as usize * 3600);

        let negative = JwtKeys::from_config(&JwtConfig {
            secret: "s".into(),
            ttl_hours: -1,
        });
        assert_eq!(negative.ttl, Duration::ZERO);
    }

    #[test]
    fn verify_rejects_foreign_secret() {
        let token = test_keys("secret-one").issue(Uuid::new_v4(), "c@x.com").unwrap();
        let err = test_keys("secret-two").verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::Signing(_)));
        assert!(!err.to_string().contains("secret-one"));
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = test_keys("dev-secret");
        let past = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "d@x.com".into(),
            iat: (past - TimeDuration::hours(1)).unix_timestamp() as usize,
            exp: past.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        assert!(test_keys("dev-secret").verify("not.a.jwt").is_err());
    }
}
