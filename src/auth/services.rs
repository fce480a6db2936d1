use std::{future::Future, sync::Arc, time::Duration};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        error::AuthError,
        jwt::JwtKeys,
        password::PasswordHasher,
        repo::UserStore,
        repo_types::{RegistrationInput, User},
    },
    otp::OtpVerifier,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Runs `fut` under `deadline`. Work already handed to the store is neither
/// retried nor rolled back when the deadline fires.
pub async fn within<T, F>(deadline: Duration, fut: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(res) => res,
        Err(_) => {
            warn!(?deadline, "auth call timed out");
            Err(AuthError::Timeout)
        }
    }
}

/// Runs CPU-bound Argon2 work off the async worker threads.
async fn blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Hashing(format!("hashing task failed: {e}")))?
}

/// Registration and login flows. Every call runs its steps strictly in
/// order and stops at the first failure.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, keys: JwtKeys) -> Self {
        Self {
            store,
            hasher,
            keys,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn sign_up(&self, input: RegistrationInput) -> Result<String, AuthError> {
        match self.store.find_by_email(&input.email).await {
            Ok(existing) if existing.email == input.email => {
                warn!("email already registered");
                return Err(AuthError::AlreadyExists);
            }
            Ok(_) | Err(AuthError::NotFound) => {}
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err(e);
            }
        }

        let hasher = self.hasher;
        let user = blocking(move || input.into_user(&hasher)).await?;
        let user = self.store.create(user).await?;

        match self.keys.issue(user.id, &user.email) {
            Ok(token) => {
                info!(user_id = %user.id, "user registered");
                Ok(token)
            }
            Err(e) => {
                error!(error = %e, user_id = %user.id, "jwt sign failed after create");
                self.compensate(&user).await;
                Err(e)
            }
        }
    }

    /// Removes a user whose token could not be issued, so the email can be
    /// registered again.
    async fn compensate(&self, user: &User) {
        match self.store.delete(user.id).await {
            Ok(true) => info!(user_id = %user.id, "rolled back registration"),
            Ok(false) => warn!(user_id = %user.id, "registration rollback found no user"),
            Err(e) => error!(error = %e, user_id = %user.id, "registration rollback failed"),
        }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let user = match self.store.find_by_email(email).await {
            Ok(u) => u,
            Err(AuthError::NotFound) => {
                warn!("login unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err(e);
            }
        };

        let hasher = self.hasher;
        let (plain, hash) = (password.to_owned(), user.password_hash.clone());
        if !blocking(move || hasher.verify_password(&plain, &hash)).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.issue(user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }

    /// Checks `code` with the provider before any token exists.
    #[instrument(skip(self, code, otp))]
    pub async fn login_phone_otp(
        &self,
        phone: &str,
        code: &str,
        otp: &dyn OtpVerifier,
    ) -> Result<String, AuthError> {
        let user = self.store.find_by_phone(phone).await.map_err(|e| {
            warn!(error = %e, "otp login lookup failed");
            e
        })?;

        let approved = otp.check_code(phone, code).await.map_err(|e| {
            error!(error = %e, user_id = %user.id, "otp check failed");
            AuthError::Adapter(e)
        })?;
        if !approved {
            warn!(user_id = %user.id, "otp code rejected");
            return Err(AuthError::OtpRejected);
        }

        let token = self.keys.issue(user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in with otp");
        Ok(token)
    }

    #[instrument(skip(self, otp))]
    pub async fn send_otp(&self, phone: &str, otp: &dyn OtpVerifier) -> Result<(), AuthError> {
        otp.send_code(phone).await.map_err(|e| {
            error!(error = %e, "otp send failed");
            AuthError::Adapter(e)
        })?;
        debug!("otp sent");
        Ok(())
    }

    pub async fn profile(&self, id: Uuid) -> Result<User, AuthError> {
        self.store.find_by_id(id).await
    }
}
