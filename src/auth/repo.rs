use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{error::AuthError, repo_types::User};

/// Persistence of user records.
///
/// Lookups return [`AuthError::NotFound`] when nothing matches, including on
/// an empty key, and [`AuthError::Store`] for every other failure.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: User) -> Result<User, AuthError>;
    async fn find_by_id(&self, id: Uuid) -> Result<User, AuthError>;
    async fn find_by_email(&self, email: &str) -> Result<User, AuthError>;
    async fn find_by_phone(&self, phone: &str) -> Result<User, AuthError>;
    async fn find_by_username(&self, username: &str) -> Result<User, AuthError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AuthError>;
}

const USER_COLUMNS: &str = "id, name, password_hash, phone_number, profile_pic, email, \
                            username, user_type, date_of_birth, gender, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_by_column(&self, column: &'static str, value: &str) -> Result<User, AuthError> {
        if value.is_empty() {
            return Err(AuthError::NotFound);
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1 LIMIT 1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        user.ok_or(AuthError::NotFound)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: User) -> Result<User, AuthError> {
        let sql = format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(&user.phone_number)
            .bind(&user.profile_pic)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.user_type)
            .bind(&user.date_of_birth)
            .bind(&user.gender)
            .bind(user.created_at)
            .fetch_one(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        user.ok_or(AuthError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.find_by_column("email", email).await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<User, AuthError> {
        self.find_by_column("phone_number", phone).await
    }

    async fn find_by_username(&self, username: &str) -> Result<User, AuthError> {
        self.find_by_column("username", username).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}

/// In-process store. Mirrors the Postgres schema's unique index on
/// non-empty email.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    fn find_by<F>(&self, key: &str, pick: F) -> Result<User, AuthError>
    where
        F: Fn(&User) -> &str,
    {
        if key.is_empty() {
            return Err(AuthError::NotFound);
        }
        let users = self.users.read().map_err(poisoned)?;
        users
            .values()
            .find(|u| pick(u) == key)
            .cloned()
            .ok_or(AuthError::NotFound)
    }
}

fn poisoned<T>(_: T) -> AuthError {
    AuthError::Store("user map lock poisoned".into())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: User) -> Result<User, AuthError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.contains_key(&user.id)
            || (!user.email.is_empty() && users.values().any(|u| u.email == user.email))
        {
            return Err(AuthError::AlreadyExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        let users = self.users.read().map_err(poisoned)?;
        users.get(&id).cloned().ok_or(AuthError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.find_by(email, |u| u.email.as_str())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<User, AuthError> {
        self.find_by(phone, |u| u.phone_number.as_str())
    }

    async fn find_by_username(&self, username: &str) -> Result<User, AuthError> {
        self.find_by(username, |u| u.username.as_str())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let mut users = self.users.write().map_err(poisoned)?;
        Ok(users.remove(&id).is_some())
    }
}
