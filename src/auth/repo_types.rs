use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{error::AuthError, password::PasswordHasher};

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub phone_number: String,
    pub profile_pic: String,
    pub email: String,
    pub username: String,
    pub user_type: String,
    pub date_of_birth: String,
    pub gender: String,
    pub created_at: OffsetDateTime,
}

/// Data submitted to create a user. Holds the plaintext password until
/// [`RegistrationInput::into_user`] replaces it with a digest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationInput {
    pub name: String,
    pub password: String,
    #[serde(rename = "phonenumber", alias = "phone_number")]
    pub phone_number: String,
    #[serde(rename = "profilepic", alias = "profile_pic")]
    pub profile_pic: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "dob")]
    pub date_of_birth: String,
    pub gender: String,
    #[serde(rename = "usertype", alias = "user_type")]
    pub user_type: String,
}

impl RegistrationInput {
    /// Assigns the id and creation time and hashes the password. This is the
    /// only place a user id is generated.
    pub fn into_user(self, hasher: &PasswordHasher) -> Result<User, AuthError> {
        let password_hash = hasher.hash_password(&self.password)?;
        Ok(User {
            id: Uuid::new_v4(),
            name: self.name,
            password_hash,
            phone_number: self.phone_number,
            profile_pic: self.profile_pic,
            email: self.email,
            username: self.username,
            user_type: self.user_type,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            created_at: OffsetDateTime::now_utc(),
        })
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub profile_pic: String,
    pub user_type: String,
    pub username: String,
    #[serde(rename = "dob")]
    pub date_of_birth: String,
    pub gender: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone_number: u.phone_number,
            profile_pic: u.profile_pic,
            user_type: u.user_type,
            username: u.username,
            date_of_birth: u.date_of_birth,
            gender: u.gender,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::fast_hasher;

    #[test]
    fn registration_payload_uses_wire_names() {
        let input: RegistrationInput = serde_json::from_str(
            r#"{"name":"Ada","password":"p1","phonenumber":"+15550001","profilepic":"pic.png",
                "email":"a@x.com","username":"ada","dob":"1990-01-01","gender":"f","usertype":"student"}"#,
        )
        .unwrap();
        assert_eq!(input.phone_number, "+15550001");
        assert_eq!(input.profile_pic, "pic.png");
        assert_eq!(input.date_of_birth, "1990-01-01");
        assert_eq!(input.user_type, "student");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let input: RegistrationInput = serde_json::from_str(r#"{"password":"p1"}"#).unwrap();
        assert!(input.email.is_empty());
        assert!(input.phone_number.is_empty());
    }

    #[test]
    fn conversion_hashes_and_assigns_identity() {
        let input = RegistrationInput {
            email: "a@x.com".into(),
            password: "p1".into(),
            ..Default::default()
        };
        let user = input.into_user(&fast_hasher()).unwrap();
        assert_ne!(user.password_hash, "p1");
        assert!(!user.id.is_nil());
        assert_eq!(user.email, "a@x.com");
    }

    #[test]
    fn public_user_never_serializes_hash() {
        let user = RegistrationInput {
            email: "a@x.com".into(),
            password: "p1".into(),
            ..Default::default()
        }
        .into_user(&fast_hasher())
        .unwrap();
        let hash = user.password_hash.clone();
        let json = serde_json::to_string(&PublicUser::from(user.clone())).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains(&hash));
        let raw = serde_json::to_string(&user).unwrap();
        assert!(!raw.contains("password_hash"));
    }
}
