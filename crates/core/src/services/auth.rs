//! Authentication service: accounts, passwords and session tokens.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use bailiff_common::{AppError, AppResult, IdGenerator, config::AuthConfig};
use bailiff_db::{
    entities::user::{self, UserRole},
    repositories::UserRepository,
};

/// Claims carried in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

/// Input for creating an account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,

    pub role: UserRole,

    #[validate(length(max = 32))]
    pub badge_number: Option<String>,

    #[validate(length(max = 128))]
    pub police_station: Option<String>,
}

/// Input for signing in.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// A signed-in user and their token.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: user::Model,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl: Duration,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub fn new(user_repo: UserRepository, config: &AuthConfig) -> Self {
        Self {
            user_repo,
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: Duration::hours(config.token_ttl_hours),
            id_gen: IdGenerator::new(),
        }
    }

    /// Session lifetime, for the cookie max-age.
    #[must_use]
    pub const fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Create an account.
    ///
    /// Admins may create any role and liaison officers may enrol witnesses.
    /// Without a caller, only the first admin can be created.
    pub async fn register(
        &self,
        actor: Option<&user::Model>,
        input: RegisterInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        match actor.map(|a| a.role) {
            Some(UserRole::Admin) => {}
            Some(UserRole::LiaisonOfficer) if input.role == UserRole::Witness => {}
            Some(_) => {
                return Err(AppError::Forbidden(
                    "Not allowed to create this kind of account".to_string(),
                ));
            }
            None => {
                if input.role != UserRole::Admin || !self.user_repo.find_admins().await?.is_empty()
                {
                    return Err(AppError::Forbidden(
                        "Accounts are created by an administrator".to_string(),
                    ));
                }
            }
        }

        let email = input.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            phone: Set(input.phone.filter(|p| !p.trim().is_empty())),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(input.role),
            badge_number: Set(input.badge_number),
            police_station: Set(input.police_station),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, role = ?user.role, "User registered");
        Ok(user)
    }

    /// Check credentials and issue a session token.
    pub async fn login(&self, input: LoginInput) -> AppResult<Session> {
        input.validate()?;

        let user = self
            .user_repo
            .find_by_email(input.email.trim())
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Rejected login");
            return Err(AppError::Unauthorized);
        }

        let token = self.issue_token(&user)?;
        Ok(Session { token, user })
    }

    /// Sign a session token for `user`.
    pub fn issue_token(&self, user: &user::Model) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Decode and check a session token.
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
    }

    /// Resolve a token to an active user.
    pub async fn authenticate(&self, token: &str) -> AppResult<user::Model> {
        let claims = self.verify_token(token)?;
        self.user_repo
            .find_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::Unauthorized)
    }

    /// List users, optionally by role.
    pub async fn list_users(
        &self,
        role: Option<UserRole>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        self.user_repo.list(role, limit.min(100), offset).await
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
