use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{NewUser, PublicUser, User},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Bearer token payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenManager {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Checks signature and expiry
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AppError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Loose shape check: one `@`, something before it, a dot after it
pub fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn validate_new_password(password: &str, confirmation: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password != confirmation {
        return Err(AppError::InvalidInput("Passwords do not match".to_string()));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password_new: String,
    pub password_confirm: String,
}

/// A token together with the user it was issued for
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

fn respond(tokens: &TokenManager, user: &User) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        token: tokens.issue(user.id)?,
        user: PublicUser::from(user),
    })
}

/// Registers a user with the initial taste profile and signs them in
pub async fn signup(
    store: &dyn Store,
    tokens: &TokenManager,
    request: SignupRequest,
) -> AppResult<AuthResponse> {
    require("Username", &request.username)?;
    require("First name", &request.first_name)?;
    require("Last name", &request.last_name)?;
    if !is_email(request.email.trim()) {
        return Err(AppError::InvalidInput("Please provide a valid email".to_string()));
    }
    validate_new_password(&request.password, &request.password_confirm)?;

    let user = User::create(NewUser {
        username: request.username,
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        password_hash: hash_password(&request.password)?,
    });

    let user = store
        .insert_user(user)
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict("Email or username already exists".to_string())
            }
            other => other,
        })?;

    tracing::info!(user_id = %user.id, username = %user.username, "User signed up");
    respond(tokens, &user)
}

/// Signs in by username, or by email when the identifier looks like one
pub async fn login(
    store: &dyn Store,
    tokens: &TokenManager,
    request: LoginRequest,
) -> AppResult<AuthResponse> {
    let identifier = request.username_or_email.trim();
    let user = if is_email(identifier) {
        store.find_user_by_email(&identifier.to_lowercase()).await?
    } else {
        store.find_user_by_username(identifier).await?
    };

    match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => {
            tracing::info!(user_id = %user.id, "User logged in");
            respond(tokens, &user)
        }
        _ => Err(AppError::Unauthorized(
            "Incorrect username/email or password".to_string(),
        )),
    }
}

/// Resolves a bearer token to its user
///
/// 1. Signature and expiry must check out
/// 2. The user must still exist
/// 3. The password must not have changed since the token was issued
pub async fn authenticate(store: &dyn Store, tokens: &TokenManager, token: &str) -> AppResult<User> {
    let claims = tokens.verify(token)?;

    let user = store.get_user(claims.sub).await.map_err(|e| match e {
        AppError::NotFound(_) => AppError::Unauthorized("User no longer exists".to_string()),
        other => other,
    })?;

    if user.changed_password_after(claims.iat) {
        return Err(AppError::Unauthorized(
            "Password changed after token was issued".to_string(),
        ));
    }

    Ok(user)
}

/// Replaces the password after checking the current one; earlier tokens stop working
pub async fn update_password(
    store: &dyn Store,
    tokens: &TokenManager,
    user_id: Uuid,
    request: UpdatePasswordRequest,
) -> AppResult<AuthResponse> {
    let mut user = store.get_user(user_id).await?;
    if !verify_password(&request.password_current, &user.password_hash) {
        return Err(AppError::Unauthorized(
            "Your current password is wrong".to_string(),
        ));
    }
    validate_new_password(&request.password_new, &request.password_confirm)?;

    user.password_hash = hash_password(&request.password_new)?;
    // Backdated so the token issued below is still accepted
    user.password_changed_at = Some(Utc::now() - Duration::seconds(1));
    let user = store.update_user(&user).await?;

    tracing::info!(user_id = %user.id, "Password updated");
    respond(tokens, &user)
}
