use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{
        ChangeRoleRequest, Claims, ConfirmEmailRequest, LoginRequest, LoginResponse,
        PasswordResetConfirmRequest, PasswordResetRequest, RegisterRequest, UpdateProfileRequest,
    },
    error::{AppError, AppResult},
    events::NotificationEvent,
    middleware::auth::{AuthUser, ROLE_BUYER, ROLE_SHOP},
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const PURPOSE_CONFIRM: &str = "confirm_email";
const PURPOSE_RESET: &str = "password_reset";

/// Create an inactive account and issue its email-confirmation token.
/// The token travels to the user via the notification dispatcher, after the
/// account row is committed.
pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let role = payload.role.as_deref().unwrap_or(ROLE_BUYER);
    if role != ROLE_BUYER && role != ROLE_SHOP {
        return Err(AppError::Validation(format!("unknown role {role:?}")));
    }
    for (field, value) in [
        ("email", &payload.email),
        ("first_name", &payload.first_name),
        ("last_name", &payload.last_name),
        ("company", &payload.company),
        ("position", &payload.position),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} must not be empty")));
        }
    }
    validate_password(&payload.password)?;

    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(payload.email.as_str())
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::Validation("Email is already taken".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let id = Uuid::new_v4();

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, company, position, role, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.email.as_str())
    .bind(password_hash)
    .bind(payload.first_name.as_str())
    .bind(payload.last_name.as_str())
    .bind(payload.company.as_str())
    .bind(payload.position.as_str())
    .bind(role)
    .fetch_one(&state.pool)
    .await?;

    let token_key = issue_token(state, user.id, PURPOSE_CONFIRM).await?;
    state.events.emit(NotificationEvent::UserRegistered {
        user_id: user.id,
        email: user.email.clone(),
        token_key,
    });

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "role": role })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    Ok(ApiResponse::success("User created", user, None))
}

/// Activate the account named by a live confirmation token; the token is
/// consumed on success.
pub async fn confirm_email(
    state: &AppState,
    payload: ConfirmEmailRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let row: Option<(Uuid, Uuid)> = sqlx::query_as(
        r#"
        SELECT t.id, t.user_id
        FROM confirm_email_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE u.email = $1 AND t.key = $2 AND t.purpose = $3
        "#,
    )
    .bind(payload.email.as_str())
    .bind(payload.token.as_str())
    .bind(PURPOSE_CONFIRM)
    .fetch_optional(&state.pool)
    .await?;
    let (token_id, user_id) = row.ok_or(AppError::NotFound)?;

    sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(&state.pool)
        .await?;
    sqlx::query("DELETE FROM confirm_email_tokens WHERE id = $1")
        .bind(token_id)
        .execute(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "Email confirmed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;

    #[derive(sqlx::FromRow)]
    struct UserRow {
        id: Uuid,
        password_hash: String,
        role: String,
        is_active: bool,
    }
    let user: Option<UserRow> =
        sqlx::query_as("SELECT id, password_hash, role, is_active FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(&state.pool)
            .await?;
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Validation("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Validation("Invalid email or password".into()));
    }
    if !user.is_active {
        return Err(AppError::Forbidden);
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_profile(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let user = user.ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", user, Some(Meta::empty())))
}

/// Partial update of the caller's own profile. A new password is validated
/// and rehashed; email and role are not editable here.
pub async fn update_profile(
    state: &AppState,
    auth: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    for (field, value) in [
        ("first_name", &payload.first_name),
        ("last_name", &payload.last_name),
        ("company", &payload.company),
        ("position", &payload.position),
    ] {
        if let Some(value) = value {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} must not be empty")));
            }
        }
    }
    if let Some(password) = &payload.password {
        validate_password(password)?;
    }

    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let existing = existing.ok_or(AppError::NotFound)?;

    let user: User = sqlx::query_as(
        r#"
        UPDATE users
        SET first_name = $2, last_name = $3, company = $4, position = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.first_name.unwrap_or(existing.first_name))
    .bind(payload.last_name.unwrap_or(existing.last_name))
    .bind(payload.company.unwrap_or(existing.company))
    .bind(payload.position.unwrap_or(existing.position))
    .fetch_one(&state.pool)
    .await?;

    if let Some(password) = &payload.password {
        let password_hash = hash_password(password)?;
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(auth.user_id)
            .bind(password_hash)
            .execute(&state.pool)
            .await?;
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(auth.user_id),
        "profile_update",
        Some("users"),
        Some(serde_json::json!({ "password_changed": payload.password.is_some() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Profile updated", user, None))
}

/// Switch the caller between `buyer` and `shop` after re-verifying their
/// password. Already-issued JWTs keep the old role claim until they expire.
pub async fn change_role(
    state: &AppState,
    auth: &AuthUser,
    payload: ChangeRoleRequest,
) -> AppResult<ApiResponse<User>> {
    if payload.role != ROLE_BUYER && payload.role != ROLE_SHOP {
        return Err(AppError::Validation(format!(
            "unknown role {:?}",
            payload.role
        )));
    }

    let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let (password_hash,) = row.ok_or(AppError::NotFound)?;
    let parsed_hash = PasswordHash::new(&password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Validation("Incorrect password".into()));
    }

    let user: User = sqlx::query_as("UPDATE users SET role = $2 WHERE id = $1 RETURNING *")
        .bind(auth.user_id)
        .bind(payload.role.as_str())
        .fetch_one(&state.pool)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(auth.user_id),
        "role_change",
        Some("users"),
        Some(serde_json::json!({ "role": user.role })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Role updated", user, None))
}

/// Issue a password-reset token. Re-requesting replaces the previous token,
/// so only the newest one confirms.
pub async fn request_password_reset(
    state: &AppState,
    payload: PasswordResetRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, email FROM users WHERE email = $1")
            .bind(payload.email.as_str())
            .fetch_optional(&state.pool)
            .await?;
    let (user_id, email) = user.ok_or(AppError::NotFound)?;

    let token_key = issue_token(state, user_id, PURPOSE_RESET).await?;
    state.events.emit(NotificationEvent::PasswordResetRequested {
        user_id,
        email,
        token_key,
    });

    Ok(ApiResponse::success(
        "Password reset token issued",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: PasswordResetConfirmRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    validate_password(&payload.password)?;

    let row: Option<(Uuid, Uuid)> = sqlx::query_as(
        r#"
        SELECT t.id, t.user_id
        FROM confirm_email_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE u.email = $1 AND t.key = $2 AND t.purpose = $3
        "#,
    )
    .bind(payload.email.as_str())
    .bind(payload.token.as_str())
    .bind(PURPOSE_RESET)
    .fetch_optional(&state.pool)
    .await?;
    let (token_id, user_id) = row.ok_or(AppError::NotFound)?;

    let password_hash = hash_password(&payload.password)?;
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(&state.pool)
        .await?;
    sqlx::query("DELETE FROM confirm_email_tokens WHERE id = $1")
        .bind(token_id)
        .execute(&state.pool)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user_id),
        "password_reset",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Password updated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Replace any live token for (user, purpose) with a fresh one and return
/// its key. The old key stops working the moment this commits.
async fn issue_token(state: &AppState, user_id: Uuid, purpose: &str) -> AppResult<String> {
    let key = Uuid::new_v4().simple().to_string();
    let mut txn = state.pool.begin().await?;
    sqlx::query("DELETE FROM confirm_email_tokens WHERE user_id = $1 AND purpose = $2")
        .bind(user_id)
        .bind(purpose)
        .execute(&mut *txn)
        .await?;
    sqlx::query(
        "INSERT INTO confirm_email_tokens (id, user_id, purpose, key) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(purpose)
    .bind(key.as_str())
    .execute(&mut *txn)
    .await?;
    txn.commit().await?;
    Ok(key)
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}
