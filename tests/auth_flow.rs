use axum_procurement_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::auth::{
        ChangeRoleRequest, ConfirmEmailRequest, LoginRequest, PasswordResetConfirmRequest,
        PasswordResetRequest, RegisterRequest, UpdateProfileRequest,
    },
    error::AppError,
    events::{EventSender, NotificationEvent},
    middleware::auth::AuthUser,
    services::auth_service,
    state::AppState,
};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

fn test_database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

async fn setup_state(
    database_url: &str,
) -> anyhow::Result<(AppState, UnboundedReceiver<NotificationEvent>)> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(database_url).await?;
    let (events, rx) = EventSender::channel();
    // Login tests need a signing secret; the value itself is irrelevant.
    unsafe {
        std::env::set_var("JWT_SECRET", "integration-test-secret");
    }
    Ok((AppState { pool, orm, events }, rx))
}

fn register_request(email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.into(),
        password: password.into(),
        first_name: "Ivan".into(),
        last_name: "Petrov".into(),
        company: "Retail Co".into(),
        position: "Buyer".into(),
        role: None,
    }
}

fn unique_email() -> String {
    format!("user-{}@example.com", Uuid::new_v4().simple())
}

#[tokio::test]
async fn register_confirm_and_login_flow() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, mut rx) = setup_state(&database_url).await?;

    let email = unique_email();
    let user = auth_service::register_user(&state, register_request(&email, "s3cret-enough"))
        .await?
        .data
        .expect("user");
    assert_eq!(user.role, "buyer");
    assert!(!user.is_active);

    // The account stays locked out until the emailed token comes back.
    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "s3cret-enough".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let token = match rx.recv().await.expect("registration event") {
        NotificationEvent::UserRegistered {
            email: to,
            token_key,
            ..
        } => {
            assert_eq!(to, email);
            token_key
        }
        other => panic!("unexpected event {other:?}"),
    };

    auth_service::confirm_email(
        &state,
        ConfirmEmailRequest {
            email: email.clone(),
            token,
        },
    )
    .await?;

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "s3cret-enough".into(),
        },
    )
    .await?
    .data
    .expect("login response");
    assert!(login.token.starts_with("Bearer "));

    // Wrong password after activation is still rejected.
    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email,
            password: "wrong-password".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn reissued_reset_token_invalidates_previous() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, mut rx) = setup_state(&database_url).await?;

    let email = unique_email();
    auth_service::register_user(&state, register_request(&email, "original-pass"))
        .await?;
    let confirm_token = match rx.recv().await.expect("registration event") {
        NotificationEvent::UserRegistered { token_key, .. } => token_key,
        other => panic!("unexpected event {other:?}"),
    };
    auth_service::confirm_email(
        &state,
        ConfirmEmailRequest {
            email: email.clone(),
            token: confirm_token,
        },
    )
    .await?;

    let mut reset_keys = Vec::new();
    for _ in 0..2 {
        auth_service::request_password_reset(
            &state,
            PasswordResetRequest {
                email: email.clone(),
            },
        )
        .await?;
        match rx.recv().await.expect("reset event") {
            NotificationEvent::PasswordResetRequested { token_key, .. } => {
                reset_keys.push(token_key)
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_ne!(reset_keys[0], reset_keys[1]);

    // The first key died the moment the second was issued.
    let err = auth_service::reset_password(
        &state,
        PasswordResetConfirmRequest {
            email: email.clone(),
            token: reset_keys[0].clone(),
            password: "brand-new-pass".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    auth_service::reset_password(
        &state,
        PasswordResetConfirmRequest {
            email: email.clone(),
            token: reset_keys[1].clone(),
            password: "brand-new-pass".into(),
        },
    )
    .await?;

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "brand-new-pass".into(),
        },
    )
    .await?;
    assert!(login.data.is_some());

    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email,
            password: "original-pass".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn profile_update_and_role_switch() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, mut rx) = setup_state(&database_url).await?;

    let email = unique_email();
    let user = auth_service::register_user(&state, register_request(&email, "first-password"))
        .await?
        .data
        .expect("user");
    let token = match rx.recv().await.expect("registration event") {
        NotificationEvent::UserRegistered { token_key, .. } => token_key,
        other => panic!("unexpected event {other:?}"),
    };
    auth_service::confirm_email(
        &state,
        ConfirmEmailRequest {
            email: email.clone(),
            token,
        },
    )
    .await?;

    let auth = AuthUser {
        user_id: user.id,
        role: user.role.clone(),
    };

    let profile = auth_service::get_profile(&state, &auth)
        .await?
        .data
        .expect("profile");
    assert_eq!(profile.email, email);
    assert_eq!(profile.company, "Retail Co");

    // Partial update: untouched fields survive, the password is rehashed.
    let updated = auth_service::update_profile(
        &state,
        &auth,
        UpdateProfileRequest {
            first_name: None,
            last_name: None,
            company: Some("Wholesale Co".into()),
            position: None,
            password: Some("second-password".into()),
        },
    )
    .await?
    .data
    .expect("updated profile");
    assert_eq!(updated.company, "Wholesale Co");
    assert_eq!(updated.first_name, "Ivan");

    auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "second-password".into(),
        },
    )
    .await?;
    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "first-password".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // The switch to a supplier account requires the current password.
    let err = auth_service::change_role(
        &state,
        &auth,
        ChangeRoleRequest {
            password: "first-password".into(),
            role: "shop".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let switched = auth_service::change_role(
        &state,
        &auth,
        ChangeRoleRequest {
            password: "second-password".into(),
            role: "shop".into(),
        },
    )
    .await?
    .data
    .expect("switched user");
    assert_eq!(switched.role, "shop");

    let err = auth_service::change_role(
        &state,
        &auth,
        ChangeRoleRequest {
            password: "second-password".into(),
            role: "admin".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Empty strings never overwrite profile fields.
    let err = auth_service::update_profile(
        &state,
        &auth,
        UpdateProfileRequest {
            first_name: Some("  ".into()),
            last_name: None,
            company: None,
            position: None,
            password: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn registration_rejects_bad_input() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let (state, _rx) = setup_state(&database_url).await?;

    let email = unique_email();
    auth_service::register_user(&state, register_request(&email, "good-enough"))
        .await?;
    let err = auth_service::register_user(&state, register_request(&email, "good-enough"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = auth_service::register_user(&state, register_request(&unique_email(), "short"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Nobody registers themselves as admin.
    let mut payload = register_request(&unique_email(), "good-enough");
    payload.role = Some("admin".into());
    let err = auth_service::register_user(&state, payload).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}
