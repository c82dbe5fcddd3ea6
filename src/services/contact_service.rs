use uuid::Uuid;

use crate::{
    dto::contacts::{ContactList, CreateContactRequest, UpdateContactRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Contact,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_contacts(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ContactList>> {
    let items: Vec<Contact> =
        sqlx::query_as("SELECT * FROM contacts WHERE user_id = $1 ORDER BY city, street")
            .bind(user.user_id)
            .fetch_all(&state.pool)
            .await?;
    Ok(ApiResponse::success(
        "OK",
        ContactList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_contact(
    state: &AppState,
    user: &AuthUser,
    payload: CreateContactRequest,
) -> AppResult<ApiResponse<Contact>> {
    for (field, value) in [
        ("city", &payload.city),
        ("street", &payload.street),
        ("phone", &payload.phone),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} must not be empty")));
        }
    }

    let contact: Contact = sqlx::query_as(
        r#"
        INSERT INTO contacts (id, user_id, city, street, house, apartment, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.city)
    .bind(payload.street)
    .bind(payload.house)
    .bind(payload.apartment)
    .bind(payload.phone)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Contact created", contact, None))
}

pub async fn update_contact(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateContactRequest,
) -> AppResult<ApiResponse<Contact>> {
    let existing: Option<Contact> =
        sqlx::query_as("SELECT * FROM contacts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;
    let existing = existing.ok_or(AppError::NotFound)?;

    let contact: Contact = sqlx::query_as(
        r#"
        UPDATE contacts
        SET city = $3, street = $4, house = $5, apartment = $6, phone = $7
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user.user_id)
    .bind(payload.city.unwrap_or(existing.city))
    .bind(payload.street.unwrap_or(existing.street))
    .bind(payload.house.unwrap_or(existing.house))
    .bind(payload.apartment.unwrap_or(existing.apartment))
    .bind(payload.phone.unwrap_or(existing.phone))
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Contact updated", contact, None))
}

pub async fn delete_contact(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Contact deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
