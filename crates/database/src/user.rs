//! User CRUD operations.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{ServiceType, User, UserStatus};

const USER_COLUMNS: &str = "id, phone, status, selected_plan, service_type, reading_sent, \
     reading_sent_at, reading_send_error, reading_outcome_text, created_at, updated_at";

/// Get the user for a phone address, creating a fresh NEW user if none
/// exists. Concurrent first messages from the same number are resolved by
/// the unique phone constraint: the loser re-reads the winner's row.
pub async fn get_or_create_by_phone(pool: &SqlitePool, phone: &str) -> Result<User> {
    if let Some(user) = get_by_phone(pool, phone).await? {
        return Ok(user);
    }

    let id = Uuid::new_v4().to_string();
    let inserted = sqlx::query(
        r#"
        INSERT INTO users (id, phone)
        VALUES (?, ?)
        "#,
    )
    .bind(&id)
    .bind(phone)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
            tracing::debug!(phone, "concurrent user creation, re-reading");
        }
        Err(e) => return Err(DatabaseError::Sqlx(e)),
    }

    get_by_phone(pool, phone).await?.ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: phone.to_string(),
    })
}

/// Get a user by phone address, if one exists.
pub async fn get_by_phone(pool: &SqlitePool, phone: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE phone = ?
        "#
    ))
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Update a user's lifecycle status, and optionally the selected plan and
/// service type. Fields passed as `None` are left untouched.
pub async fn update_status(
    pool: &SqlitePool,
    id: &str,
    status: UserStatus,
    selected_plan: Option<&str>,
    service_type: Option<ServiceType>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET status = ?,
            selected_plan = COALESCE(?, selected_plan),
            service_type = COALESCE(?, service_type),
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(selected_plan)
    .bind(service_type)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// List users, newest first, optionally filtered by status and service type.
pub async fn list_users(
    pool: &SqlitePool,
    status: Option<UserStatus>,
    service_type: Option<ServiceType>,
) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE (?1 IS NULL OR status = ?1)
          AND (?2 IS NULL OR service_type = ?2)
        ORDER BY created_at DESC
        "#
    ))
    .bind(status)
    .bind(service_type)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Store the reading outcome text without marking it delivered.
pub async fn set_reading_outcome(pool: &SqlitePool, id: &str, text: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET reading_outcome_text = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(text)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Mark the reading outcome as delivered, clearing any prior send error.
pub async fn mark_reading_sent(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET reading_sent = 1,
            reading_sent_at = datetime('now'),
            reading_send_error = NULL,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a failed outcome delivery. The outcome text stays persisted so the
/// operator can retry.
pub async fn record_reading_send_error(pool: &SqlitePool, id: &str, error: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET reading_send_error = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count users grouped by status.
pub async fn count_by_status(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT status, COUNT(*) as count
        FROM users
        GROUP BY status
        ORDER BY count DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
