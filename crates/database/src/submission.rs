//! Submission handoff records.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::Submission;

const SUBMISSION_COLUMNS: &str =
    "id, user_id, conversation_id, payment_id, admin_notified, admin_notified_at, created_at";

/// Create a submission linking a user, conversation and payment.
pub async fn create(
    pool: &SqlitePool,
    user_id: &str,
    conversation_id: &str,
    payment_id: &str,
) -> Result<Submission> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO submissions (id, user_id, conversation_id, payment_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(conversation_id)
    .bind(payment_id)
    .execute(pool)
    .await?;

    get(pool, &id).await
}

/// Get a submission by ID.
pub async fn get(pool: &SqlitePool, id: &str) -> Result<Submission> {
    sqlx::query_as::<_, Submission>(&format!(
        r#"
        SELECT {SUBMISSION_COLUMNS}
        FROM submissions
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Submission",
        id: id.to_string(),
    })
}

/// Flip the notified flag after a successful operator notification.
pub async fn mark_admin_notified(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET admin_notified = 1, admin_notified_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Submission",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// List submissions whose operator notification has not gone out yet,
/// oldest first.
pub async fn list_unnotified(pool: &SqlitePool) -> Result<Vec<Submission>> {
    let submissions = sqlx::query_as::<_, Submission>(&format!(
        r#"
        SELECT {SUBMISSION_COLUMNS}
        FROM submissions
        WHERE admin_notified = 0
        ORDER BY created_at ASC
        "#
    ))
    .fetch_all(pool)
    .await?;

    Ok(submissions)
}
