//! Payment evidence persistence.
//!
//! One addressable payment per user: a resubmitted screenshot overwrites
//! the existing row and resets its verification state. Every submission is
//! also appended to the `payment_logs` audit table.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{Payment, PaymentLog, PaymentWithUser, RejectionReason, ServiceType};

const PAYMENT_COLUMNS: &str = "id, user_id, screenshot_url, verified, service_type, \
     rejection_reason, rejection_note, received_amount_ghs, expected_amount_ghs, \
     verified_notified, notify_error, created_at, updated_at";

/// Record payment evidence for a user. Overwrites the existing row
/// (resetting `verified` and all rejection fields) or inserts one if this is
/// the user's first submission, and appends an audit log entry. Returns the
/// payment ID.
pub async fn create_or_overwrite(
    pool: &SqlitePool,
    user_id: &str,
    screenshot_url: &str,
    service_type: ServiceType,
) -> Result<String> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE payments
        SET screenshot_url = ?,
            verified = 0,
            service_type = ?,
            rejection_reason = NULL,
            rejection_note = NULL,
            received_amount_ghs = NULL,
            expected_amount_ghs = NULL,
            updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(screenshot_url)
    .bind(service_type)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let payment_id = if updated.rows_affected() == 0 {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, screenshot_url, service_type)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(screenshot_url)
        .bind(service_type)
        .execute(&mut *tx)
        .await?;
        id
    } else {
        sqlx::query_scalar::<_, String>("SELECT id FROM payments WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?
    };

    sqlx::query(
        r#"
        INSERT INTO payment_logs (id, user_id, payment_id, screenshot_url, service_type)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&payment_id)
    .bind(screenshot_url)
    .bind(service_type)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(payment_id)
}

/// Get a payment by ID.
pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Payment> {
    sqlx::query_as::<_, Payment>(&format!(
        r#"
        SELECT {PAYMENT_COLUMNS}
        FROM payments
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Payment",
        id: id.to_string(),
    })
}

/// Get a user's current payment, if any.
pub async fn get_latest_by_user_id(pool: &SqlitePool, user_id: &str) -> Result<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
        r#"
        SELECT {PAYMENT_COLUMNS}
        FROM payments
        WHERE user_id = ?
        "#
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(payment)
}

/// Mark a user's payment verified, clearing every rejection field.
pub async fn verify_latest(pool: &SqlitePool, user_id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET verified = 1,
            rejection_reason = NULL,
            rejection_note = NULL,
            received_amount_ghs = NULL,
            expected_amount_ghs = NULL,
            updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Payment",
            id: user_id.to_string(),
        });
    }

    Ok(())
}

/// Reject a user's payment. Amounts are only meaningful for `Underpaid`.
pub async fn reject(
    pool: &SqlitePool,
    user_id: &str,
    reason: RejectionReason,
    note: Option<&str>,
    received_amount_ghs: Option<f64>,
    expected_amount_ghs: Option<f64>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET verified = 0,
            rejection_reason = ?,
            rejection_note = ?,
            received_amount_ghs = ?,
            expected_amount_ghs = ?,
            updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(reason)
    .bind(note)
    .bind(received_amount_ghs)
    .bind(expected_amount_ghs)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Payment",
            id: user_id.to_string(),
        });
    }

    Ok(())
}

/// List unverified payments with their users, newest activity first,
/// optionally filtered by service type.
pub async fn list_unverified(
    pool: &SqlitePool,
    service_type: Option<ServiceType>,
) -> Result<Vec<PaymentWithUser>> {
    let payments = sqlx::query_as::<_, PaymentWithUser>(
        r#"
        SELECT p.id, p.user_id, p.screenshot_url, p.verified, p.service_type,
               p.rejection_reason, p.rejection_note, p.received_amount_ghs,
               p.expected_amount_ghs, p.created_at, p.updated_at,
               u.phone, u.selected_plan, u.status AS user_status
        FROM payments p
        JOIN users u ON u.id = p.user_id
        WHERE p.verified = 0
          AND (?1 IS NULL OR p.service_type = ?1)
        ORDER BY p.updated_at DESC
        "#,
    )
    .bind(service_type)
    .fetch_all(pool)
    .await?;

    Ok(payments)
}

/// Record the outcome of the verified-notification send.
pub async fn mark_verified_notified(pool: &SqlitePool, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE payments
        SET verified_notified = 1, notify_error = NULL, updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a failed verified-notification send.
pub async fn record_notify_error(pool: &SqlitePool, user_id: &str, error: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE payments
        SET notify_error = ?, updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(error)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// List a user's audit log entries, oldest first.
pub async fn list_logs_by_user_id(pool: &SqlitePool, user_id: &str) -> Result<Vec<PaymentLog>> {
    let logs = sqlx::query_as::<_, PaymentLog>(
        r#"
        SELECT id, user_id, payment_id, screenshot_url, service_type, created_at
        FROM payment_logs
        WHERE user_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{user, Database};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn seeded_user(db: &Database) -> String {
        user::get_or_create_by_phone(db.pool(), "+233541234567")
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_resubmission_overwrites_single_row() {
        let db = test_db().await;
        let user_id = seeded_user(&db).await;

        let first = create_or_overwrite(
            db.pool(),
            &user_id,
            "https://api.twilio.com/media/1",
            ServiceType::LifeForecast,
        )
        .await
        .unwrap();

        let second = create_or_overwrite(
            db.pool(),
            &user_id,
            "https://api.twilio.com/media/2",
            ServiceType::LifeForecast,
        )
        .await
        .unwrap();

        // Same row, latest screenshot.
        assert_eq!(first, second);
        let payment = get_latest_by_user_id(db.pool(), &user_id).await.unwrap().unwrap();
        assert_eq!(payment.screenshot_url, "https://api.twilio.com/media/2");
        assert!(!payment.verified);

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);

        // But both submissions are in the audit log.
        let logs = list_logs_by_user_id(db.pool(), &user_id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].screenshot_url, "https://api.twilio.com/media/1");
        assert_eq!(logs[1].screenshot_url, "https://api.twilio.com/media/2");
    }

    #[tokio::test]
    async fn test_verify_clears_rejection_fields() {
        let db = test_db().await;
        let user_id = seeded_user(&db).await;
        create_or_overwrite(
            db.pool(),
            &user_id,
            "https://api.twilio.com/media/1",
            ServiceType::DestinyReadings,
        )
        .await
        .unwrap();

        reject(
            db.pool(),
            &user_id,
            RejectionReason::Underpaid,
            Some("short by half"),
            Some(900.0),
            Some(1800.0),
        )
        .await
        .unwrap();

        let payment = get_latest_by_user_id(db.pool(), &user_id).await.unwrap().unwrap();
        assert_eq!(payment.rejection_reason, Some(RejectionReason::Underpaid));
        assert_eq!(payment.received_amount_ghs, Some(900.0));
        assert_eq!(payment.expected_amount_ghs, Some(1800.0));

        verify_latest(db.pool(), &user_id).await.unwrap();
        let payment = get_latest_by_user_id(db.pool(), &user_id).await.unwrap().unwrap();
        assert!(payment.verified);
        assert!(payment.rejection_reason.is_none());
        assert!(payment.rejection_note.is_none());
        assert!(payment.received_amount_ghs.is_none());
        assert!(payment.expected_amount_ghs.is_none());
    }

    #[tokio::test]
    async fn test_resubmission_resets_rejection() {
        let db = test_db().await;
        let user_id = seeded_user(&db).await;
        create_or_overwrite(
            db.pool(),
            &user_id,
            "https://api.twilio.com/media/1",
            ServiceType::LifeForecast,
        )
        .await
        .unwrap();
        reject(db.pool(), &user_id, RejectionReason::InvalidProof, None, None, None)
            .await
            .unwrap();

        create_or_overwrite(
            db.pool(),
            &user_id,
            "https://api.twilio.com/media/2",
            ServiceType::LifeForecast,
        )
        .await
        .unwrap();

        let payment = get_latest_by_user_id(db.pool(), &user_id).await.unwrap().unwrap();
        assert!(payment.rejection_reason.is_none());
        assert!(!payment.verified);
    }

    #[tokio::test]
    async fn test_verify_without_payment_is_not_found() {
        let db = test_db().await;
        let user_id = seeded_user(&db).await;
        let result = verify_latest(db.pool(), &user_id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_unverified_filters_by_service() {
        let db = test_db().await;
        let a = user::get_or_create_by_phone(db.pool(), "+233540000001").await.unwrap();
        let b = user::get_or_create_by_phone(db.pool(), "+233540000002").await.unwrap();

        create_or_overwrite(db.pool(), &a.id, "https://api.twilio.com/media/a", ServiceType::LifeForecast)
            .await
            .unwrap();
        create_or_overwrite(db.pool(), &b.id, "https://api.twilio.com/media/b", ServiceType::DestinyReadings)
            .await
            .unwrap();
        verify_latest(db.pool(), &a.id).await.unwrap();

        let unverified = list_unverified(db.pool(), None).await.unwrap();
        assert_eq!(unverified.len(), 1);
        assert_eq!(unverified[0].user_id, b.id);
        assert_eq!(unverified[0].phone, "+233540000002");

        let life = list_unverified(db.pool(), Some(ServiceType::LifeForecast)).await.unwrap();
        assert!(life.is_empty());
    }
}
