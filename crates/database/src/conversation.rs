//! Conversation state persistence.
//!
//! Every bot-side mutation goes through [`update_guarded`], a conditional
//! write keyed on the step the caller read. Two racing deliveries for the
//! same user cannot both win; the loser observes `false` and re-reads.

use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{BirthTimeKind, CollectedProfile, Conversation, ServiceType, Step};

/// Raw row shape: the navigation stack is stored as a JSON array of step
/// names.
#[derive(Debug, FromRow)]
struct ConversationRow {
    id: String,
    user_id: String,
    current_step: Step,
    service_type: ServiceType,
    nav_stack: String,
    full_name: Option<String>,
    dob: Option<String>,
    birth_time_kind: Option<BirthTimeKind>,
    birth_time_value: Option<String>,
    birth_place: Option<String>,
    current_location: Option<String>,
    gender: Option<String>,
    updated_at: String,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        let nav_stack = serde_json::from_str(&row.nav_stack).unwrap_or_else(|e| {
            tracing::warn!(conversation = %row.id, error = %e, "invalid nav_stack, resetting");
            Vec::new()
        });

        Conversation {
            id: row.id,
            user_id: row.user_id,
            current_step: row.current_step,
            service_type: row.service_type,
            nav_stack,
            profile: CollectedProfile {
                full_name: row.full_name,
                dob: row.dob,
                birth_time_kind: row.birth_time_kind,
                birth_time_value: row.birth_time_value,
                birth_place: row.birth_place,
                current_location: row.current_location,
                gender: row.gender,
            },
            updated_at: row.updated_at,
        }
    }
}

/// A partial conversation update. `None` fields are left untouched; profile
/// fields only ever accumulate, so none of them can be cleared here.
#[derive(Debug, Clone, Default)]
pub struct ConversationChanges {
    pub current_step: Option<Step>,
    pub service_type: Option<ServiceType>,
    pub nav_stack: Option<Vec<Step>>,
    pub full_name: Option<String>,
    pub dob: Option<String>,
    pub birth_time_kind: Option<BirthTimeKind>,
    pub birth_time_value: Option<String>,
    pub birth_place: Option<String>,
    pub current_location: Option<String>,
    pub gender: Option<String>,
}

const CONVERSATION_COLUMNS: &str = "id, user_id, current_step, service_type, nav_stack, \
     full_name, dob, birth_time_kind, birth_time_value, birth_place, current_location, \
     gender, updated_at";

/// Get a user's conversation, if one exists.
pub async fn get_by_user_id(pool: &SqlitePool, user_id: &str) -> Result<Option<Conversation>> {
    let row = sqlx::query_as::<_, ConversationRow>(&format!(
        r#"
        SELECT {CONVERSATION_COLUMNS}
        FROM conversations
        WHERE user_id = ?
        "#
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Conversation::from))
}

/// Get a conversation by ID.
pub async fn get(pool: &SqlitePool, id: &str) -> Result<Conversation> {
    let row = sqlx::query_as::<_, ConversationRow>(&format!(
        r#"
        SELECT {CONVERSATION_COLUMNS}
        FROM conversations
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Conversation::from).ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: id.to_string(),
    })
}

/// Create a conversation for a user at the given step, with an empty
/// profile and an empty navigation stack.
pub async fn create(pool: &SqlitePool, user_id: &str, step: Step) -> Result<Conversation> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO conversations (id, user_id, current_step)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(step)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Conversation",
                    id: user_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    get(pool, &id).await
}

/// Apply a partial update in one atomic write, conditioned on the step the
/// caller read. Returns `true` if this write won; `false` means a concurrent
/// delivery moved the conversation first and nothing was changed.
pub async fn update_guarded(
    pool: &SqlitePool,
    id: &str,
    expected_step: Step,
    changes: &ConversationChanges,
) -> Result<bool> {
    let nav_stack_json = changes
        .nav_stack
        .as_ref()
        .map(|stack| serde_json::to_string(stack).unwrap_or_else(|_| "[]".to_string()));

    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET current_step = COALESCE(?, current_step),
            service_type = COALESCE(?, service_type),
            nav_stack = COALESCE(?, nav_stack),
            full_name = COALESCE(?, full_name),
            dob = COALESCE(?, dob),
            birth_time_kind = COALESCE(?, birth_time_kind),
            birth_time_value = COALESCE(?, birth_time_value),
            birth_place = COALESCE(?, birth_place),
            current_location = COALESCE(?, current_location),
            gender = COALESCE(?, gender),
            updated_at = datetime('now')
        WHERE id = ? AND current_step = ?
        "#,
    )
    .bind(changes.current_step)
    .bind(changes.service_type)
    .bind(nav_stack_json)
    .bind(changes.full_name.as_deref())
    .bind(changes.dob.as_deref())
    .bind(changes.birth_time_kind)
    .bind(changes.birth_time_value.as_deref())
    .bind(changes.birth_place.as_deref())
    .bind(changes.current_location.as_deref())
    .bind(changes.gender.as_deref())
    .bind(id)
    .bind(expected_step)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Set the current step unconditionally. Reserved for the human-review path,
/// which owns the terminal transitions.
pub async fn set_step(pool: &SqlitePool, id: &str, step: Step) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET current_step = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(step)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        });
    }

    Ok(())
}
