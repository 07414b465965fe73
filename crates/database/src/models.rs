//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a user.
///
/// Moves forward along NEW → AWAITING_PAYMENT → PAYMENT_SUBMITTED →
/// VERIFIED → COMPLETED. The only backward transition is the operator
/// rejection, PAYMENT_SUBMITTED → AWAITING_PAYMENT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    New,
    AwaitingPayment,
    PaymentSubmitted,
    Verified,
    Completed,
}

impl UserStatus {
    /// Parse a status from its stored form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(UserStatus::New),
            "AWAITING_PAYMENT" => Some(UserStatus::AwaitingPayment),
            "PAYMENT_SUBMITTED" => Some(UserStatus::PaymentSubmitted),
            "VERIFIED" => Some(UserStatus::Verified),
            "COMPLETED" => Some(UserStatus::Completed),
            _ => None,
        }
    }

    /// The stored form of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::New => "NEW",
            UserStatus::AwaitingPayment => "AWAITING_PAYMENT",
            UserStatus::PaymentSubmitted => "PAYMENT_SUBMITTED",
            UserStatus::Verified => "VERIFIED",
            UserStatus::Completed => "COMPLETED",
        }
    }
}

/// The two offered services. Selected early in the conversation and
/// affecting prompt text throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    LifeForecast,
    DestinyReadings,
}

impl ServiceType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "life_forecast" => Some(ServiceType::LifeForecast),
            "destiny_readings" => Some(ServiceType::DestinyReadings),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::LifeForecast => "life_forecast",
            ServiceType::DestinyReadings => "destiny_readings",
        }
    }
}

impl Default for ServiceType {
    fn default() -> Self {
        ServiceType::LifeForecast
    }
}

/// A point in the conversation flow. Persisted as the conversation's
/// `current_step` and, in departed form, on the navigation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    Welcome,
    AskProceed,
    FaqMenu,
    /// Legacy step kept so conversations stored before the options screen
    /// absorbed the confidentiality notice still load.
    Confidentiality,
    Options,
    WaitingPayment,
    PaymentIssueMenu,
    CollectFullName,
    CollectDob,
    CollectBirthTime,
    CollectBirthTimeExactValue,
    CollectBirthTimeApproxValue,
    CollectBirthPlace,
    CollectCurrentLocation,
    CollectGender,
    AwaitingVerification,
    VerifiedNotified,
    Completed,
}

/// How the user reported their time of birth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub enum BirthTimeKind {
    Exact,
    Approximate,
    Unknown,
}

/// Why a payment was rejected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    InvalidProof,
    Underpaid,
}

/// A chat user, identified by WhatsApp phone address.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub phone: String,
    pub status: UserStatus,
    pub selected_plan: Option<String>,
    pub service_type: ServiceType,
    pub reading_sent: bool,
    pub reading_sent_at: Option<String>,
    pub reading_send_error: Option<String>,
    pub reading_outcome_text: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Profile answers gathered across the collection steps.
///
/// Every field is optional: the payment-screenshot handler scans for the
/// first missing one to decide where collection resumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedProfile {
    pub full_name: Option<String>,
    pub dob: Option<String>,
    pub birth_time_kind: Option<BirthTimeKind>,
    pub birth_time_value: Option<String>,
    pub birth_place: Option<String>,
    pub current_location: Option<String>,
    pub gender: Option<String>,
}

/// A user's conversation state: one row per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub current_step: Step,
    pub service_type: ServiceType,
    /// Steps already departed from, oldest first. Never contains
    /// `current_step`.
    pub nav_stack: Vec<Step>,
    pub profile: CollectedProfile,
    pub updated_at: String,
}

/// A payment evidence row. At most one per user; resubmissions overwrite.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub screenshot_url: String,
    pub verified: bool,
    pub service_type: ServiceType,
    pub rejection_reason: Option<RejectionReason>,
    pub rejection_note: Option<String>,
    pub received_amount_ghs: Option<f64>,
    pub expected_amount_ghs: Option<f64>,
    pub verified_notified: bool,
    pub notify_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// An unverified payment joined with its user, for the review queue.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PaymentWithUser {
    pub id: String,
    pub user_id: String,
    pub screenshot_url: String,
    pub verified: bool,
    pub service_type: ServiceType,
    pub rejection_reason: Option<RejectionReason>,
    pub rejection_note: Option<String>,
    pub received_amount_ghs: Option<f64>,
    pub expected_amount_ghs: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
    pub phone: String,
    pub selected_plan: Option<String>,
    pub user_status: UserStatus,
}

/// An append-only audit record of a screenshot submission.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PaymentLog {
    pub id: String,
    pub user_id: String,
    pub payment_id: String,
    pub screenshot_url: String,
    pub service_type: ServiceType,
    pub created_at: String,
}

/// A completed handoff: profile collected and payment on file. Drives the
/// at-most-once operator notification.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub payment_id: String,
    pub admin_notified: bool,
    pub admin_notified_at: Option<String>,
    pub created_at: String,
}
