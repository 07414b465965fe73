//! The conversation state machine.
//!
//! Each inbound message is one synchronous unit: read the user, read or
//! create the conversation, run the transition, write back, reply. Invalid
//! input never transitions; the step's own prompt is simply repeated.
//!
//! Writes go through the conversation store's guarded update, so two
//! deliveries racing for the same user cannot both move the conversation.
//! The loser re-reads and answers with the prompt for wherever the winner
//! left things.

use std::sync::{Arc, OnceLock};

use database::{
    conversation, payment, submission, user, BirthTimeKind, CollectedProfile, Conversation,
    ConversationChanges, Database, DatabaseError, ServiceType, Step, User, UserStatus,
};
use regex::Regex;
use tracing::{error, warn};

use crate::error::EngineError;
use crate::normalizer::{self, NormalizedMessage};
use crate::notify::{self, AdminNotifier};
use crate::prompts;

/// An inbound chat message event, as handed over by the webhook layer.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Sender phone address.
    pub from: String,
    /// Raw message body, if any.
    pub body: Option<String>,
    /// Number of attached media items.
    pub media_count: u32,
    /// URL of the first media item, if any.
    pub media_url: Option<String>,
}

/// The reply to hand back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReply {
    pub text: String,
}

impl BotReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Upper bound for menu/plan choices.
const MAX_CHOICE_LEN: usize = 20;
/// Upper bound for single-digit menu picks.
const MAX_MENU_LEN: usize = 2;
/// Upper bound for free-text profile answers.
const MAX_FIELD_LEN: usize = 200;

fn dob_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap())
}

fn exact_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i)(0[1-9]|1[0-2]):[0-5][0-9]\s?(AM|PM)$").unwrap())
}

fn is_life_forecast(lower: &str) -> bool {
    lower == "1" || lower == "proceed" || lower == "life forecast"
}

fn is_destiny_readings(lower: &str) -> bool {
    lower == "2" || lower == "destiny readings"
}

fn is_ask_question(lower: &str) -> bool {
    lower == "3" || lower == "ask a question"
}

/// Parse a plan choice, accepting numerals and common spellings.
pub fn parse_plan(lower: &str) -> Option<&'static str> {
    match lower {
        "1" | "1 year" | "1-year" | "one" | "one year" => Some("1 Year"),
        "3" | "3 years" | "3-year" | "three" | "three years" => Some("3 Years"),
        "5" | "5 years" | "5-year" | "five" | "five years" => Some("5 Years"),
        _ => None,
    }
}

/// A non-empty free-text answer within the length bound.
fn free_text(text: &str) -> Option<String> {
    if text.is_empty() || text.len() > MAX_FIELD_LEN {
        None
    } else {
        Some(text.to_string())
    }
}

/// The first profile field still missing, in collection order. Lets a user
/// who already answered some questions during an earlier aborted attempt
/// resume at the right place after resubmitting payment.
pub fn next_collection_step(profile: &CollectedProfile) -> Step {
    if profile.full_name.is_none() {
        return Step::CollectFullName;
    }
    if profile.dob.is_none() {
        return Step::CollectDob;
    }
    match (profile.birth_time_kind, &profile.birth_time_value) {
        (None, _) => return Step::CollectBirthTime,
        (Some(BirthTimeKind::Exact), None) => return Step::CollectBirthTimeExactValue,
        (Some(BirthTimeKind::Approximate), None) => return Step::CollectBirthTimeApproxValue,
        _ => {}
    }
    if profile.birth_place.is_none() {
        return Step::CollectBirthPlace;
    }
    if profile.current_location.is_none() {
        return Step::CollectCurrentLocation;
    }
    if profile.gender.is_none() {
        return Step::CollectGender;
    }
    Step::AwaitingVerification
}

/// The conversation engine. Collaborators are injected so tests can run it
/// against an in-memory store and a recording notifier.
pub struct Engine {
    db: Database,
    admin: Arc<dyn AdminNotifier>,
}

impl Engine {
    pub fn new(db: Database, admin: Arc<dyn AdminNotifier>) -> Self {
        Self { db, admin }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Process one inbound message and produce the reply.
    pub async fn handle_message(&self, msg: &InboundMessage) -> Result<BotReply, EngineError> {
        let pool = self.db.pool();

        let user = user::get_or_create_by_phone(pool, &msg.from).await?;
        let conv = match conversation::get_by_user_id(pool, &user.id).await? {
            Some(conv) => conv,
            None => match conversation::create(pool, &user.id, Step::Welcome).await {
                Ok(conv) => conv,
                // Duplicate delivery created it first; use that one.
                Err(DatabaseError::AlreadyExists { .. }) => conversation::get_by_user_id(pool, &user.id)
                    .await?
                    .ok_or(DatabaseError::NotFound {
                        entity: "Conversation",
                        id: user.id.clone(),
                    })?,
                Err(e) => return Err(e.into()),
            },
        };

        // Once the human workflow has closed the user out, the bot answers
        // with the fixed status prompt and touches nothing.
        match user.status {
            UserStatus::Completed => {
                return Ok(BotReply::new(prompts::completed(user.service_type)));
            }
            UserStatus::Verified => {
                return Ok(BotReply::new(prompts::verified(user.service_type)));
            }
            _ => {}
        }

        let norm = normalizer::normalize(msg.body.as_deref(), msg.media_count, msg.media_url.as_deref());

        if norm.is_menu_reset {
            return self.reset_to_menu(&conv).await;
        }
        if norm.is_back {
            return self.step_back(&conv).await;
        }
        if norm.has_media
            && matches!(conv.current_step, Step::WaitingPayment | Step::PaymentIssueMenu)
        {
            return self.handle_payment_screenshot(&user, &conv, &norm).await;
        }

        self.dispatch(&user, &conv, &norm).await
    }

    /// Hard reset: empty the navigation stack and return to the proceed menu.
    async fn reset_to_menu(&self, conv: &Conversation) -> Result<BotReply, EngineError> {
        let changes = ConversationChanges {
            current_step: Some(Step::AskProceed),
            nav_stack: Some(Vec::new()),
            ..Default::default()
        };
        if conversation::update_guarded(self.db.pool(), &conv.id, conv.current_step, &changes).await? {
            Ok(BotReply::new(prompts::ASK_PROCEED))
        } else {
            self.resync(conv).await
        }
    }

    /// Rewind one step. An empty stack behaves exactly like a menu reset.
    /// Only the position is rewound; anything collected in the revisited
    /// step stays.
    async fn step_back(&self, conv: &Conversation) -> Result<BotReply, EngineError> {
        let mut stack = conv.nav_stack.clone();
        let Some(previous) = stack.pop() else {
            return self.reset_to_menu(conv).await;
        };

        let changes = ConversationChanges {
            current_step: Some(previous),
            nav_stack: Some(stack),
            ..Default::default()
        };
        if conversation::update_guarded(self.db.pool(), &conv.id, conv.current_step, &changes).await? {
            Ok(BotReply::new(prompts::prompt_for(previous, conv.service_type)))
        } else {
            self.resync(conv).await
        }
    }

    /// Push the current step and move to `next` in one guarded write.
    /// Returns whether this write won the race.
    async fn try_advance(
        &self,
        conv: &Conversation,
        next: Step,
        mut changes: ConversationChanges,
    ) -> Result<bool, EngineError> {
        let mut stack = conv.nav_stack.clone();
        stack.push(conv.current_step);
        changes.current_step = Some(next);
        changes.nav_stack = Some(stack);

        Ok(conversation::update_guarded(self.db.pool(), &conv.id, conv.current_step, &changes).await?)
    }

    async fn advance(
        &self,
        conv: &Conversation,
        next: Step,
        changes: ConversationChanges,
        reply: String,
    ) -> Result<BotReply, EngineError> {
        if self.try_advance(conv, next, changes).await? {
            Ok(BotReply::new(reply))
        } else {
            self.resync(conv).await
        }
    }

    /// A concurrent delivery moved the conversation first. Reply with the
    /// prompt for wherever it is now, without mutating anything further.
    async fn resync(&self, conv: &Conversation) -> Result<BotReply, EngineError> {
        warn!(conversation = %conv.id, "lost conversation write race, replying with fresh prompt");
        let fresh = conversation::get(self.db.pool(), &conv.id).await?;
        Ok(BotReply::new(prompts::prompt_for(fresh.current_step, fresh.service_type)))
    }

    /// Record payment evidence and resume profile collection at the first
    /// missing field. Reprocessing the same screenshot overwrites the same
    /// payment row, so duplicate deliveries are harmless here.
    async fn handle_payment_screenshot(
        &self,
        user: &User,
        conv: &Conversation,
        norm: &NormalizedMessage,
    ) -> Result<BotReply, EngineError> {
        let pool = self.db.pool();
        let Some(url) = norm.media_url.as_deref() else {
            return Ok(BotReply::new(prompts::WAITING_PAYMENT));
        };

        payment::create_or_overwrite(pool, &user.id, url, conv.service_type).await?;
        user::update_status(pool, &user.id, UserStatus::PaymentSubmitted, None, None).await?;

        let next = next_collection_step(&conv.profile);
        self.advance(
            conv,
            next,
            ConversationChanges::default(),
            prompts::PAYMENT_RECEIVED.to_string(),
        )
        .await
    }

    /// Stamp the chosen service on both the user and the conversation, and
    /// show its options screen.
    async fn select_service(
        &self,
        user: &User,
        conv: &Conversation,
        service: ServiceType,
    ) -> Result<BotReply, EngineError> {
        user::update_status(self.db.pool(), &user.id, user.status, None, Some(service)).await?;
        let changes = ConversationChanges {
            service_type: Some(service),
            ..Default::default()
        };
        self.advance(conv, Step::Options, changes, prompts::options(service).to_string())
            .await
    }

    async fn dispatch(
        &self,
        user: &User,
        conv: &Conversation,
        norm: &NormalizedMessage,
    ) -> Result<BotReply, EngineError> {
        let pool = self.db.pool();

        match conv.current_step {
            Step::Welcome => {
                // First contact: move to the proceed menu. The welcome screen
                // is not a place "back" should return to, so the stack stays
                // empty.
                let changes = ConversationChanges {
                    current_step: Some(Step::AskProceed),
                    nav_stack: Some(Vec::new()),
                    ..Default::default()
                };
                if conversation::update_guarded(pool, &conv.id, Step::Welcome, &changes).await? {
                    Ok(BotReply::new(prompts::prompt_for(Step::Welcome, conv.service_type)))
                } else {
                    self.resync(conv).await
                }
            }

            Step::AskProceed => {
                if norm.text.is_empty() || norm.text.len() > MAX_CHOICE_LEN {
                    return Ok(BotReply::new(prompts::ASK_PROCEED));
                }
                if is_ask_question(&norm.lower) {
                    return self
                        .advance(
                            conv,
                            Step::FaqMenu,
                            ConversationChanges::default(),
                            prompts::FAQ_MENU.to_string(),
                        )
                        .await;
                }
                if is_life_forecast(&norm.lower) {
                    return self.select_service(user, conv, ServiceType::LifeForecast).await;
                }
                if is_destiny_readings(&norm.lower) {
                    return self.select_service(user, conv, ServiceType::DestinyReadings).await;
                }
                Ok(BotReply::new(prompts::ASK_PROCEED))
            }

            Step::FaqMenu => {
                if norm.text.is_empty() || norm.text.len() > MAX_MENU_LEN {
                    return Ok(BotReply::new(prompts::FAQ_MENU));
                }
                match norm.text.as_str() {
                    // Informational answers re-print the menu and stay put.
                    "1" => Ok(BotReply::new(format!("{}\n{}", prompts::FAQ_HOW_LONG, prompts::FAQ_MENU))),
                    "2" => Ok(BotReply::new(format!(
                        "{}\n{}",
                        prompts::FAQ_DETAILS_NEEDED,
                        prompts::FAQ_MENU
                    ))),
                    "3" => Ok(BotReply::new(format!(
                        "{}\n{}",
                        prompts::FAQ_BIRTH_TIME_UNKNOWN,
                        prompts::FAQ_MENU
                    ))),
                    "4" => Ok(BotReply::new(format!("{}\n{}", prompts::FAQ_REFUND, prompts::FAQ_MENU))),
                    "5" => self.select_service(user, conv, ServiceType::LifeForecast).await,
                    "6" => {
                        self.advance(
                            conv,
                            Step::AskProceed,
                            ConversationChanges::default(),
                            prompts::ASK_PROCEED.to_string(),
                        )
                        .await
                    }
                    _ => Ok(BotReply::new(prompts::FAQ_MENU)),
                }
            }

            // Historical conversations may still sit here; wave them through
            // to the options screen.
            Step::Confidentiality => {
                self.advance(
                    conv,
                    Step::Options,
                    ConversationChanges::default(),
                    prompts::options(conv.service_type).to_string(),
                )
                .await
            }

            Step::Options => {
                if norm.text.is_empty() || norm.text.len() > MAX_CHOICE_LEN {
                    return Ok(BotReply::new(prompts::options(conv.service_type)));
                }
                let Some(plan) = parse_plan(&norm.lower) else {
                    return Ok(BotReply::new(prompts::options(conv.service_type)));
                };

                // Status only moves forward on this path: a user who already
                // submitted payment and re-picks a plan keeps
                // PAYMENT_SUBMITTED.
                let status = if user.status == UserStatus::New {
                    UserStatus::AwaitingPayment
                } else {
                    user.status
                };
                user::update_status(pool, &user.id, status, Some(plan), None).await?;
                self.advance(
                    conv,
                    Step::WaitingPayment,
                    ConversationChanges::default(),
                    prompts::payment_instructions(conv.service_type).to_string(),
                )
                .await
            }

            // Media is routed off before dispatch, so anything landing here
            // is text: keep asking for the screenshot.
            Step::WaitingPayment => Ok(BotReply::new(prompts::WAITING_PAYMENT)),

            Step::PaymentIssueMenu => {
                if norm.text.is_empty() || norm.text.len() > MAX_MENU_LEN {
                    return Ok(BotReply::new(prompts::PAYMENT_ISSUE_INVALID_OPTION));
                }
                match norm.text.as_str() {
                    "1" => {
                        self.advance(
                            conv,
                            Step::WaitingPayment,
                            ConversationChanges::default(),
                            prompts::WAITING_PAYMENT.to_string(),
                        )
                        .await
                    }
                    "2" => Ok(BotReply::new(prompts::payment_instructions(conv.service_type))),
                    _ => Ok(BotReply::new(prompts::PAYMENT_ISSUE_INVALID_OPTION)),
                }
            }

            Step::CollectFullName => match free_text(&norm.text) {
                Some(full_name) => {
                    self.advance(
                        conv,
                        Step::CollectDob,
                        ConversationChanges {
                            full_name: Some(full_name),
                            ..Default::default()
                        },
                        prompts::ASK_DOB.to_string(),
                    )
                    .await
                }
                None => Ok(BotReply::new(prompts::PAYMENT_RECEIVED)),
            },

            Step::CollectDob => {
                if !dob_regex().is_match(&norm.text) {
                    return Ok(BotReply::new(prompts::ASK_DOB));
                }
                self.advance(
                    conv,
                    Step::CollectBirthTime,
                    ConversationChanges {
                        dob: Some(norm.text.clone()),
                        ..Default::default()
                    },
                    prompts::ASK_BIRTH_TIME.to_string(),
                )
                .await
            }

            Step::CollectBirthTime => match norm.text.as_str() {
                "1" => {
                    self.advance(
                        conv,
                        Step::CollectBirthTimeExactValue,
                        ConversationChanges {
                            birth_time_kind: Some(BirthTimeKind::Exact),
                            ..Default::default()
                        },
                        prompts::ASK_BIRTH_TIME_EXACT.to_string(),
                    )
                    .await
                }
                "2" => {
                    self.advance(
                        conv,
                        Step::CollectBirthTimeApproxValue,
                        ConversationChanges {
                            birth_time_kind: Some(BirthTimeKind::Approximate),
                            ..Default::default()
                        },
                        prompts::ASK_BIRTH_TIME_APPROX.to_string(),
                    )
                    .await
                }
                // Unknown skips both value steps with a sentinel value.
                "3" => {
                    self.advance(
                        conv,
                        Step::CollectBirthPlace,
                        ConversationChanges {
                            birth_time_kind: Some(BirthTimeKind::Unknown),
                            birth_time_value: Some("Unknown".to_string()),
                            ..Default::default()
                        },
                        prompts::ASK_BIRTH_PLACE.to_string(),
                    )
                    .await
                }
                _ => Ok(BotReply::new(prompts::ASK_BIRTH_TIME)),
            },

            Step::CollectBirthTimeExactValue => {
                if !exact_time_regex().is_match(&norm.text) {
                    return Ok(BotReply::new(prompts::ASK_BIRTH_TIME_EXACT));
                }
                self.advance(
                    conv,
                    Step::CollectBirthPlace,
                    ConversationChanges {
                        birth_time_value: Some(norm.text.to_uppercase()),
                        ..Default::default()
                    },
                    prompts::ASK_BIRTH_PLACE.to_string(),
                )
                .await
            }

            Step::CollectBirthTimeApproxValue => match free_text(&norm.text) {
                Some(value) => {
                    self.advance(
                        conv,
                        Step::CollectBirthPlace,
                        ConversationChanges {
                            birth_time_value: Some(value),
                            ..Default::default()
                        },
                        prompts::ASK_BIRTH_PLACE.to_string(),
                    )
                    .await
                }
                None => Ok(BotReply::new(prompts::ASK_BIRTH_TIME_APPROX)),
            },

            Step::CollectBirthPlace => match free_text(&norm.text) {
                Some(birth_place) => {
                    self.advance(
                        conv,
                        Step::CollectCurrentLocation,
                        ConversationChanges {
                            birth_place: Some(birth_place),
                            ..Default::default()
                        },
                        prompts::ASK_CURRENT_LOCATION.to_string(),
                    )
                    .await
                }
                None => Ok(BotReply::new(prompts::ASK_BIRTH_PLACE)),
            },

            Step::CollectCurrentLocation => match free_text(&norm.text) {
                Some(current_location) => {
                    self.advance(
                        conv,
                        Step::CollectGender,
                        ConversationChanges {
                            current_location: Some(current_location),
                            ..Default::default()
                        },
                        prompts::ASK_GENDER.to_string(),
                    )
                    .await
                }
                None => Ok(BotReply::new(prompts::ASK_CURRENT_LOCATION)),
            },

            Step::CollectGender => {
                let gender = match norm.text.as_str() {
                    "1" => "Male",
                    "2" => "Female",
                    _ => return Ok(BotReply::new(prompts::ASK_GENDER)),
                };

                let changes = ConversationChanges {
                    gender: Some(gender.to_string()),
                    ..Default::default()
                };
                if self.try_advance(conv, Step::AwaitingVerification, changes).await? {
                    self.record_submission(user, conv).await;
                    Ok(BotReply::new(prompts::CONFIRMATION))
                } else {
                    self.resync(conv).await
                }
            }

            // Only the human-review workflow moves users out of these.
            Step::AwaitingVerification => Ok(BotReply::new(prompts::AWAITING_VERIFICATION)),
            Step::VerifiedNotified => Ok(BotReply::new(prompts::verified(conv.service_type))),
            Step::Completed => Ok(BotReply::new(prompts::completed(conv.service_type))),
        }
    }

    /// Create the handoff record and kick off the operator notification.
    /// Nothing here touches the user-facing reply; failures are logged.
    async fn record_submission(&self, user: &User, conv: &Conversation) {
        let pool = self.db.pool();

        let payment = match payment::get_latest_by_user_id(pool, &user.id).await {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                warn!(user = %user.id, "profile complete without payment on file, no submission");
                return;
            }
            Err(e) => {
                error!(user = %user.id, error = %e, "could not look up payment for submission");
                return;
            }
        };

        match submission::create(pool, &user.id, &conv.id, &payment.id).await {
            Ok(sub) => {
                notify::spawn_submission_notify(self.db.clone(), Arc::clone(&self.admin), sub.id);
            }
            Err(e) => {
                error!(user = %user.id, error = %e, "failed to create submission");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_synonyms() {
        for input in ["1", "1 year", "1-year", "one", "one year"] {
            assert_eq!(parse_plan(input), Some("1 Year"), "{input:?}");
        }
        for input in ["3", "3 years", "3-year", "three", "three years"] {
            assert_eq!(parse_plan(input), Some("3 Years"), "{input:?}");
        }
        for input in ["5", "5 years", "5-year", "five", "five years"] {
            assert_eq!(parse_plan(input), Some("5 Years"), "{input:?}");
        }
        assert_eq!(parse_plan("2 years"), None);
        assert_eq!(parse_plan(""), None);
    }

    #[test]
    fn test_next_collection_step_scans_in_order() {
        let mut profile = CollectedProfile::default();
        assert_eq!(next_collection_step(&profile), Step::CollectFullName);

        profile.full_name = Some("Ama Mensah".to_string());
        assert_eq!(next_collection_step(&profile), Step::CollectDob);

        profile.dob = Some("01/02/1990".to_string());
        assert_eq!(next_collection_step(&profile), Step::CollectBirthTime);

        profile.birth_time_kind = Some(BirthTimeKind::Exact);
        assert_eq!(next_collection_step(&profile), Step::CollectBirthTimeExactValue);

        profile.birth_time_kind = Some(BirthTimeKind::Approximate);
        assert_eq!(next_collection_step(&profile), Step::CollectBirthTimeApproxValue);

        profile.birth_time_value = Some("around 9pm".to_string());
        assert_eq!(next_collection_step(&profile), Step::CollectBirthPlace);

        profile.birth_place = Some("Accra, Ghana".to_string());
        assert_eq!(next_collection_step(&profile), Step::CollectCurrentLocation);

        profile.current_location = Some("Kumasi, Ghana".to_string());
        assert_eq!(next_collection_step(&profile), Step::CollectGender);

        profile.gender = Some("Female".to_string());
        assert_eq!(next_collection_step(&profile), Step::AwaitingVerification);
    }

    #[test]
    fn test_unknown_birth_time_skips_value_steps() {
        let profile = CollectedProfile {
            full_name: Some("Ama Mensah".to_string()),
            dob: Some("01/02/1990".to_string()),
            birth_time_kind: Some(BirthTimeKind::Unknown),
            birth_time_value: Some("Unknown".to_string()),
            ..Default::default()
        };
        assert_eq!(next_collection_step(&profile), Step::CollectBirthPlace);
    }

    #[test]
    fn test_exact_time_regex() {
        for input in ["08:30 AM", "12:59 pm", "01:00AM", "11:45 Pm"] {
            assert!(exact_time_regex().is_match(input), "{input:?}");
        }
        for input in ["13:00 PM", "00:30 AM", "8:30 AM", "08:60 AM", "08:30", "0830 AM"] {
            assert!(!exact_time_regex().is_match(input), "{input:?}");
        }
    }

    #[test]
    fn test_dob_regex() {
        assert!(dob_regex().is_match("01/02/1990"));
        assert!(!dob_regex().is_match("1/2/1990"));
        assert!(!dob_regex().is_match("01-02-1990"));
        assert!(!dob_regex().is_match("01/02/90"));
    }
}
