//! End-to-end conversation flows against an in-memory store.

use std::sync::Arc;

use database::{conversation, payment, user, Conversation, Database, ServiceType, Step, User, UserStatus};
use engine::{prompts, Engine, InboundMessage, NoOpAdminNotifier};

const PHONE: &str = "+233541234567";
const MEDIA_URL: &str = "https://api.twilio.com/2010-04-01/Accounts/AC1/Messages/MM1/Media/ME1";

async fn engine() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    Engine::new(db, Arc::new(NoOpAdminNotifier))
}

fn text(body: &str) -> InboundMessage {
    InboundMessage {
        from: PHONE.to_string(),
        body: Some(body.to_string()),
        media_count: 0,
        media_url: None,
    }
}

fn media(url: &str) -> InboundMessage {
    InboundMessage {
        from: PHONE.to_string(),
        body: None,
        media_count: 1,
        media_url: Some(url.to_string()),
    }
}

async fn current_user(engine: &Engine) -> User {
    user::get_by_phone(engine.database().pool(), PHONE)
        .await
        .unwrap()
        .expect("user exists")
}

async fn current_conv(engine: &Engine) -> Conversation {
    let user = current_user(engine).await;
    conversation::get_by_user_id(engine.database().pool(), &user.id)
        .await
        .unwrap()
        .expect("conversation exists")
}

async fn payment_count(engine: &Engine) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments")
        .fetch_one(engine.database().pool())
        .await
        .unwrap()
}

async fn submission_count(engine: &Engine) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions")
        .fetch_one(engine.database().pool())
        .await
        .unwrap()
}

/// Drive a fresh user to the waiting-payment step on the 3-year plan.
async fn drive_to_waiting_payment(engine: &Engine) {
    engine.handle_message(&text("hi")).await.unwrap();
    engine.handle_message(&text("1")).await.unwrap();
    engine.handle_message(&text("3 years")).await.unwrap();
}

/// Drive a fresh user through payment into the name-collection step.
async fn drive_to_collection(engine: &Engine) {
    drive_to_waiting_payment(engine).await;
    engine.handle_message(&media(MEDIA_URL)).await.unwrap();
}

#[tokio::test]
async fn scenario_a_first_contact() {
    let engine = engine().await;

    let reply = engine.handle_message(&text("hi")).await.unwrap();
    assert_eq!(reply.text, prompts::prompt_for(Step::Welcome, ServiceType::LifeForecast));
    assert!(reply.text.starts_with(prompts::WELCOME));
    assert!(reply.text.ends_with(prompts::ASK_PROCEED));

    let user = current_user(&engine).await;
    assert_eq!(user.status, UserStatus::New);

    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::AskProceed);
    assert!(conv.nav_stack.is_empty());
}

#[tokio::test]
async fn scenario_b_life_forecast_selection() {
    let engine = engine().await;
    engine.handle_message(&text("hi")).await.unwrap();

    let reply = engine.handle_message(&text("1")).await.unwrap();
    assert_eq!(reply.text, prompts::OPTIONS);

    let user = current_user(&engine).await;
    assert_eq!(user.service_type, ServiceType::LifeForecast);

    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::Options);
    assert_eq!(conv.service_type, ServiceType::LifeForecast);
    assert_eq!(conv.nav_stack, vec![Step::AskProceed]);
}

#[tokio::test]
async fn destiny_selection_switches_prompts() {
    let engine = engine().await;
    engine.handle_message(&text("hi")).await.unwrap();

    let reply = engine.handle_message(&text("2")).await.unwrap();
    assert_eq!(reply.text, prompts::OPTIONS_DESTINY);

    let user = current_user(&engine).await;
    assert_eq!(user.service_type, ServiceType::DestinyReadings);

    let reply = engine.handle_message(&text("1 year")).await.unwrap();
    assert_eq!(reply.text, prompts::PAYMENT_INSTRUCTIONS_DESTINY);
}

#[tokio::test]
async fn scenario_c_plan_selection() {
    let engine = engine().await;
    engine.handle_message(&text("hi")).await.unwrap();
    engine.handle_message(&text("1")).await.unwrap();

    let reply = engine.handle_message(&text("3 years")).await.unwrap();
    assert_eq!(reply.text, prompts::PAYMENT_INSTRUCTIONS);

    let user = current_user(&engine).await;
    assert_eq!(user.selected_plan.as_deref(), Some("3 Years"));
    assert_eq!(user.status, UserStatus::AwaitingPayment);

    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::WaitingPayment);
}

#[tokio::test]
async fn scenario_d_payment_screenshot() {
    let engine = engine().await;
    drive_to_waiting_payment(&engine).await;

    let reply = engine.handle_message(&media(MEDIA_URL)).await.unwrap();
    assert_eq!(reply.text, prompts::PAYMENT_RECEIVED);

    let user = current_user(&engine).await;
    assert_eq!(user.status, UserStatus::PaymentSubmitted);

    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::CollectFullName);

    let payment = payment::get_latest_by_user_id(engine.database().pool(), &user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.screenshot_url, MEDIA_URL);
    assert!(!payment.verified);
    assert_eq!(payment.service_type, ServiceType::LifeForecast);
}

#[tokio::test]
async fn invalid_input_reprompts_without_transition() {
    let engine = engine().await;
    engine.handle_message(&text("hi")).await.unwrap();

    // Unknown choice at the proceed menu.
    let before = current_conv(&engine).await;
    let reply = engine.handle_message(&text("maybe")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_PROCEED);
    assert_eq!(current_conv(&engine).await.current_step, before.current_step);

    // Oversized input degrades the same way.
    let reply = engine.handle_message(&text(&"x".repeat(50))).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_PROCEED);

    // Malformed date during collection.
    engine.handle_message(&text("1")).await.unwrap();
    engine.handle_message(&text("1 year")).await.unwrap();
    engine.handle_message(&media(MEDIA_URL)).await.unwrap();
    engine.handle_message(&text("Ama Mensah")).await.unwrap();

    let reply = engine.handle_message(&text("February first")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_DOB);
    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::CollectDob);
    assert!(conv.profile.dob.is_none());
}

#[tokio::test]
async fn menu_reset_clears_stack_from_any_state() {
    let engine = engine().await;
    drive_to_collection(&engine).await;
    engine.handle_message(&text("Ama Mensah")).await.unwrap();
    assert!(!current_conv(&engine).await.nav_stack.is_empty());

    let reply = engine.handle_message(&text("00")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_PROCEED);

    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::AskProceed);
    assert!(conv.nav_stack.is_empty());
    // Rewinding is positional: the collected name survives the reset.
    assert_eq!(conv.profile.full_name.as_deref(), Some("Ama Mensah"));

    let reply = engine.handle_message(&text("menu")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_PROCEED);
}

#[tokio::test]
async fn back_pops_one_step_then_resets() {
    let engine = engine().await;
    engine.handle_message(&text("hi")).await.unwrap();
    engine.handle_message(&text("1")).await.unwrap();
    assert_eq!(current_conv(&engine).await.nav_stack, vec![Step::AskProceed]);

    let reply = engine.handle_message(&text("0")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_PROCEED);
    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::AskProceed);
    assert!(conv.nav_stack.is_empty());

    // Scenario F: back on an empty stack behaves exactly like a menu reset.
    let reply = engine.handle_message(&text("back")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_PROCEED);
    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::AskProceed);
    assert!(conv.nav_stack.is_empty());
}

#[tokio::test]
async fn back_rewinds_position_but_keeps_data() {
    let engine = engine().await;
    drive_to_collection(&engine).await;
    engine.handle_message(&text("Ama Mensah")).await.unwrap();
    assert_eq!(current_conv(&engine).await.current_step, Step::CollectDob);

    let reply = engine.handle_message(&text("0")).await.unwrap();
    assert_eq!(reply.text, prompts::PAYMENT_RECEIVED);

    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::CollectFullName);
    assert_eq!(conv.profile.full_name.as_deref(), Some("Ama Mensah"));
    assert!(!conv.nav_stack.contains(&Step::CollectFullName));
}

#[tokio::test]
async fn duplicate_screenshot_keeps_single_payment_row() {
    let engine = engine().await;
    drive_to_waiting_payment(&engine).await;
    engine.handle_message(&media(MEDIA_URL)).await.unwrap();

    // Simulate redelivery of the same webhook: the conversation is back at
    // the waiting-payment step when the duplicate arrives.
    let conv = current_conv(&engine).await;
    conversation::set_step(engine.database().pool(), &conv.id, Step::WaitingPayment)
        .await
        .unwrap();
    let reply = engine.handle_message(&media(MEDIA_URL)).await.unwrap();
    assert_eq!(reply.text, prompts::PAYMENT_RECEIVED);

    assert_eq!(payment_count(&engine).await, 1);
    let user = current_user(&engine).await;
    let payment = payment::get_latest_by_user_id(engine.database().pool(), &user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.screenshot_url, MEDIA_URL);
    assert!(!payment.verified);
}

#[tokio::test]
async fn untrusted_media_is_ignored() {
    let engine = engine().await;
    drive_to_waiting_payment(&engine).await;

    let reply = engine
        .handle_message(&media("https://api.twilio.com.evil.example/media/1"))
        .await
        .unwrap();
    assert_eq!(reply.text, prompts::WAITING_PAYMENT);
    assert_eq!(payment_count(&engine).await, 0);
    assert_eq!(current_conv(&engine).await.current_step, Step::WaitingPayment);
}

#[tokio::test]
async fn media_outside_payment_steps_is_text() {
    let engine = engine().await;
    engine.handle_message(&text("hi")).await.unwrap();

    let reply = engine.handle_message(&media(MEDIA_URL)).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_PROCEED);
    assert_eq!(payment_count(&engine).await, 0);
}

#[tokio::test]
async fn faq_menu_stays_put_for_answers() {
    let engine = engine().await;
    engine.handle_message(&text("hi")).await.unwrap();

    let reply = engine.handle_message(&text("ask a question")).await.unwrap();
    assert_eq!(reply.text, prompts::FAQ_MENU);
    assert_eq!(current_conv(&engine).await.current_step, Step::FaqMenu);

    for choice in ["1", "2", "3", "4"] {
        let reply = engine.handle_message(&text(choice)).await.unwrap();
        assert!(reply.text.ends_with(prompts::FAQ_MENU), "{choice}");
        assert_eq!(current_conv(&engine).await.current_step, Step::FaqMenu);
    }

    let reply = engine.handle_message(&text("6")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_PROCEED);
    assert_eq!(current_conv(&engine).await.current_step, Step::AskProceed);
}

#[tokio::test]
async fn faq_proceed_stamps_life_forecast() {
    let engine = engine().await;
    engine.handle_message(&text("hi")).await.unwrap();
    engine.handle_message(&text("3")).await.unwrap();

    let reply = engine.handle_message(&text("5")).await.unwrap();
    assert_eq!(reply.text, prompts::OPTIONS);

    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::Options);
    assert_eq!(conv.service_type, ServiceType::LifeForecast);
    assert_eq!(current_user(&engine).await.service_type, ServiceType::LifeForecast);
}

#[tokio::test]
async fn unknown_birth_time_skips_value_collection() {
    let engine = engine().await;
    drive_to_collection(&engine).await;
    engine.handle_message(&text("Ama Mensah")).await.unwrap();
    engine.handle_message(&text("01/02/1990")).await.unwrap();

    let reply = engine.handle_message(&text("3")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_BIRTH_PLACE);

    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::CollectBirthPlace);
    assert_eq!(conv.profile.birth_time_value.as_deref(), Some("Unknown"));
}

#[tokio::test]
async fn exact_birth_time_is_canonicalized() {
    let engine = engine().await;
    drive_to_collection(&engine).await;
    engine.handle_message(&text("Ama Mensah")).await.unwrap();
    engine.handle_message(&text("01/02/1990")).await.unwrap();
    engine.handle_message(&text("1")).await.unwrap();

    // Wrong format is re-prompted.
    let reply = engine.handle_message(&text("around nine")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_BIRTH_TIME_EXACT);

    let reply = engine.handle_message(&text("08:30 am")).await.unwrap();
    assert_eq!(reply.text, prompts::ASK_BIRTH_PLACE);
    assert_eq!(
        current_conv(&engine).await.profile.birth_time_value.as_deref(),
        Some("08:30 AM")
    );
}

#[tokio::test]
async fn full_collection_creates_submission() {
    let engine = engine().await;
    drive_to_collection(&engine).await;
    engine.handle_message(&text("Ama Mensah")).await.unwrap();
    engine.handle_message(&text("01/02/1990")).await.unwrap();
    engine.handle_message(&text("2")).await.unwrap();
    engine.handle_message(&text("around 9pm")).await.unwrap();
    engine.handle_message(&text("Accra, Ghana")).await.unwrap();
    engine.handle_message(&text("Kumasi, Ghana")).await.unwrap();

    let reply = engine.handle_message(&text("2")).await.unwrap();
    assert_eq!(reply.text, prompts::CONFIRMATION);

    let conv = current_conv(&engine).await;
    assert_eq!(conv.current_step, Step::AwaitingVerification);
    assert_eq!(conv.profile.gender.as_deref(), Some("Female"));
    assert_eq!(submission_count(&engine).await, 1);

    // Anything further just repeats the pending prompt.
    let reply = engine.handle_message(&text("hello?")).await.unwrap();
    assert_eq!(reply.text, prompts::AWAITING_VERIFICATION);
    assert_eq!(submission_count(&engine).await, 1);
}

#[tokio::test]
async fn payment_resubmission_resumes_at_first_missing_field() {
    let engine = engine().await;
    drive_to_collection(&engine).await;
    engine.handle_message(&text("Ama Mensah")).await.unwrap();
    engine.handle_message(&text("01/02/1990")).await.unwrap();

    // Abort to the menu, pick a different plan, pay again.
    engine.handle_message(&text("00")).await.unwrap();
    engine.handle_message(&text("1")).await.unwrap();
    engine.handle_message(&text("1 year")).await.unwrap();
    let reply = engine.handle_message(&media(MEDIA_URL)).await.unwrap();
    assert_eq!(reply.text, prompts::PAYMENT_RECEIVED);

    // Name and date are already on file; collection resumes at birth time.
    assert_eq!(current_conv(&engine).await.current_step, Step::CollectBirthTime);
    assert_eq!(payment_count(&engine).await, 1);

    // Re-picking a plan mid-recovery never regressed the status.
    let user = current_user(&engine).await;
    assert_eq!(user.status, UserStatus::PaymentSubmitted);
    assert_eq!(user.selected_plan.as_deref(), Some("1 Year"));
}

#[tokio::test]
async fn terminal_status_short_circuits_without_writes() {
    let engine = engine().await;
    drive_to_collection(&engine).await;

    let user = current_user(&engine).await;
    let before = current_conv(&engine).await;

    user::update_status(engine.database().pool(), &user.id, UserStatus::Verified, None, None)
        .await
        .unwrap();
    let reply = engine.handle_message(&text("1")).await.unwrap();
    assert_eq!(reply.text, prompts::PAYMENT_VERIFIED);
    assert_eq!(current_conv(&engine).await, before);

    // Even control tokens are inert once the user is closed out.
    let reply = engine.handle_message(&text("00")).await.unwrap();
    assert_eq!(reply.text, prompts::PAYMENT_VERIFIED);
    assert_eq!(current_conv(&engine).await, before);

    user::update_status(engine.database().pool(), &user.id, UserStatus::Completed, None, None)
        .await
        .unwrap();
    let reply = engine.handle_message(&text("hello")).await.unwrap();
    assert_eq!(reply.text, prompts::COMPLETED);
    assert_eq!(current_conv(&engine).await, before);
}

#[tokio::test]
async fn terminal_prompts_follow_service_type() {
    let engine = engine().await;
    engine.handle_message(&text("hi")).await.unwrap();
    engine.handle_message(&text("2")).await.unwrap();

    let user = current_user(&engine).await;
    user::update_status(engine.database().pool(), &user.id, UserStatus::Verified, None, None)
        .await
        .unwrap();

    let reply = engine.handle_message(&text("anything")).await.unwrap();
    assert_eq!(reply.text, prompts::PAYMENT_VERIFIED_DESTINY);
}

#[tokio::test]
async fn status_only_moves_forward_through_bot_flow() {
    let engine = engine().await;

    engine.handle_message(&text("hi")).await.unwrap();
    assert_eq!(current_user(&engine).await.status, UserStatus::New);

    engine.handle_message(&text("1")).await.unwrap();
    assert_eq!(current_user(&engine).await.status, UserStatus::New);

    engine.handle_message(&text("3 years")).await.unwrap();
    assert_eq!(current_user(&engine).await.status, UserStatus::AwaitingPayment);

    engine.handle_message(&media(MEDIA_URL)).await.unwrap();
    assert_eq!(current_user(&engine).await.status, UserStatus::PaymentSubmitted);

    // Backwards navigation does not regress the status.
    engine.handle_message(&text("00")).await.unwrap();
    assert_eq!(current_user(&engine).await.status, UserStatus::PaymentSubmitted);
}
