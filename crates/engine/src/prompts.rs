//! Outbound message text and the step prompt table.
//!
//! [`prompt_for`] is a pure, total function over the step enum: every step
//! maps to a literal prompt, with service-specific wording where the two
//! offerings diverge.

use database::{ServiceType, Step};

pub const WELCOME: &str = "🙏 *Welcome to The Life Forecast*\n\
Peace be with you.\n\
A confidential Vedic Astrology (Jyotiṣa) reading prepared with care.\n\
For spiritual guidance and reflection.";

pub const ASK_PROCEED: &str = "✨ *How would you like to proceed?*\n\
1. Life Forecast\n\
2. Destiny Readings\n\
3. Ask a question\n\
\n\
↩️ Reply 00 for menu.";

pub const FAQ_MENU: &str = "❓ *Questions & Support*\n\
1. How long does it take?\n\
2. What details do you need?\n\
3. What if I don't know my birth time?\n\
4. Can I get a refund?\n\
\n\
✨ *Next*\n\
5. Proceed with my reading\n\
6. Go back\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const FAQ_HOW_LONG: &str = "⏳ *How long does it take?*\n\
Delivery is usually within *one week* after payment is verified and all details are submitted.\n\
If there is any delay, we will inform you.";

pub const FAQ_DETAILS_NEEDED: &str = "🧾 *What details do you need?*\n\
1. Full Name\n\
2. Date of Birth (DD/MM/YYYY)\n\
3. Time of Birth (Exact / Approximate / Unknown)\n\
4. Place of Birth (City, Country)\n\
5. Current Location (City, Country)\n\
6. Gender\n\
\n\
🔒 *Confidentiality*\n\
All details are treated with strict confidentiality.";

pub const FAQ_BIRTH_TIME_UNKNOWN: &str = "⏰ *If I don't know my birth time?*\n\
That is okay.\n\
Select *Unknown* to continue.\n\
If you have an estimate, choose *Approximate*.\n\
Exact time improves precision but is not compulsory.";

pub const FAQ_REFUND: &str = "💳 *Refunds*\n\
Once payment is confirmed and preparation begins, payments are *not refundable*.\n\
If you believe there was a payment mistake, explain and we will guide you.";

pub const OPTIONS: &str = "💫 *Life Forecast Options* (Rate: $1 = GHS 12)\n\
1. 1 Year — $150 (GHS 1,800)\n\
2. 3 Years — $250 (GHS 3,000)\n\
3. 5 Years — $350 (GHS 4,200)\n\
\n\
🔒 *Confidentiality*\n\
Your details are kept strictly confidential.\n\
They are used only for your Life Forecast reading.\n\
\n\
Reply 1, 2, or 3.\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const OPTIONS_DESTINY: &str = "🔱 *Destiny Reading Options* (Rate: $1 = GHS 12)\n\
1. 1 Year — $150 (GHS 1,800)\n\
2. 3 Years — $250 (GHS 3,000)\n\
3. 5 Years — $350 (GHS 4,200)\n\
\n\
🔒 *Confidentiality*\n\
Your details are kept strictly confidential.\n\
They are used only for your Destiny Reading.\n\
\n\
Reply 1, 2, or 3.\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const PAYMENT_INSTRUCTIONS: &str = "💳 *Mobile Money Payment* (GHS)\n\
Name: *David Asamoah*\n\
MoMo Number: *0541940276*\n\
Network: *MTN*\n\
Reference: *Life Forecast*\n\
\n\
📸 *After Payment*\n\
Send a screenshot of your payment confirmation here.\n\
\n\
📝 *Note*\n\
Payments are manually verified.\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const PAYMENT_INSTRUCTIONS_DESTINY: &str = "💳 *Mobile Money Payment* (GHS)\n\
Name: *David Asamoah*\n\
MoMo Number: *0541940276*\n\
Network: *MTN*\n\
Reference: *Destiny Readings*\n\
\n\
📸 *After Payment*\n\
Send a screenshot of your payment confirmation here.\n\
\n\
📝 *Note*\n\
Payments are manually verified.\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const WAITING_PAYMENT: &str = "📲 *Awaiting Payment Screenshot*\n\
Please send your MoMo payment screenshot to continue.\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const PAYMENT_RECEIVED: &str = "✅ *Payment Evidence Received*\n\
Thank you.\n\
Your screenshot has been received and will be reviewed.\n\
\n\
🧾 *Details (1/6)*\n\
Full Name?\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const ASK_DOB: &str = "🧾 *Details (2/6)*\n\
Date of Birth? (DD/MM/YYYY)\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const ASK_BIRTH_TIME: &str = "🧾 *Details (3/6)*\n\
Time of Birth?\n\
1. Exact\n\
2. Approximate\n\
3. Unknown\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const ASK_BIRTH_TIME_EXACT: &str = "⏰ *Time of Birth (Exact)*\n\
Enter the exact time using this format.\n\
HH:MM AM/PM\n\
Example: 08:30 AM\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const ASK_BIRTH_TIME_APPROX: &str = "⏰ *Time of Birth (Approximate)*\n\
Enter an estimate in your own words.\n\
Example: around 9pm\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const ASK_BIRTH_PLACE: &str = "🧾 *Details (4/6)*\n\
Place of Birth? (City, Country)\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const ASK_CURRENT_LOCATION: &str = "🧾 *Details (5/6)*\n\
Current Location? (City, Country)\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const ASK_GENDER: &str = "🧾 *Details (6/6)*\n\
Gender?\n\
1. Male\n\
2. Female\n\
\n\
↩️ Reply 0 to go back.\n\
↩️ Reply 00 for menu.";

pub const CONFIRMATION: &str = "📩 *Submission Received*\n\
Thank you.\n\
Your details have been submitted.\n\
\n\
🔎 *Verification*\n\
We will notify you once payment is confirmed.\n\
\n\
🔒 *Confidentiality*\n\
All details remain strictly confidential.";

pub const AWAITING_VERIFICATION: &str = "⏳ *Verification Pending*\n\
Your submission is under review.\n\
We will notify you once verification is complete.\n\
\n\
↩️ Reply 00 for menu.";

pub const PAYMENT_VERIFIED: &str = "✅ *Payment Confirmed*\n\
Your payment has been successfully received and verified.\n\
\n\
🔱 *Next Step*\n\
Your Life Forecast reading is now being prepared.\n\
You will be contacted once it is ready.\n\
\n\
🔒 All details remain strictly confidential.";

pub const PAYMENT_VERIFIED_DESTINY: &str = "✅ *Payment Confirmed*\n\
Your payment has been successfully received and verified.\n\
\n\
🔱 *Next Step*\n\
Your Destiny Reading is now being prepared.\n\
You will be contacted once it is ready.\n\
\n\
🔒 All details remain strictly confidential.";

pub const PAYMENT_REJECTED_INVALID: &str = "⚠️ *Payment Not Confirmed*\n\
We were unable to verify the payment screenshot you submitted.\n\
\n\
📌 *Choose an option*\n\
1. Upload payment proof again\n\
2. View payment details\n\
\n\
Reply 1 or 2.";

pub const PAYMENT_ISSUE_INVALID_OPTION: &str = "Reply 1 or 2.";

pub const COMPLETED: &str = "✅ *Reading Completed*\n\
Your Life Forecast reading has been completed.\n\
Thank you for your trust.\n\
\n\
🔒 All details remain strictly confidential.";

pub const COMPLETED_DESTINY: &str = "✅ *Reading Completed*\n\
Your Destiny Reading has been completed.\n\
Thank you for your trust.\n\
\n\
🔒 All details remain strictly confidential.";

/// The options screen for a service.
pub fn options(service: ServiceType) -> &'static str {
    match service {
        ServiceType::LifeForecast => OPTIONS,
        ServiceType::DestinyReadings => OPTIONS_DESTINY,
    }
}

/// Payment instructions for a service.
pub fn payment_instructions(service: ServiceType) -> &'static str {
    match service {
        ServiceType::LifeForecast => PAYMENT_INSTRUCTIONS,
        ServiceType::DestinyReadings => PAYMENT_INSTRUCTIONS_DESTINY,
    }
}

/// The payment-verified notice for a service.
pub fn verified(service: ServiceType) -> &'static str {
    match service {
        ServiceType::LifeForecast => PAYMENT_VERIFIED,
        ServiceType::DestinyReadings => PAYMENT_VERIFIED_DESTINY,
    }
}

/// The reading-completed notice for a service.
pub fn completed(service: ServiceType) -> &'static str {
    match service {
        ServiceType::LifeForecast => COMPLETED,
        ServiceType::DestinyReadings => COMPLETED_DESTINY,
    }
}

/// The prompt shown on (re-)entering a step.
pub fn prompt_for(step: Step, service: ServiceType) -> String {
    match step {
        Step::Welcome => format!("{WELCOME}\n{ASK_PROCEED}"),
        Step::AskProceed => ASK_PROCEED.to_string(),
        Step::FaqMenu => FAQ_MENU.to_string(),
        Step::Confidentiality => options(service).to_string(),
        Step::Options => options(service).to_string(),
        Step::WaitingPayment => WAITING_PAYMENT.to_string(),
        Step::PaymentIssueMenu => PAYMENT_REJECTED_INVALID.to_string(),
        Step::CollectFullName => PAYMENT_RECEIVED.to_string(),
        Step::CollectDob => ASK_DOB.to_string(),
        Step::CollectBirthTime => ASK_BIRTH_TIME.to_string(),
        Step::CollectBirthTimeExactValue => ASK_BIRTH_TIME_EXACT.to_string(),
        Step::CollectBirthTimeApproxValue => ASK_BIRTH_TIME_APPROX.to_string(),
        Step::CollectBirthPlace => ASK_BIRTH_PLACE.to_string(),
        Step::CollectCurrentLocation => ASK_CURRENT_LOCATION.to_string(),
        Step::CollectGender => ASK_GENDER.to_string(),
        Step::AwaitingVerification => AWAITING_VERIFICATION.to_string(),
        Step::VerifiedNotified => verified(service).to_string(),
        Step::Completed => completed(service).to_string(),
    }
}

/// The underpaid-rejection notice, with the required and received amounts
/// spelled out.
pub fn underpaid_notice(expected_ghs: f64, received_ghs: f64) -> String {
    format!(
        "⚠️ *Payment Incomplete*\n\
         The amount received is less than required for your selected reading.\n\
         \n\
         💳 *Payment Details*\n\
         Required: GHS {}\n\
         Received: GHS {}\n\
         \n\
         📌 *Choose an option*\n\
         1. Upload updated payment proof\n\
         2. View payment details\n\
         \n\
         Reply 1 or 2.",
        format_amount(expected_ghs),
        format_amount(received_ghs),
    )
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_step_has_a_nonempty_prompt() {
        let steps = [
            Step::Welcome,
            Step::AskProceed,
            Step::FaqMenu,
            Step::Confidentiality,
            Step::Options,
            Step::WaitingPayment,
            Step::PaymentIssueMenu,
            Step::CollectFullName,
            Step::CollectDob,
            Step::CollectBirthTime,
            Step::CollectBirthTimeExactValue,
            Step::CollectBirthTimeApproxValue,
            Step::CollectBirthPlace,
            Step::CollectCurrentLocation,
            Step::CollectGender,
            Step::AwaitingVerification,
            Step::VerifiedNotified,
            Step::Completed,
        ];
        for step in steps {
            for service in [ServiceType::LifeForecast, ServiceType::DestinyReadings] {
                assert!(!prompt_for(step, service).is_empty(), "{step:?}/{service:?}");
            }
        }
    }

    #[test]
    fn test_service_divergent_prompts() {
        assert_ne!(
            prompt_for(Step::Options, ServiceType::LifeForecast),
            prompt_for(Step::Options, ServiceType::DestinyReadings)
        );
        assert_ne!(
            prompt_for(Step::VerifiedNotified, ServiceType::LifeForecast),
            prompt_for(Step::VerifiedNotified, ServiceType::DestinyReadings)
        );
        assert_ne!(
            prompt_for(Step::Completed, ServiceType::LifeForecast),
            prompt_for(Step::Completed, ServiceType::DestinyReadings)
        );
        assert!(prompt_for(Step::VerifiedNotified, ServiceType::DestinyReadings)
            .contains("Destiny Reading"));
    }

    #[test]
    fn test_welcome_prompt_appends_proceed_menu() {
        let prompt = prompt_for(Step::Welcome, ServiceType::LifeForecast);
        assert!(prompt.starts_with(WELCOME));
        assert!(prompt.ends_with(ASK_PROCEED));
    }

    #[test]
    fn test_underpaid_notice_contains_amounts() {
        let notice = underpaid_notice(1800.0, 900.0);
        assert!(notice.contains("GHS 1800"));
        assert!(notice.contains("GHS 900"));

        let fractional = underpaid_notice(3000.0, 1250.5);
        assert!(fractional.contains("GHS 1250.5"));
    }
}
