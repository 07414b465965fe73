//! Inbound message normalization.
//!
//! Turns the raw webhook fields into a classified message: trimmed text,
//! reserved control tokens, and a vetted media reference. Malformed input
//! degrades to "no match" rather than erroring.

/// Origin prefix for media we are willing to fetch. The trailing slash
/// matters: `https://api.twilio.com.evil.example/` must not pass.
pub const TRUSTED_MEDIA_PREFIX: &str = "https://api.twilio.com/";

/// A classified inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedMessage {
    /// Trimmed body, case preserved.
    pub text: String,
    /// Trimmed and lowercased body.
    pub lower: String,
    /// The "0" / "back" control token.
    pub is_back: bool,
    /// The "00" / "menu" control token.
    pub is_menu_reset: bool,
    /// Whether a trusted media attachment is present.
    pub has_media: bool,
    /// The vetted media URL, when `has_media` is true.
    pub media_url: Option<String>,
}

/// Normalize a raw inbound message.
pub fn normalize(body: Option<&str>, media_count: u32, media_url: Option<&str>) -> NormalizedMessage {
    let text = body.unwrap_or("").trim().to_string();
    let lower = text.to_lowercase();
    let is_back = lower == "0" || lower == "back";
    let is_menu_reset = lower == "00" || lower == "menu";

    let media_url = if media_count > 0 {
        media_url
            .map(str::trim)
            .filter(|url| is_trusted_media_url(url))
            .map(String::from)
    } else {
        None
    };

    NormalizedMessage {
        has_media: media_url.is_some(),
        text,
        lower,
        is_back,
        is_menu_reset,
        media_url,
    }
}

/// Check a media URL against the trusted-origin allow list.
pub fn is_trusted_media_url(url: &str) -> bool {
    url.starts_with(TRUSTED_MEDIA_PREFIX)
}
