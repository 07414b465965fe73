//! Twilio webhook signature validation.
//!
//! Twilio signs each webhook with HMAC-SHA1 over the full request URL
//! followed by every POST parameter, sorted by name, appended as
//! `name + value`. The signature travels base64-encoded in the
//! `X-Twilio-Signature` header. Requests that fail this check must be
//! dropped before any payload field is trusted.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

fn signed_payload(url: &str, params: &BTreeMap<String, String>) -> String {
    let mut data = String::from(url);
    for (name, value) in params {
        data.push_str(name);
        data.push_str(value);
    }
    data
}

/// Compute the expected signature for a request.
pub fn expected_signature(auth_token: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let Ok(mut mac) = HmacSha1::new_from_slice(auth_token.as_bytes()) else {
        return String::new();
    };
    mac.update(signed_payload(url, params).as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Validate a webhook signature. Comparison happens inside the MAC
/// verifier, in constant time.
pub fn validate_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &BTreeMap<String, String>,
) -> bool {
    let Ok(provided) = BASE64.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha1::new_from_slice(auth_token.as_bytes()) else {
        return false;
    };
    mac.update(signed_payload(url, params).as_bytes());
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("From".to_string(), "whatsapp:+233541234567".to_string()),
            ("Body".to_string(), "hi".to_string()),
            ("NumMedia".to_string(), "0".to_string()),
        ])
    }

    #[test]
    fn test_round_trip_validates() {
        let token = "test_auth_token";
        let url = "https://bot.example.com/webhook/whatsapp";
        let params = sample_params();

        let signature = expected_signature(token, url, &params);
        assert!(validate_signature(token, &signature, url, &params));
    }

    #[test]
    fn test_any_change_breaks_the_signature() {
        let token = "test_auth_token";
        let url = "https://bot.example.com/webhook/whatsapp";
        let params = sample_params();
        let signature = expected_signature(token, url, &params);

        // Different token
        assert!(!validate_signature("other_token", &signature, url, &params));

        // Different URL
        assert!(!validate_signature(token, &signature, "https://evil.example.com/webhook", &params));

        // Tampered parameter
        let mut tampered = params.clone();
        tampered.insert("Body".to_string(), "hijacked".to_string());
        assert!(!validate_signature(token, &signature, url, &tampered));
    }

    #[test]
    fn test_garbage_signature_is_rejected() {
        let params = sample_params();
        assert!(!validate_signature("token", "not base64!!!", "https://x.example/", &params));
        assert!(!validate_signature("token", "", "https://x.example/", &params));
    }

    #[test]
    fn test_params_are_signed_in_sorted_order() {
        // BTreeMap iteration is name-sorted, so insertion order is
        // irrelevant to the payload.
        let url = "https://bot.example.com/webhook/whatsapp";
        let a = BTreeMap::from([
            ("B".to_string(), "2".to_string()),
            ("A".to_string(), "1".to_string()),
        ]);
        assert_eq!(signed_payload(url, &a), format!("{url}A1B2"));
    }
}
