use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::auth::encode_hex;
use crate::domain::quote::{PlanId, QuoteId};

type HmacSha256 = Hmac<Sha256>;

/// How long a payment link stays honored after issue.
pub const LINK_VALIDITY_DAYS: i64 = 7;

/// Signs and verifies the tokens embedded in customer payment links, so the
/// portal can trust quote/plan identifiers arriving from outside.
#[derive(Clone)]
pub struct PaymentLinkSigner {
    signing_key: Vec<u8>,
}

impl PaymentLinkSigner {
    pub fn new(signing_key: impl AsRef<[u8]>) -> Self {
        Self { signing_key: signing_key.as_ref().to_vec() }
    }

    pub fn sign(
        &self,
        quote_id: &QuoteId,
        plan_id: &PlanId,
        issued_at: DateTime<Utc>,
    ) -> String {
        let material = link_material(quote_id, plan_id, issued_at);
        hmac_hex(&self.signing_key, material.as_bytes())
    }

    pub fn verify(
        &self,
        quote_id: &QuoteId,
        plan_id: &PlanId,
        issued_at: DateTime<Utc>,
        signature: &str,
    ) -> bool {
        let expected = self.sign(quote_id, plan_id, issued_at);
        constant_time_str_eq(&expected, signature)
    }
}

pub fn link_expired(issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(issued_at) > Duration::days(LINK_VALIDITY_DAYS)
}

fn link_material(quote_id: &QuoteId, plan_id: &PlanId, issued_at: DateTime<Utc>) -> String {
    format!("{}|{}|{}", quote_id.0, plan_id.0, issued_at.timestamp())
}

fn hmac_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    encode_hex(mac.finalize().into_bytes().as_slice())
}

fn constant_time_str_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::domain::quote::{PlanId, QuoteId};
    use crate::links::{link_expired, PaymentLinkSigner};

    #[test]
    fn signatures_verify_for_matching_material() {
        let signer = PaymentLinkSigner::new("test-signing-key");
        let quote_id = QuoteId("QT-2026-0001".to_string());
        let plan_id = PlanId("plan-comprehensive".to_string());
        let issued_at = Utc::now();

        let signature = signer.sign(&quote_id, &plan_id, issued_at);
        assert!(signer.verify(&quote_id, &plan_id, issued_at, &signature));
    }

    #[test]
    fn tampered_material_fails_verification() {
        let signer = PaymentLinkSigner::new("test-signing-key");
        let quote_id = QuoteId("QT-2026-0001".to_string());
        let plan_id = PlanId("plan-comprehensive".to_string());
        let issued_at = Utc::now();
        let signature = signer.sign(&quote_id, &plan_id, issued_at);

        let other_quote = QuoteId("QT-2026-0002".to_string());
        assert!(!signer.verify(&other_quote, &plan_id, issued_at, &signature));

        let other_key = PaymentLinkSigner::new("different-key");
        assert!(!other_key.verify(&quote_id, &plan_id, issued_at, &signature));
    }

    #[test]
    fn links_expire_after_the_validity_window() {
        let now = Utc::now();
        assert!(!link_expired(now - Duration::days(6), now));
        assert!(link_expired(now - Duration::days(8), now));
    }
}
