//! Shared-secret signatures for payment-provider notifications.
//!
//! The provider signs the notification fields with HMAC-SHA256 over a
//! canonical string: keys sorted alphabetically, `signature` itself
//! excluded, joined as `k=v` pairs with `&`. We recompute and compare in
//! constant time.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_FIELD: &str = "signature";

pub fn canonical_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(k, _)| k.as_str() != SIGNATURE_FIELD)
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sign(fields: &BTreeMap<String, String>, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(canonical_string(fields).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// False when the signature field is absent, malformed or does not match.
pub fn verify(fields: &BTreeMap<String, String>, secret: &str) -> bool {
    let Some(claimed) = fields.get(SIGNATURE_FIELD) else {
        return false;
    };
    constant_time_compare(claimed, &sign(fields, secret))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod test {
    use super::*;

    fn fields() -> BTreeMap<String, String> {
        BTreeMap::from([
            (String::from("payment_status"), String::from("completed")),
            (String::from("amount"), String::from("12900")),
            (String::from("buyer_email"), String::from("a@b.c")),
        ])
    }

    #[test]
    fn sign_then_verify() {
        let mut f = fields();
        let sig = sign(&f, "secret");
        f.insert(String::from(SIGNATURE_FIELD), sig);
        assert!(verify(&f, "secret"));
    }

    #[test]
    fn tampered_field_rejected() {
        let mut f = fields();
        let sig = sign(&f, "secret");
        f.insert(String::from(SIGNATURE_FIELD), sig);
        f.insert(String::from("amount"), String::from("1"));
        assert!(!verify(&f, "secret"));
    }

    #[test]
    fn missing_signature_rejected() {
        assert!(!verify(&fields(), "secret"));
    }

    #[test]
    fn wrong_secret_rejected() {
        let mut f = fields();
        let sig = sign(&f, "secret");
        f.insert(String::from(SIGNATURE_FIELD), sig);
        assert!(!verify(&f, "other"));
    }

    #[test]
    fn canonical_string_sorts_and_skips_signature() {
        let mut f = fields();
        f.insert(String::from(SIGNATURE_FIELD), String::from("xxx"));
        assert_eq!(
            canonical_string(&f),
            "amount=12900&buyer_email=a@b.c&payment_status=completed"
        );
    }

    #[test]
    fn constant_time_compare_basics() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
