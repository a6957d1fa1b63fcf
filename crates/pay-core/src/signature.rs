//! # Payment Signature
//!
//! The gateway signs `order_id|payment_id` with the account secret using
//! HMAC-SHA256 and hands the hex digest to the client, which posts it back.

use crate::error::{PaymentError, PaymentResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex digest of `HMAC-SHA256(secret, order_id|payment_id)`
pub fn compute_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
) -> PaymentResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// True iff `signature` is the digest for this order/payment pair
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> PaymentResult<bool> {
    let expected = compute_payment_signature(secret, order_id, payment_id)?;
    Ok(constant_time_compare(&expected, signature))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic_hex() {
        let a = compute_payment_signature("secret", "order_1", "pay_1").unwrap();
        let b = compute_payment_signature("secret", "order_1", "pay_1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_separator_binds_both_ids() {
        let a = compute_payment_signature("secret", "order_1", "2pay").unwrap();
        let b = compute_payment_signature("secret", "order_12", "pay").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify() {
        let sig = compute_payment_signature("secret", "order_1", "pay_1").unwrap();
        assert!(verify_payment_signature("secret", "order_1", "pay_1", &sig).unwrap());
        assert!(!verify_payment_signature("other", "order_1", "pay_1", &sig).unwrap());
        assert!(!verify_payment_signature("secret", "order_1", "pay_2", &sig).unwrap());
        assert!(!verify_payment_signature("secret", "order_1", "pay_1", "deadbeef").unwrap());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
