use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header GitHub puts the payload signature in, as `sha256=<hex>`.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Verify the HMAC-SHA256 signature of a webhook delivery.
pub fn verify_signature(secret: &str, payload: &[u8], signature_header: Option<&str>) -> Result<()> {
    let header = signature_header
        .ok_or_else(|| AppError::WebhookVerification(format!("Missing {SIGNATURE_HEADER}")))?;

    let signature_hex = header
        .strip_prefix("sha256=")
        .ok_or_else(|| AppError::WebhookVerification("Missing sha256= prefix".to_string()))?;

    let signature_bytes = hex::decode(signature_hex)
        .map_err(|e| AppError::WebhookVerification(format!("Invalid hex in signature: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::WebhookVerification(format!("Invalid HMAC key: {e}")))?;
    mac.update(payload);

    mac.verify_slice(&signature_bytes)
        .map_err(|_| AppError::WebhookVerification("Signature mismatch".to_string()))
}

/// Header value GitHub would send for `payload`.
#[cfg(test)]
pub fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
