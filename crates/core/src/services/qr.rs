//! QR code content.
//!
//! A hearing's QR code is a compact JSON document. The scanner posts the
//! decoded text back verbatim, and the stored text doubles as the lookup key,
//! so encoding happens exactly once, when the hearing is created.
//!
//! When a signing secret is configured the document carries an HMAC-SHA256
//! over its other fields and unsigned or tampered payloads are refused.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use bailiff_common::{AppError, AppResult, config::QrConfig};

type HmacSha256 = Hmac<Sha256>;

/// Current payload version.
pub const QR_VERSION: u8 = 1;

/// Tolerated clock skew for `issued_at` in the future.
const MAX_FUTURE_SKEW_MINUTES: i64 = 5;

/// Fields embedded in a hearing QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// Payload version.
    pub v: u8,
    /// Case the hearing belongs to.
    pub case_id: String,
    /// Hearing session ID.
    pub hearing_id: String,
    /// Hearing date.
    pub hearing_date: NaiveDate,
    /// Manual fallback code of the same hearing.
    pub manual_code: String,
    /// When the code was generated.
    pub issued_at: DateTime<Utc>,
    /// Random nonce; keeps payloads unique even for identical hearings.
    pub nonce: String,
}

#[derive(Serialize, Deserialize)]
struct SignedPayload {
    #[serde(flatten)]
    payload: QrPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sig: Option<String>,
}

/// Encoder/decoder for hearing QR content.
#[derive(Clone)]
pub struct QrCodec {
    secret: Option<Vec<u8>>,
    max_age: Duration,
}

impl QrCodec {
    /// Create a codec from configuration.
    #[must_use]
    pub fn new(config: &QrConfig) -> Self {
        Self {
            secret: config
                .signing_secret
                .as_ref()
                .filter(|s| !s.is_empty())
                .map(|s| s.as_bytes().to_vec()),
            max_age: Duration::days(config.max_age_days),
        }
    }

    /// Whether payloads are signed.
    #[must_use]
    pub const fn is_signing(&self) -> bool {
        self.secret.is_some()
    }

    /// Encode a payload into the text stored in the hearing and rendered as a QR image.
    pub fn encode(&self, payload: &QrPayload) -> AppResult<String> {
        let sig = self.sign(payload)?;
        serde_json::to_string(&SignedPayload {
            payload: payload.clone(),
            sig,
        })
        .map_err(|e| AppError::Internal(format!("Failed to encode QR payload: {e}")))
    }

    /// Decode scanned text, checking shape, signature and age. Age is
    /// counted from the start of the hearing day, or from issue if that is
    /// later.
    pub fn decode(&self, raw: &str, now: DateTime<Utc>) -> AppResult<QrPayload> {
        let signed: SignedPayload = serde_json::from_str(raw.trim())
            .map_err(|_| AppError::BadRequest("Malformed QR code".to_string()))?;

        if signed.payload.v != QR_VERSION {
            return Err(AppError::BadRequest(format!(
                "Unsupported QR code version {}",
                signed.payload.v
            )));
        }

        if let Some(secret) = &self.secret {
            let sig = signed
                .sig
                .as_deref()
                .and_then(|s| hex::decode(s).ok())
                .ok_or_else(|| AppError::BadRequest("QR code is not signed".to_string()))?;
            let mut mac = new_mac(secret)?;
            mac.update(canonical(&signed.payload)?.as_bytes());
            mac.verify_slice(&sig)
                .map_err(|_| AppError::BadRequest("QR code signature mismatch".to_string()))?;
        }

        let issued_at = signed.payload.issued_at;
        if issued_at > now + Duration::minutes(MAX_FUTURE_SKEW_MINUTES) {
            return Err(AppError::BadRequest("QR code issued in the future".to_string()));
        }
        let hearing_day = signed.payload.hearing_date.and_time(NaiveTime::MIN).and_utc();
        if now - hearing_day.max(issued_at) > self.max_age {
            return Err(AppError::BadRequest("QR code has expired".to_string()));
        }

        Ok(signed.payload)
    }

    fn sign(&self, payload: &QrPayload) -> AppResult<Option<String>> {
        let Some(secret) = &self.secret else {
            return Ok(None);
        };
        let mut mac = new_mac(secret)?;
        mac.update(canonical(payload)?.as_bytes());
        Ok(Some(hex::encode(mac.finalize().into_bytes())))
    }
}

fn new_mac(secret: &[u8]) -> AppResult<HmacSha256> {
    HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Config(format!("Invalid QR signing secret: {e}")))
}

fn canonical(payload: &QrPayload) -> AppResult<String> {
    serde_json::to_string(payload)
        .map_err(|e| AppError::Internal(format!("Failed to encode QR payload: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn payload(issued_at: DateTime<Utc>) -> QrPayload {
        QrPayload {
            v: QR_VERSION,
            case_id: "c1".to_string(),
            hearing_id: "h1".to_string(),
            hearing_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            manual_code: "K7QH3XPD".to_string(),
            issued_at,
            nonce: "n0nce".to_string(),
        }
    }

    fn codec(secret: Option<&str>) -> QrCodec {
        QrCodec::new(&QrConfig {
            signing_secret: secret.map(str::to_string),
            max_age_days: 30,
        })
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_unsigned_round_trip() {
        let codec = codec(None);
        let raw = codec.encode(&payload(t0())).unwrap();
        assert!(!raw.contains("sig"));
        assert_eq!(codec.decode(&raw, t0()).unwrap(), payload(t0()));
    }

    #[test]
    fn test_signed_payload_rejects_tampering() {
        let codec = codec(Some("s3cret"));
        let raw = codec.encode(&payload(t0())).unwrap();
        assert!(codec.decode(&raw, t0()).is_ok());

        let tampered = raw.replace("\"c1\"", "\"c2\"");
        let err = codec.decode(&tampered, t0()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("signature")));
    }

    #[test]
    fn test_signing_codec_refuses_unsigned() {
        let raw = codec(None).encode(&payload(t0())).unwrap();
        let err = codec(Some("s3cret")).decode(&raw, t0()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("not signed")));
    }

    #[test]
    fn test_expired_payload() {
        let codec = codec(None);
        let raw = codec.encode(&payload(t0())).unwrap();
        let hearing_day = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();

        assert!(codec.decode(&raw, hearing_day + Duration::days(29)).is_ok());
        assert!(matches!(
            codec.decode(&raw, hearing_day + Duration::days(31)),
            Err(AppError::BadRequest(m)) if m.contains("expired")
        ));
    }

    #[test]
    fn test_far_future_hearing_code_is_fresh_on_the_day() {
        let codec = codec(None);
        let mut far = payload(t0());
        far.hearing_date = NaiveDate::from_ymd_opt(2027, 6, 15).unwrap();
        let raw = codec.encode(&far).unwrap();

        let on_the_day = Utc.with_ymd_and_hms(2027, 6, 15, 5, 0, 0).unwrap();
        assert_eq!(codec.decode(&raw, on_the_day).unwrap(), far);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            codec(None).decode("K7QH3XPD", t0()),
            Err(AppError::BadRequest(_))
        ));
    }
}
