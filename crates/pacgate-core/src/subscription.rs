//! Subscription and session model.
//!
//! The backend owns subscriptions. The client keeps a cached copy of the
//! signed-in user record and derives `active` locally as `expires > now`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Subscription status derived from a cached expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct Subscription {
    pub active: bool,
    pub expires: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Status of a subscription expiring at `expires`, evaluated at `now`.
    pub fn at(expires: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            active: expires.is_some_and(|e| e > now),
            expires,
        }
    }

    pub fn inactive() -> Self {
        Self::default()
    }

    /// Expiry as `YYYY-MM-DD`, the way the popup shows it.
    pub fn expires_ymd(&self) -> Option<String> {
        self.expires.map(|e| e.format("%Y-%m-%d").to_string())
    }
}

/// Parses the expiry formats the backend emits.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) and a bare date.
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_expiry))
}

/// Signed-in user as returned by the backend and cached locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub email: String,
    pub api_key: String,
    #[serde(default, deserialize_with = "deserialize_expiry")]
    pub sub_expires: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn subscription(&self, now: DateTime<Utc>) -> Subscription {
        Subscription::at(self.sub_expires, now)
    }
}

/// Cached session state owned by the bridge worker.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<UserRecord>,
    banner: Option<String>,
}

impl Session {
    pub fn new(user: Option<UserRecord>) -> Self {
        Self { user, banner: None }
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    /// Subscription of the signed-in user; inactive when signed out.
    pub fn subscription(&self, now: DateTime<Utc>) -> Subscription {
        self.user
            .as_ref()
            .map(|u| u.subscription(now))
            .unwrap_or_else(Subscription::inactive)
    }

    pub fn replace_user(&mut self, user: Option<UserRecord>) {
        self.user = user;
    }

    /// Non-fatal notice from the last backend exchange.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn set_banner(&mut self, banner: Option<String>) {
        self.banner = banner;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn future_expiry_is_active() {
        let now = Utc::now();
        let sub = Subscription::at(Some(now + Duration::days(3)), now);
        assert!(sub.active);
    }

    #[test]
    fn past_or_missing_expiry_is_inactive() {
        let now = Utc::now();
        assert!(!Subscription::at(Some(now - Duration::seconds(1)), now).active);
        assert!(!Subscription::at(Some(now), now).active);
        assert!(!Subscription::at(None, now).active);
    }

    #[test]
    fn expires_ymd_format() {
        let expires = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        let sub = Subscription::at(Some(expires), expires);
        assert_eq!(sub.expires_ymd().as_deref(), Some("2026-03-07"));
    }

    #[test]
    fn parse_expiry_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_expiry("2026-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_expiry("2026-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_expiry("2026-01-02T03:04:05"), Some(expected));
        assert_eq!(
            parse_expiry("2026-01-02"),
            Some(Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_expiry("soon"), None);
        assert_eq!(parse_expiry(""), None);
    }

    #[test]
    fn user_record_from_backend_json() {
        let json = r#"{"email":"a@b.c","apiKey":"k1","subActive":true,"subExpires":"2030-05-01 00:00:00"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.api_key, "k1");
        assert_eq!(
            user.sub_expires,
            Some(Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn user_record_null_expiry() {
        let json = r#"{"email":"a@b.c","apiKey":"k1","subExpires":null}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert!(user.sub_expires.is_none());
        assert!(!user.subscription(Utc::now()).active);
    }

    #[test]
    fn user_record_survives_cache_round_trip() {
        let user = UserRecord {
            email: "a@b.c".into(),
            api_key: "k1".into(),
            sub_expires: Some(Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap()),
        };
        let cached = serde_json::to_string(&user).unwrap();
        let restored: UserRecord = serde_json::from_str(&cached).unwrap();
        assert_eq!(restored, user);
    }

    #[test]
    fn signed_out_session_is_inactive() {
        let session = Session::default();
        assert!(!session.subscription(Utc::now()).active);
        assert!(session.user().is_none());
    }
}
