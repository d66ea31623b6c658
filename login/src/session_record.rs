use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// the textual format of the accessed timeout date, e.g. `02 Jan 2006`
pub const ACCESSED_TIMEOUT_FORMAT: &str = "%d %b %Y";

/**
The payload carried inside the encrypted session cookie.

A record names a user, the last day on which the cookie may be used
without a fresh credential login, and whether the session has been
explicitly revoked. Records are issued by
[`LoginConnExt::login`](crate::LoginConnExt::login) and reconstructed
from the inbound cookie on every subsequent request.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "_user-id")]
    user_id: String,

    #[serde(rename = "_accessed-timeout", with = "accessed_timeout_date")]
    accessed_timeout_at: NaiveDate,

    #[serde(rename = "_valid-session")]
    valid: bool,
}

impl SessionRecord {
    /// Builds a valid record for `user_id` that expires `accessed_timeout`
    /// after `now`, truncated to the day.
    pub fn issue(
        user_id: impl Into<String>,
        accessed_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            accessed_timeout_at: accessed_timeout_date::after(now, accessed_timeout),
            valid: true,
        }
    }

    /// Builds the invalidated record sent along with a logout
    /// cookie. It never resolves to a user.
    pub fn revoked(now: DateTime<Utc>) -> Self {
        Self {
            user_id: String::new(),
            accessed_timeout_at: now.date_naive(),
            valid: false,
        }
    }

    /// the opaque user identifier supplied at login
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// the day after which this record is no longer honored
    pub fn accessed_timeout_at(&self) -> NaiveDate {
        self.accessed_timeout_at
    }

    /// whether this record has not been revoked
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether the accessed timeout has elapsed at `now`. The date is
    /// interpreted as midnight UTC at the start of that day.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.accessed_timeout_at.and_time(NaiveTime::MIN) < now.naive_utc()
    }
}

mod accessed_timeout_date {
    use super::ACCESSED_TIMEOUT_FORMAT;
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn after(now: DateTime<Utc>, timeout: Duration) -> NaiveDate {
        chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|timeout| now.checked_add_signed(timeout))
            .map_or(NaiveDate::MAX, |then| then.date_naive())
    }

    pub(super) fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&date.format(ACCESSED_TIMEOUT_FORMAT))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&s, ACCESSED_TIMEOUT_FORMAT).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn issue_truncates_to_the_day() {
        let record = SessionRecord::issue("sehwag", DAY * 365, noon());
        assert_eq!(record.user_id(), "sehwag");
        assert!(record.is_valid());
        assert_eq!(
            record.accessed_timeout_at(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
        );
    }

    #[test]
    fn zero_timeout_is_expired_later_the_same_day() {
        let record = SessionRecord::issue("sehwag", Duration::ZERO, noon());
        assert!(record.is_expired(noon()));
        assert!(!record.is_expired(Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap()));
    }

    #[test]
    fn one_day_timeout_expires_after_next_midnight() {
        let record = SessionRecord::issue("sehwag", DAY, noon());
        assert!(!record.is_expired(noon()));
        assert!(!record.is_expired(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()));
        assert!(record.is_expired(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 1).unwrap()));
    }

    #[test]
    fn oversized_timeout_saturates() {
        let record = SessionRecord::issue("sehwag", Duration::MAX, noon());
        assert_eq!(record.accessed_timeout_at(), NaiveDate::MAX);
    }

    #[test]
    fn wire_format_uses_fixed_keys() {
        let record = SessionRecord::issue("ritik", DAY, noon());
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "_user-id": "ritik",
                "_accessed-timeout": "15 Mar 2024",
                "_valid-session": true
            })
        );
    }

    #[test]
    fn revoked_is_invalid() {
        let record = SessionRecord::revoked(noon());
        assert!(!record.is_valid());
        assert_eq!(record.user_id(), "");
    }
}
