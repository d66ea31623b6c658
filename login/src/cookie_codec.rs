use crate::{DecodeError, SessionRecord};
use std::fmt::{self, Debug, Formatter};
use trillium_cookies::cookie::{Cookie, CookieJar, Key};

/**
Serializes [`SessionRecord`]s into encrypted cookie values and back.

Records are written as json and sealed with the authenticated
encryption of the [`cookie`](trillium_cookies::cookie) crate's private
jar. The cookie name is bound into the ciphertext, so a value only
decodes under the same name and key it was encoded with.

```
use trillium_login::{CookieCodec, SessionRecord};
use trillium_cookies::cookie::Key;

let codec = CookieCodec::new(Key::generate(), "_login-session");
let record = SessionRecord::issue("sehwag", std::time::Duration::ZERO, chrono::Utc::now());
let ciphertext = codec.encode(&record);
assert_eq!(codec.decode(&ciphertext).unwrap(), record);

let other = CookieCodec::new(Key::generate(), "_login-session");
assert!(other.decode(&ciphertext).is_err());
```
*/
#[derive(Clone)]
pub struct CookieCodec {
    key: Key,
    cookie_name: String,
}

impl Debug for CookieCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieCodec")
            .field("key", &"<<secret>>")
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl CookieCodec {
    /// builds a codec that seals values for `cookie_name` with `key`
    pub fn new(key: Key, cookie_name: impl Into<String>) -> Self {
        Self {
            key,
            cookie_name: cookie_name.into(),
        }
    }

    /// Returns a codec with the same key and a different cookie name.
    /// Values encoded under the previous name no longer decode.
    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    /// the cookie name bound into every ciphertext
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Serializes and encrypts a record, returning the cookie value.
    pub fn encode(&self, record: &SessionRecord) -> String {
        let plaintext =
            serde_json::to_string(record).expect("session records always serialize to json");

        let mut jar = CookieJar::new();
        jar.private_mut(&self.key)
            .add(Cookie::new(self.cookie_name.clone(), plaintext));

        jar.get(&self.cookie_name)
            .expect("private jar holds the cookie it was just given")
            .value()
            .to_owned()
    }

    /**
    Decrypts and parses a cookie value.

    A wrong key, a tampered or truncated value, json that does not
    describe a record, and a valid record with an empty user id are all
    rejected. No partially populated record is ever returned.
    */
    pub fn decode(&self, value: &str) -> Result<SessionRecord, DecodeError> {
        let mut jar = CookieJar::new();
        jar.add_original(Cookie::new(self.cookie_name.clone(), value.to_owned()));

        let plaintext = jar
            .private(&self.key)
            .get(&self.cookie_name)
            .ok_or(DecodeError::Decrypt)?;

        let record: SessionRecord = serde_json::from_str(plaintext.value())?;

        if record.is_valid() && record.user_id().is_empty() {
            return Err(DecodeError::EmptyUserId);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn codec() -> CookieCodec {
        CookieCodec::new(
            Key::derive_from(b"an unremarkable secret that is more than 32 bytes long"),
            "_login-session",
        )
    }

    fn record() -> SessionRecord {
        SessionRecord::issue(
            "sehwag",
            Duration::from_secs(60 * 60 * 24 * 365),
            Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap(),
        )
    }

    /// seals arbitrary plaintext the way `encode` would, bypassing serde
    fn seal(codec: &CookieCodec, plaintext: &str) -> String {
        let mut jar = CookieJar::new();
        jar.private_mut(&codec.key)
            .add(Cookie::new(codec.cookie_name.clone(), plaintext.to_owned()));
        jar.get(&codec.cookie_name).unwrap().value().to_owned()
    }

    #[test]
    fn round_trip() {
        let codec = codec();
        let record = record();
        let ciphertext = codec.encode(&record);
        assert!(!ciphertext.contains("sehwag"));
        assert_eq!(codec.decode(&ciphertext).unwrap(), record);

        let revoked = SessionRecord::revoked(Utc::now());
        assert_eq!(codec.decode(&codec.encode(&revoked)).unwrap(), revoked);
    }

    #[test]
    fn encryption_is_not_deterministic() {
        let codec = codec();
        assert_ne!(codec.encode(&record()), codec.encode(&record()));
    }

    #[test]
    fn wrong_key() {
        let ciphertext = codec().encode(&record());
        let other = CookieCodec::new(Key::generate(), "_login-session");
        assert!(matches!(other.decode(&ciphertext), Err(DecodeError::Decrypt)));
    }

    #[test]
    fn wrong_cookie_name() {
        let ciphertext = codec().encode(&record());
        let renamed = codec().with_cookie_name("_other-session");
        assert!(matches!(renamed.decode(&ciphertext), Err(DecodeError::Decrypt)));
    }

    #[test]
    fn tampered_ciphertext() {
        let codec = codec();
        let ciphertext = codec.encode(&record());

        let mut bytes = ciphertext.clone().into_bytes();
        let middle = bytes.len() / 2;
        bytes[middle] = if bytes[middle] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(codec.decode(&tampered), Err(DecodeError::Decrypt)));
        assert!(matches!(
            codec.decode(&ciphertext[..ciphertext.len() / 2]),
            Err(DecodeError::Decrypt)
        ));
        assert!(matches!(codec.decode(""), Err(DecodeError::Decrypt)));
        assert!(matches!(codec.decode("not even base64!"), Err(DecodeError::Decrypt)));
    }

    #[test]
    fn malformed_payloads() {
        let codec = codec();

        for plaintext in [
            "not json",
            r#"{"_user-id": "sehwag", "_valid-session": true}"#,
            r#"{"_user-id": "sehwag", "_accessed-timeout": "14 Mar 2025"}"#,
            r#"{"_user-id": "sehwag", "_accessed-timeout": "2025-03-14", "_valid-session": true}"#,
            r#"{"_user-id": 7, "_accessed-timeout": "14 Mar 2025", "_valid-session": true}"#,
            r#"{"_user-id": "sehwag", "_accessed-timeout": "14 Mar 2025", "_valid-session": "yes"}"#,
        ] {
            assert!(
                matches!(codec.decode(&seal(&codec, plaintext)), Err(DecodeError::Malformed(_))),
                "{plaintext} should be rejected"
            );
        }
    }

    #[test]
    fn valid_record_requires_user_id() {
        let codec = codec();
        let sealed = seal(
            &codec,
            r#"{"_user-id": "", "_accessed-timeout": "14 Mar 2025", "_valid-session": true}"#,
        );
        assert!(matches!(codec.decode(&sealed), Err(DecodeError::EmptyUserId)));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let codec = codec();
        let sealed = seal(
            &codec,
            r#"{"_user-id": "ritik", "_accessed-timeout": "14 Mar 2025", "_valid-session": true, "extra": []}"#,
        );
        assert_eq!(codec.decode(&sealed).unwrap().user_id(), "ritik");
    }
}
