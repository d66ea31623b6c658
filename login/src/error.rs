use thiserror::Error;

/// An illegal combination of [`Policy`](crate::Policy) values. The
/// policy in effect is left unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// `SameSite=None` is only accepted by browsers on secure cookies
    #[error("invalid combination of values (same_site=None, secure=false)")]
    InsecureSameSiteNone,
}

/// The identity handed to [`LoginConnExt::login`](crate::LoginConnExt::login)
/// does not satisfy the [`Identity`](crate::Identity) contract.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentityContractError {
    /// the identity did not produce an identifier
    #[error("identity did not provide an identifier")]
    MissingIdentifier,

    /// the identity produced an empty identifier
    #[error("identity provided an empty identifier")]
    EmptyIdentifier,
}

/// A session cookie value that could not be turned back into a
/// [`SessionRecord`](crate::SessionRecord).
///
/// The login handler never surfaces this to the application; a cookie
/// that fails to decode is treated as no session at all.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// wrong key, tampered or truncated ciphertext
    #[error("session cookie could not be decrypted")]
    Decrypt,

    /// the plaintext did not describe a session record
    #[error("session cookie payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// a valid record must name a user
    #[error("session cookie payload has an empty user id")]
    EmptyUserId,
}

/// The login handler could not be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InitializationError {
    /// no secret was supplied
    #[error("login secret is not defined")]
    MissingSecret,

    /// the secret is too short to derive an encryption key from
    #[error("login secret must be at least {minimum} bytes, got {len}")]
    SecretTooShort {
        /// the length of the provided secret
        len: usize,
        /// the minimum accepted length
        minimum: usize,
    },
}
