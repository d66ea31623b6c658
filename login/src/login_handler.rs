use crate::{
    ConfigurationError, CookieCodec, CookieDirective, InitializationError, LoginSession, Policy,
    PolicyHandle, SessionRecord, SessionState,
};
use chrono::{DateTime, Utc};
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};
use trillium::{async_trait, Conn, Handler};
use trillium_cookies::{
    cookie::{Cookie, Key},
    CookiesConnExt,
};

/// the session cookie name used unless [`LoginHandler::with_cookie_name`] is called
pub const DEFAULT_COOKIE_NAME: &str = "_login-session";

/// the environment variable read by [`LoginHandler::from_env`]
pub const SECRET_ENV_VAR: &str = "TRILLIUM_LOGIN_SECRET";

/// the shortest secret an encryption key will be derived from
pub const MINIMUM_SECRET_LEN: usize = 32;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync + 'static>;

pub(crate) struct UserLoader<U>(Arc<dyn Fn(&str) -> Option<U> + Send + Sync + 'static>);

impl<U> Clone for UserLoader<U> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<U> UserLoader<U> {
    pub(crate) fn load(&self, user_id: &str) -> Option<U> {
        (self.0)(user_id)
    }
}

/// Per-conn access to the handler's policy and clock, used by
/// [`LoginConnExt::login`](crate::LoginConnExt::login).
#[derive(Clone)]
pub(crate) struct LoginContext {
    policy: PolicyHandle,
    clock: Clock,
}

impl LoginContext {
    pub(crate) fn policy(&self) -> Arc<Policy> {
        self.policy.current()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

/**
# Handler to log users in and out with an encrypted cookie.

The handler reads the session cookie on the way in, places a
[`LoginSession`] into conn state, and on the way out writes whatever
cookie the session asks for: a new login cookie after
[`LoginConnExt::login`](crate::LoginConnExt::login), or an expired one
after [`LoginConnExt::logout`](crate::LoginConnExt::logout) or when the
presented session is past its accessed timeout.

A [`CookiesHandler`](trillium_cookies::CookiesHandler) **MUST** run
before this handler.

`U` is the application's user type, produced by the loader function
from a user id whenever
[`LoginConnExt::current_user`](crate::LoginConnExt::current_user) is
called. Cookies that cannot be decrypted or parsed are ignored and the
conn proceeds as a guest.
*/
pub struct LoginHandler<U> {
    codec: CookieCodec,
    loader: UserLoader<U>,
    context: LoginContext,
}

impl<U> Debug for LoginHandler<U> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginHandler")
            .field("codec", &self.codec)
            .field("policy", &self.context.policy)
            .field("user", &std::any::type_name::<U>())
            .finish()
    }
}

impl<U: 'static> LoginHandler<U> {
    /**
    Constructs a LoginHandler from a secret and a function that loads
    a user from its id. The `secret` MUST be at least 32 bytes long and
    MUST be cryptographically random. It is recommended to retrieve
    this at runtime from the environment, see
    [`LoginHandler::from_env`].

    # Panics

    LoginHandler::new will panic if the secret is empty or fewer than
    32 bytes. See [`LoginHandler::try_new`] for a fallible
    alternative.

    ```
    use trillium_login::{Anonymous, LoginHandler};
    let handler = LoginHandler::new(
        b"this is a secret of no fewer than 32 bytes",
        |_user_id: &str| Some(Anonymous),
    );
    ```
    */
    pub fn new<F>(secret: impl AsRef<[u8]>, loader: F) -> Self
    where
        F: Fn(&str) -> Option<U> + Send + Sync + 'static,
    {
        match Self::try_new(secret, loader) {
            Ok(handler) => handler,
            Err(e) => panic!("{e}"),
        }
    }

    /// Like [`LoginHandler::new`], but returns an
    /// [`InitializationError`] instead of panicking.
    pub fn try_new<F>(secret: impl AsRef<[u8]>, loader: F) -> Result<Self, InitializationError>
    where
        F: Fn(&str) -> Option<U> + Send + Sync + 'static,
    {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(InitializationError::MissingSecret);
        }

        if secret.len() < MINIMUM_SECRET_LEN {
            return Err(InitializationError::SecretTooShort {
                len: secret.len(),
                minimum: MINIMUM_SECRET_LEN,
            });
        }

        Ok(Self {
            codec: CookieCodec::new(Key::derive_from(secret), DEFAULT_COOKIE_NAME),
            loader: UserLoader(Arc::new(loader)),
            context: LoginContext {
                policy: PolicyHandle::default(),
                clock: Arc::new(Utc::now),
            },
        })
    }

    /// Constructs a LoginHandler with the secret found in the
    /// `TRILLIUM_LOGIN_SECRET` environment variable.
    pub fn from_env<F>(loader: F) -> Result<Self, InitializationError>
    where
        F: Fn(&str) -> Option<U> + Send + Sync + 'static,
    {
        let secret = std::env::var(SECRET_ENV_VAR).map_err(|e| {
            log::error!("could not read {SECRET_ENV_VAR}: {e}");
            InitializationError::MissingSecret
        })?;

        Self::try_new(secret, loader)
    }
}

impl<U> LoginHandler<U> {
    /// Sets the name of the session cookie. The default is
    /// `_login-session`. Applications sharing a domain need distinct
    /// names.
    pub fn with_cookie_name(mut self, cookie_name: impl AsRef<str>) -> Self {
        self.codec = self.codec.with_cookie_name(cookie_name.as_ref());
        self
    }

    /**
    Uses `policy` for cookie attributes and timeouts. The handle may be
    shared with other parts of the application, which can then
    reconfigure this handler at runtime.

    ```
    use trillium_login::{Anonymous, LoginHandler, Policy, PolicyHandle};
    # fn main() -> Result<(), Box<dyn std::error::Error>> {
    let policy = PolicyHandle::new(Policy::default().with_remember(true).with_secure(true))?;
    let handler = LoginHandler::new(
        b"this is a secret of no fewer than 32 bytes",
        |_: &str| Some(Anonymous),
    )
    .with_policy_handle(policy.clone());

    policy.reset();
    assert!(!handler.policy_handle().current().remember());
    # Ok(()) }
    ```
    */
    pub fn with_policy_handle(mut self, policy: PolicyHandle) -> Self {
        self.context.policy = policy;
        self
    }

    /// Replaces the source of the current time, which defaults to
    /// [`Utc::now`]. Accessed timeouts are computed and checked against
    /// this clock.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.context.clock = Arc::new(clock);
        self
    }

    /// a handle to the policy this handler uses
    pub fn policy_handle(&self) -> PolicyHandle {
        self.context.policy.clone()
    }

    /// Validates and applies `policy`. If it is rejected, the policy in
    /// effect does not change. See [`PolicyHandle::apply`].
    pub fn apply_configuration(&self, policy: Policy) -> Result<(), ConfigurationError> {
        self.context.policy.apply(policy)
    }

    /// restores the default policy
    pub fn reset_configuration(&self) {
        self.context.policy.reset();
    }

    /// the codec used for the session cookie
    pub fn codec(&self) -> &CookieCodec {
        &self.codec
    }

    fn load_session(&self, conn: &Conn) -> LoginSession {
        let mut session = LoginSession::new();
        let Some(cookie) = conn.cookies().get(self.codec.cookie_name()) else {
            return session;
        };

        session.observe(self.codec.decode(cookie.value()), self.context.now());

        if matches!(session.state(), SessionState::ExpiredPendingLogout(_)) {
            session.logout();
        }

        session
    }

    fn build_cookie(&self, directive: CookieDirective) -> Cookie<'static> {
        let policy = self.context.policy();
        let name = self.codec.cookie_name().to_owned();
        match directive {
            CookieDirective::Login(record) => {
                policy.login_cookie(name, self.codec.encode(&record))
            }

            CookieDirective::Logout => {
                let revoked = SessionRecord::revoked(self.context.now());
                policy.logout_cookie(name, self.codec.encode(&revoked))
            }
        }
    }
}

#[async_trait]
impl<U: 'static> Handler for LoginHandler<U> {
    async fn run(&self, mut conn: Conn) -> Conn {
        let session = match conn.take_state::<LoginSession>() {
            Some(session) => session,
            None => self.load_session(&conn),
        };

        log::trace!("login session state: {:?}", session.state());

        conn.with_state(session)
            .with_state(self.context.clone())
            .with_state(self.loader.clone())
    }

    async fn before_send(&self, mut conn: Conn) -> Conn {
        let Some(mut session) = conn.take_state::<LoginSession>() else {
            return conn;
        };

        if let Some(directive) = session.finalize() {
            log::trace!("writing session cookie for {directive:?}");
            let cookie = self.build_cookie(directive);
            conn.cookies_mut().add(cookie);
        }

        conn.with_state(session)
    }
}
