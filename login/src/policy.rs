use crate::ConfigurationError;
use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use trillium_cookies::cookie::{time, Cookie, SameSite};

const DAY: u64 = 24 * 60 * 60;

/// Default cookie max-age for remembered sessions: sixty days.
pub const DEFAULT_UNACCESSED_TIMEOUT: Duration = Duration::from_secs(60 * DAY);

/// Default lifetime of a session before a credential login is required
/// again: three hundred sixty-five days.
pub const DEFAULT_ACCESSED_TIMEOUT: Duration = Duration::from_secs(365 * DAY);

/**
Cookie attributes and timeouts used for every session cookie.

A policy is built from [`Policy::default`] with the `with_*` methods,
so any value that is not mentioned keeps its default. The defaults are:

* http only: enabled
* same site: lax
* remember: disabled (cookies last for the browser session)
* unaccessed timeout: sixty days
* accessed timeout: three hundred sixty-five days
* domain: none
* path: "/"
* secure: disabled

`SameSite=None` is only valid together with `secure`; see
[`Policy::validate`].
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policy {
    http_only: bool,
    same_site: Option<SameSite>,
    remember: bool,
    unaccessed_timeout: Duration,
    accessed_timeout: Duration,
    domain: Option<String>,
    path: String,
    secure: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            http_only: true,
            same_site: Some(SameSite::Lax),
            remember: false,
            unaccessed_timeout: DEFAULT_UNACCESSED_TIMEOUT,
            accessed_timeout: DEFAULT_ACCESSED_TIMEOUT,
            domain: None,
            path: "/".into(),
            secure: false,
        }
    }
}

impl Policy {
    /// whether the cookie is hidden from client-side scripts
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    /// the same site attribute, if any is sent
    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    /// whether sessions outlive the browser session
    pub fn remember(&self) -> bool {
        self.remember
    }

    /// the cookie max-age applied when [`Policy::remember`] is enabled
    pub fn unaccessed_timeout(&self) -> Duration {
        self.unaccessed_timeout
    }

    /// how long after login a session is honored
    pub fn accessed_timeout(&self) -> Duration {
        self.accessed_timeout
    }

    /// the cookie domain, if any
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// the cookie path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// whether the cookie is restricted to https
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// sets the http only attribute
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Sets the same site attribute. Pass `None` to omit the attribute
    /// entirely and leave the choice to the browser.
    pub fn with_same_site(mut self, same_site: impl Into<Option<SameSite>>) -> Self {
        self.same_site = same_site.into();
        self
    }

    /// When enabled, login cookies carry a max-age of
    /// [`Policy::unaccessed_timeout`] instead of expiring with the
    /// browser session.
    pub fn with_remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// sets the max-age used for remembered sessions
    pub fn with_unaccessed_timeout(mut self, unaccessed_timeout: Duration) -> Self {
        self.unaccessed_timeout = unaccessed_timeout;
        self
    }

    /// Sets how long a session is honored after login. This timeout is
    /// sealed into the cookie at login time and does not move when the
    /// cookie is used.
    pub fn with_accessed_timeout(mut self, accessed_timeout: Duration) -> Self {
        self.accessed_timeout = accessed_timeout;
        self
    }

    /// sets the cookie domain
    pub fn with_domain(mut self, domain: impl AsRef<str>) -> Self {
        self.domain = Some(domain.as_ref().to_owned());
        self
    }

    /// removes the cookie domain
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    /// sets the cookie path
    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        path.as_ref().clone_into(&mut self.path);
        self
    }

    /// sets the secure attribute
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /**
    Checks this policy for illegal combinations.

    ```
    use trillium_login::{ConfigurationError, Policy};
    use trillium_cookies::cookie::SameSite;

    assert!(Policy::default().validate().is_ok());
    assert!(Policy::default().with_same_site(None).validate().is_ok());
    assert_eq!(
        Policy::default().with_same_site(SameSite::None).validate(),
        Err(ConfigurationError::InsecureSameSiteNone)
    );
    assert!(Policy::default()
        .with_same_site(SameSite::None)
        .with_secure(true)
        .validate()
        .is_ok());
    ```
    */
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.same_site == Some(SameSite::None) && !self.secure {
            Err(ConfigurationError::InsecureSameSiteNone)
        } else {
            Ok(())
        }
    }

    pub(crate) fn login_cookie(&self, name: String, value: String) -> Cookie<'static> {
        let mut cookie = self.cookie(name, value);
        if self.remember {
            cookie.set_max_age(max_age(self.unaccessed_timeout));
        }
        cookie
    }

    pub(crate) fn logout_cookie(&self, name: String, value: String) -> Cookie<'static> {
        let mut cookie = self.cookie(name, value);
        cookie.set_max_age(time::Duration::ZERO);
        cookie
    }

    fn cookie(&self, name: String, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(name, value);
        cookie.set_http_only(self.http_only);
        cookie.set_same_site(self.same_site);
        cookie.set_path(self.path.clone());
        cookie.set_secure(self.secure);
        if let Some(domain) = self.domain.clone() {
            cookie.set_domain(domain);
        }
        cookie
    }
}

fn max_age(timeout: Duration) -> time::Duration {
    time::Duration::seconds(i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX))
}

/**
A shared, swappable [`Policy`].

Every clone of a handle refers to the same policy. Updates are
validated before they are stored and replace the whole policy at once,
so a reader observes either the previous policy or the new one and
never a mixture.

Updates are not isolated from requests that are in flight: a response
is built from the policy current when its cookie is written, which may
be newer than the policy current when the request arrived. Deployments
that need stricter behavior should configure the handler once at
startup.
*/
#[derive(Clone, Debug, Default)]
pub struct PolicyHandle(Arc<RwLock<Arc<Policy>>>);

impl PolicyHandle {
    /// builds a handle around `policy` after validating it
    pub fn new(policy: Policy) -> Result<Self, ConfigurationError> {
        policy.validate()?;
        Ok(Self(Arc::new(RwLock::new(Arc::new(policy)))))
    }

    /// a snapshot of the policy currently in effect
    pub fn current(&self) -> Arc<Policy> {
        Arc::clone(&self.0.read().unwrap_or_else(PoisonError::into_inner))
    }

    /**
    Replaces the policy in effect with `policy`.

    If `policy` is invalid, an error is returned and the policy in
    effect is not changed at all.

    ```
    use trillium_login::{Policy, PolicyHandle};
    use trillium_cookies::cookie::SameSite;

    let handle = PolicyHandle::default();
    handle.apply(Policy::default().with_remember(true)).unwrap();
    assert!(handle.current().remember());

    assert!(handle
        .apply(Policy::default().with_same_site(SameSite::None).with_path("/admin"))
        .is_err());
    assert!(handle.current().remember());
    assert_eq!(handle.current().path(), "/");
    ```
    */
    pub fn apply(&self, policy: Policy) -> Result<(), ConfigurationError> {
        policy.validate()?;
        let policy = Arc::new(policy);
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = policy;
        log::debug!("login policy updated");
        Ok(())
    }

    /// restores [`Policy::default`]
    pub fn reset(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Arc::default();
        log::debug!("login policy reset to defaults");
    }
}
