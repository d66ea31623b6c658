use crate::{
    identity::verified_identifier, DecodeError, Identity, IdentityContractError, SessionRecord,
};
use chrono::{DateTime, Utc};
use std::{mem, time::Duration};

/// Where a conn's session stands within the current request cycle.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    /// no authenticated identity
    #[default]
    Guest,

    /// a valid, unexpired record was presented or issued
    Authenticated(SessionRecord),

    /// A record was presented but its accessed timeout has elapsed. The
    /// conn is treated as a guest and the cookie is cleared on the way out.
    ExpiredPendingLogout(SessionRecord),

    /// Logout was requested during this cycle. Holds the state that
    /// logout was requested from, which
    /// [`LoginSession::cancel_logout`] restores.
    LoggingOut(Box<SessionState>),
}

/// The cookie mutation a finished request cycle asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CookieDirective {
    /// set the session cookie to this newly issued record
    Login(SessionRecord),
    /// expire the session cookie immediately
    Logout,
}

/**
The per-conn login state.

A fresh `LoginSession` is placed into conn state by
[`LoginHandler`](crate::LoginHandler) for every request and finalized
when the response is sent. It is reachable through
[`LoginConnExt::login_session`](crate::LoginConnExt::login_session).
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginSession {
    state: SessionState,
    pending_login: Option<SessionRecord>,
    expired: bool,
}

impl LoginSession {
    /// a guest session with nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    /**
    Incorporates the decoded inbound cookie at time `now`.

    A cookie that failed to decode, or a revoked record, leaves the
    session as a guest. An expired record moves it to
    [`SessionState::ExpiredPendingLogout`]. Anything else authenticates
    it.
    */
    pub fn observe(&mut self, decoded: Result<SessionRecord, DecodeError>, now: DateTime<Utc>) {
        self.state = match decoded {
            Err(e) => {
                log::debug!("ignoring session cookie: {e}");
                SessionState::Guest
            }

            Ok(record) if !record.is_valid() => {
                log::trace!("ignoring revoked session cookie");
                SessionState::Guest
            }

            Ok(record) if record.is_expired(now) => {
                log::debug!(
                    "session for {} expired on {}",
                    record.user_id(),
                    record.accessed_timeout_at()
                );
                SessionState::ExpiredPendingLogout(record)
            }

            Ok(record) => SessionState::Authenticated(record),
        };
        self.expired = matches!(self.state, SessionState::ExpiredPendingLogout(_));
    }

    /**
    Logs `identity` in, issuing a record that expires
    `accessed_timeout` after `now`.

    If the identity does not satisfy the [`Identity`] contract, the
    session is left exactly as it was. If logout was already requested
    during this cycle, or the inbound cookie had expired, the login is
    recorded but no login cookie is sent; logging in again must happen
    on a later request.
    */
    pub fn login(
        &mut self,
        identity: &(impl Identity + ?Sized),
        accessed_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<&SessionRecord, IdentityContractError> {
        let user_id = verified_identifier(identity)?;
        let record = SessionRecord::issue(user_id, accessed_timeout, now);
        log::debug!("logging in {}", record.user_id());

        let authenticated = SessionState::Authenticated(record.clone());
        match &mut self.state {
            SessionState::LoggingOut(prior) => **prior = authenticated,
            state => *state = authenticated,
        }

        Ok(self.pending_login.insert(record))
    }

    /// Requests that the session cookie be cleared when the response is
    /// sent. Requesting logout more than once has no further effect.
    pub fn logout(&mut self) {
        if !self.is_logout_requested() {
            let prior = mem::take(&mut self.state);
            self.state = SessionState::LoggingOut(Box::new(prior));
        }
    }

    /// Withdraws a logout requested during this cycle. An expired
    /// session still has its cookie cleared, even if a login happened
    /// in between.
    pub fn cancel_logout(&mut self) {
        match mem::take(&mut self.state) {
            SessionState::LoggingOut(prior) => self.state = *prior,
            state => {
                log::trace!("cancel_logout called without a pending logout");
                self.state = state;
            }
        }
    }

    /**
    Ends the request cycle, returning the cookie mutation to perform.

    Logout (requested or caused by expiry) takes precedence over a
    pending login and returns the session to [`SessionState::Guest`].
    */
    pub fn finalize(&mut self) -> Option<CookieDirective> {
        let pending_login = self.pending_login.take();
        let clears_cookie = mem::take(&mut self.expired)
            || matches!(
                self.state,
                SessionState::LoggingOut(_) | SessionState::ExpiredPendingLogout(_)
            );

        if clears_cookie {
            if let Some(record) = pending_login {
                log::debug!("discarding login for {}: logout wins", record.user_id());
            }
            self.state = SessionState::Guest;
            Some(CookieDirective::Logout)
        } else {
            pending_login.map(CookieDirective::Login)
        }
    }

    /// the current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The record for the user this conn acts as, if any. A conn that
    /// requested logout keeps acting as its user until the response.
    pub fn session_data(&self) -> Option<&SessionRecord> {
        match &self.state {
            SessionState::Authenticated(record) => Some(record),
            SessionState::LoggingOut(prior) => match &**prior {
                SessionState::Authenticated(record) => Some(record),
                _ => None,
            },
            _ => None,
        }
    }

    /// the user id this conn acts as, if any
    pub fn current_user_id(&self) -> Option<&str> {
        self.session_data().map(SessionRecord::user_id)
    }

    /// whether the session cookie will be cleared when the response is sent
    pub fn is_logout_requested(&self) -> bool {
        matches!(self.state, SessionState::LoggingOut(_))
    }

    /// whether a login cookie is waiting to be sent
    pub fn is_login_pending(&self) -> bool {
        self.pending_login.is_some()
    }

    /// Whether the inbound cookie had expired. Its clearing cannot be
    /// withdrawn during this cycle.
    pub fn is_expired(&self) -> bool {
        self.expired
    }
}
