use crate::{
    login_handler::{LoginContext, UserLoader},
    CurrentUser, Identity, IdentityContractError, LoginSession, SessionRecord,
};
use trillium::Conn;

/**
extension trait to add login support to [`Conn`]

[`LoginHandler`](crate::LoginHandler) **MUST** be called on the conn
prior to using any of these functions.
*/
pub trait LoginConnExt {
    /**
    Logs `identity` in. The login cookie is sent with this response
    and the conn acts as `identity` for the rest of this request.

    Checking credentials is the application's responsibility; this
    only records the result. An identity without an
    [`Identity::identifier`] is rejected and nothing changes.
    */
    fn login(&mut self, identity: &impl Identity) -> Result<(), IdentityContractError>;

    /// Requests that the session cookie be cleared when the response is
    /// sent. The next request will be anonymous.
    fn logout(&mut self);

    /// chainable form of [`LoginConnExt::logout`]
    fn with_logout(self) -> Self;

    /// withdraws a logout requested earlier in this request
    fn cancel_logout(&mut self);

    /**
    The user this conn acts as, loaded with the function passed to
    [`LoginHandler::new`](crate::LoginHandler::new).

    Returns [`CurrentUser::Anonymous`] if nobody is logged in or the
    loader returns `None`. The loader is called every time this is
    called.
    */
    fn current_user<U: 'static>(&self) -> CurrentUser<U>;

    /// the session record for the logged in user, if any
    fn session_data(&self) -> Option<&SessionRecord>;

    /// retrieve a reference to the current login session
    fn login_session(&self) -> &LoginSession;

    /// retrieve a mutable reference to the current login session
    fn login_session_mut(&mut self) -> &mut LoginSession;
}

impl LoginConnExt for Conn {
    fn login(&mut self, identity: &impl Identity) -> Result<(), IdentityContractError> {
        let context = self
            .state::<LoginContext>()
            .expect("LoginHandler must be executed before calling LoginConnExt::login")
            .clone();

        self.login_session_mut()
            .login(identity, context.policy().accessed_timeout(), context.now())
            .map(|_| ())
            .map_err(|e| {
                log::warn!("login rejected: {e}");
                e
            })
    }

    fn logout(&mut self) {
        self.login_session_mut().logout();
    }

    fn with_logout(mut self) -> Self {
        self.logout();
        self
    }

    fn cancel_logout(&mut self) {
        self.login_session_mut().cancel_logout();
    }

    fn current_user<U: 'static>(&self) -> CurrentUser<U> {
        let Some(user_id) = self.login_session().current_user_id() else {
            return CurrentUser::Anonymous;
        };

        let Some(loader) = self.state::<UserLoader<U>>() else {
            log::error!(
                "no LoginHandler for {} has been run on this conn",
                std::any::type_name::<U>()
            );
            return CurrentUser::Anonymous;
        };

        let user = loader.load(user_id);
        if user.is_none() {
            log::warn!("could not load user {user_id}, treating conn as anonymous");
        }

        user.into()
    }

    fn session_data(&self) -> Option<&SessionRecord> {
        self.login_session().session_data()
    }

    fn login_session(&self) -> &LoginSession {
        self.state()
            .expect("LoginHandler must be executed before calling LoginConnExt::login_session")
    }

    fn login_session_mut(&mut self) -> &mut LoginSession {
        self.state_mut()
            .expect("LoginHandler must be executed before calling LoginConnExt::login_session_mut")
    }
}
