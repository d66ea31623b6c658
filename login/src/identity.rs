use crate::IdentityContractError;
use std::borrow::Cow;

/**
The two capabilities an application's user type must provide to be
logged in.

```
use std::borrow::Cow;
use trillium_login::Identity;

struct User {
    username: String,
}

impl Identity for User {
    fn identifier(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.username))
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}
```
*/
pub trait Identity {
    /// An opaque, non-empty string that the user loader will later be
    /// called with. `None` means this identity cannot be logged in.
    fn identifier(&self) -> Option<Cow<'_, str>>;

    /// whether this identity represents an authenticated user
    fn is_authenticated(&self) -> bool;
}

pub(crate) fn verified_identifier(
    identity: &(impl Identity + ?Sized),
) -> Result<String, IdentityContractError> {
    match identity.identifier() {
        None => Err(IdentityContractError::MissingIdentifier),
        Some(id) if id.is_empty() => Err(IdentityContractError::EmptyIdentifier),
        Some(id) => Ok(id.into_owned()),
    }
}

/// The identity of a conn that has no logged in user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Anonymous;

impl Identity for Anonymous {
    fn identifier(&self) -> Option<Cow<'_, str>> {
        None
    }

    fn is_authenticated(&self) -> bool {
        false
    }
}

/**
The result of [`LoginConnExt::current_user`](crate::LoginConnExt::current_user).

This is never absent: conns without a logged in user resolve to
[`CurrentUser::Anonymous`], which implements [`Identity`] like any
other user, so templates and handlers can ask
[`Identity::is_authenticated`] without first checking for a user.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CurrentUser<U> {
    /// no user is logged in, or the user could not be loaded
    Anonymous,
    /// the user loaded for the session's user id
    User(U),
}

impl<U> Default for CurrentUser<U> {
    fn default() -> Self {
        Self::Anonymous
    }
}

impl<U> CurrentUser<U> {
    /// the logged in user, if any
    pub fn user(&self) -> Option<&U> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    /// converts into the logged in user, if any
    pub fn into_user(self) -> Option<U> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    /// whether this is the anonymous sentinel
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl<U> From<Option<U>> for CurrentUser<U> {
    fn from(user: Option<U>) -> Self {
        user.map_or(Self::Anonymous, Self::User)
    }
}

impl<U: Identity> Identity for CurrentUser<U> {
    fn identifier(&self) -> Option<Cow<'_, str>> {
        self.user().and_then(|user| user.identifier())
    }

    fn is_authenticated(&self) -> bool {
        self.user().map_or(false, |user| user.is_authenticated())
    }
}
