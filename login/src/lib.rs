#![forbid(unsafe_code)]
#![warn(
    missing_copy_implementations,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    unused_qualifications
)]
/*!
# encrypted cookie logins for trillium

This crate keeps track of who is logged in with a single encrypted
cookie. It does not check passwords and does not store users: the
application decides when someone has proven who they are, calls
[`LoginConnExt::login`], and supplies a function that turns the stored
user id back into a user on later requests.

```
use std::borrow::Cow;
use trillium::Conn;
use trillium_cookies::{cookie::Cookie, CookiesHandler};
use trillium_login::{Identity, LoginConnExt, LoginHandler};

#[derive(Clone)]
struct User(String);

impl Identity for User {
    fn identifier(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.0))
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}

let handler = (
    CookiesHandler::new(),
    LoginHandler::new(
        b"you should use an env var instead of a string literal",
        |id: &str| Some(User(id.to_string())),
    ),
    |mut conn: Conn| async move {
        if conn.path() == "/login" {
            conn.login(&User("sehwag".into())).unwrap();
        }

        let greeting = match conn.current_user::<User>().into_user() {
            Some(User(name)) => format!("hello, {name}"),
            None => String::from("hello, guest"),
        };

        conn.ok(greeting)
    },
);

use trillium_testing::prelude::*;
assert_ok!(get("/").on(&handler), "hello, guest");

let mut conn = get("/login").on(&handler);
assert_ok!(&mut conn, "hello, sehwag");

let set_cookie_header = conn.headers_mut().get_str("set-cookie").unwrap();
let cookie = Cookie::parse_encoded(set_cookie_header).unwrap();

assert_ok!(
    get("/")
        .with_request_header("cookie", format!("{}={}", cookie.name(), cookie.value()))
        .on(&handler),
    "hello, sehwag"
);
```

## Lifecycle

* On the way in, [`LoginHandler`] decrypts the session cookie. A cookie
  that cannot be decrypted or parsed, or that has been revoked, is
  ignored. A cookie past its accessed timeout makes the request
  anonymous and is cleared on the way out.
* Handlers call [`LoginConnExt::login`], [`LoginConnExt::logout`] and
  [`LoginConnExt::current_user`].
* On the way out, a login writes a fresh cookie and a logout writes an
  expired one. If both happened, the logout wins.

Cookie attributes and timeouts are described by a [`Policy`], which can
be changed at runtime through a [`PolicyHandle`].
*/

mod cookie_codec;
pub use cookie_codec::CookieCodec;

mod error;
pub use error::{ConfigurationError, DecodeError, IdentityContractError, InitializationError};

mod identity;
pub use identity::{Anonymous, CurrentUser, Identity};

mod login_conn_ext;
pub use login_conn_ext::LoginConnExt;

mod login_handler;
pub use login_handler::{LoginHandler, DEFAULT_COOKIE_NAME, MINIMUM_SECRET_LEN, SECRET_ENV_VAR};

mod login_session;
pub use login_session::{CookieDirective, LoginSession, SessionState};

mod policy;
pub use policy::{Policy, PolicyHandle, DEFAULT_ACCESSED_TIMEOUT, DEFAULT_UNACCESSED_TIMEOUT};

mod session_record;
pub use session_record::{SessionRecord, ACCESSED_TIMEOUT_FORMAT};
