use std::{borrow::Cow, time::Duration};
use trillium::Conn;
use trillium_cookies::{
    cookie::{time, Cookie, SameSite},
    CookiesHandler,
};
use trillium_login::*;
use trillium_testing::{prelude::*, TestConn};

const SECRET: &[u8] = b"kfjwelkfjwoepfjwoeifjlwekjkfjwelkfjwoepfjwoeifjlwekj";

struct User(String);

impl Identity for User {
    fn identifier(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.0))
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}

fn handler(policy: Policy) -> impl trillium::Handler {
    let login = LoginHandler::new(SECRET, |id: &str| Some(User(id.to_string())));
    login.apply_configuration(policy).unwrap();
    (CookiesHandler::new(), login, app)
}

async fn app(mut conn: Conn) -> Conn {
    match conn.path() {
        "/login" => {
            conn.login(&User("ritik".into())).unwrap();
        }
        "/logout" => conn.logout(),
        _ => {}
    }
    conn.ok("ok")
}

fn set_cookie(mut conn: TestConn) -> Cookie<'static> {
    let header = conn
        .headers_mut()
        .get_str("set-cookie")
        .expect("a set-cookie header")
        .to_string();
    Cookie::parse_encoded(header).unwrap()
}

fn login_cookie(policy: Policy) -> Cookie<'static> {
    set_cookie(get("/login").on(&handler(policy)))
}

fn seconds(duration: Duration) -> Option<time::Duration> {
    Some(time::Duration::seconds(duration.as_secs() as i64))
}

#[test]
fn defaults() {
    let cookie = login_cookie(Policy::default());
    assert_eq!(cookie.name(), DEFAULT_COOKIE_NAME);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.domain(), None);
    assert!(!cookie.secure().unwrap_or(false));
    assert_eq!(cookie.max_age(), None);
}

#[test]
fn http_only() {
    let cookie = login_cookie(Policy::default().with_http_only(false));
    assert!(!cookie.http_only().unwrap_or(false));
}

#[test]
fn same_site() {
    let cookie = login_cookie(Policy::default().with_same_site(SameSite::Strict));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));

    let cookie = login_cookie(
        Policy::default()
            .with_same_site(SameSite::None)
            .with_secure(true),
    );
    assert_eq!(cookie.same_site(), Some(SameSite::None));
    assert_eq!(cookie.secure(), Some(true));

    let cookie = login_cookie(Policy::default().with_same_site(None));
    assert_eq!(cookie.same_site(), None);
}

#[test]
fn path_and_domain() {
    let cookie = login_cookie(Policy::default().with_path("/dashboard").with_domain("example"));
    assert_eq!(cookie.path(), Some("/dashboard"));
    assert_eq!(cookie.domain(), Some("example"));
}

#[test]
fn remember() {
    let cookie = login_cookie(Policy::default().with_remember(true));
    assert_eq!(cookie.max_age(), seconds(DEFAULT_UNACCESSED_TIMEOUT));
    assert_eq!(cookie.max_age(), Some(time::Duration::seconds(5_184_000)));

    let ninety_three_days = Duration::from_secs(93 * 24 * 60 * 60);
    let cookie = login_cookie(
        Policy::default()
            .with_remember(true)
            .with_unaccessed_timeout(ninety_three_days),
    );
    assert_eq!(cookie.max_age(), seconds(ninety_three_days));

    // the unaccessed timeout means nothing without remember
    let cookie = login_cookie(Policy::default().with_unaccessed_timeout(ninety_three_days));
    assert_eq!(cookie.max_age(), None);
}

#[test]
fn logout_cookie_shares_attributes() {
    let policy = Policy::default()
        .with_remember(true)
        .with_path("/dashboard")
        .with_domain("example")
        .with_secure(true)
        .with_same_site(SameSite::Strict);

    let cookie = set_cookie(get("/logout").on(&handler(policy)));
    assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    assert_eq!(cookie.path(), Some("/dashboard"));
    assert_eq!(cookie.domain(), Some("example"));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    assert_eq!(cookie.http_only(), Some(true));
}

#[test]
fn rejected_configuration_changes_nothing() {
    let login = LoginHandler::new(SECRET, |id: &str| Some(User(id.to_string())));
    login
        .apply_configuration(Policy::default().with_path("/dashboard").with_secure(true))
        .unwrap();

    assert_eq!(
        login.apply_configuration(
            Policy::default()
                .with_path("/elsewhere")
                .with_same_site(SameSite::None)
        ),
        Err(ConfigurationError::InsecureSameSiteNone)
    );

    let cookie = set_cookie(get("/login").on(&(CookiesHandler::new(), login, app)));
    assert_eq!(cookie.path(), Some("/dashboard"));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
}

#[test]
fn configuration_can_change_at_runtime() {
    let login = LoginHandler::new(SECRET, |id: &str| Some(User(id.to_string())));
    let policy = login.policy_handle();
    let handler = (CookiesHandler::new(), login, app);

    let cookie = set_cookie(get("/login").on(&handler));
    assert_eq!(cookie.path(), Some("/"));

    policy.apply(Policy::default().with_path("/dashboard")).unwrap();
    let cookie = set_cookie(get("/login").on(&handler));
    assert_eq!(cookie.path(), Some("/dashboard"));

    policy.reset();
    let cookie = set_cookie(get("/login").on(&handler));
    assert_eq!(cookie.path(), Some("/"));
}

#[test]
fn reset_configuration() {
    let login = LoginHandler::new(SECRET, |id: &str| Some(User(id.to_string())));
    login
        .apply_configuration(Policy::default().with_remember(true).with_http_only(false))
        .unwrap();
    login.reset_configuration();
    assert_eq!(*login.policy_handle().current(), Policy::default());

    let cookie = set_cookie(get("/login").on(&(CookiesHandler::new(), login, app)));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.max_age(), None);
}
