use serde::Deserialize;
use std::{borrow::Cow, collections::HashMap, error::Error, sync::Arc};
use trillium::{Conn, Handler};
use trillium_cookies::CookiesHandler;
use trillium_login::{CurrentUser, Identity, LoginConnExt, LoginHandler, Policy};
use trillium_router::{Router, RouterConnExt};

#[derive(Clone, Debug)]
struct User {
    username: String,
    password: String,
}

impl Identity for User {
    fn identifier(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.username))
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}

type Users = Arc<HashMap<String, User>>;

fn users() -> Users {
    let users = [("ritik", "hunter2"), ("sehwag", "correct horse")]
        .into_iter()
        .map(|(username, password)| {
            let user = User {
                username: username.into(),
                password: password.into(),
            };
            (user.username.clone(), user)
        })
        .collect();

    Arc::new(users)
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

fn login(users: Users) -> impl Handler {
    move |mut conn: Conn| {
        let users = users.clone();
        async move {
            let body = match conn.request_body_string().await {
                Ok(body) => body,
                Err(e) => return conn.with_status(400).with_body(e.to_string()).halt(),
            };

            let form: LoginForm = match serde_urlencoded::from_str(&body) {
                Ok(form) => form,
                Err(e) => return conn.with_status(400).with_body(e.to_string()).halt(),
            };

            let user = users
                .get(&form.username)
                .filter(|user| user.password == form.password);

            match user {
                Some(user) => match conn.login(user) {
                    Ok(()) => conn.with_status(303).with_header("location", "/dashboard"),
                    Err(e) => conn.with_status(500).with_body(e.to_string()),
                },
                None => conn.with_status(403).with_body("no"),
            }
        }
    }
}

async fn dashboard(conn: Conn) -> Conn {
    match conn.current_user::<User>() {
        CurrentUser::User(user) => {
            let body = format!("welcome back, {}", user.username);
            conn.ok(body)
        }
        CurrentUser::Anonymous => conn.with_status(303).with_header("location", "/"),
    }
}

async fn greet(conn: Conn) -> Conn {
    let name = conn.param("name").unwrap_or("stranger").to_owned();
    let body = match conn.current_user::<User>().into_user() {
        Some(user) => format!("{}, this is {name}", user.username),
        None => format!("hello, {name}"),
    };
    conn.ok(body)
}

fn user_loader(users: &Users) -> impl Fn(&str) -> Option<User> + Send + Sync + 'static {
    let users = users.clone();
    move |user_id: &str| users.get(user_id).cloned()
}

fn app(login_handler: LoginHandler<User>, users: Users) -> impl Handler {
    (
        CookiesHandler::new(),
        login_handler,
        Router::new()
            .get("/", |conn: Conn| async move {
                conn.ok("post username and password to /login")
            })
            .post("/login", login(users))
            .post("/logout", |conn: Conn| async move {
                conn.with_logout().with_status(303).with_header("location", "/")
            })
            .get("/dashboard", dashboard)
            .get("/hello/:name", greet),
    )
}

pub fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let users = users();
    let login_handler = LoginHandler::from_env(user_loader(&users))?;
    login_handler.apply_configuration(Policy::default().with_remember(true))?;

    trillium_smol::run(app(login_handler, users));
    Ok(())
}
