//! Authentication bootstrap: the login cookie and the `/login` exchange.

pub mod cookie;
pub mod login;

pub use cookie::{AuthCookie, AuthCookieGenerator, NonceCounter};
pub use login::{build_login_request, extract_session_cookie, login, Credentials, LOGIN_PATH};
