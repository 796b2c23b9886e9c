//! Authentication for PicShare
//!
//! Accounts, password hashing, JWT issuance and validation, the request
//! middleware that turns a bearer token into an [`middleware::AuthUser`],
//! rate limiting and outgoing email.

pub mod jwt;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod tokens;
pub mod validation;

pub use jwt::JwtService;
pub use mailer::{FeedbackMail, Mailer, SmtpMailer};
pub use middleware::AuthUser;
pub use routes::AuthState;
