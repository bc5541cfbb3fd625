mod dto;
mod extractors;
mod password;
mod services;

pub use dto::{LoginForm, RegisterForm};
pub use extractors::Auth;
pub use services::AuthError;
