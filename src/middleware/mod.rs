//! Request authentication and validation

pub mod auth;
pub mod validator;

pub use auth::{AuthError, BearerAuth};
pub use validator::{InputValidator, ValidationError};
