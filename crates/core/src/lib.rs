pub mod config;
pub mod error;
pub mod token;

pub use config::AppConfig;
pub use error::{FieldErrors, MailportError, MailportResult};
