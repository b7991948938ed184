use std::collections::BTreeMap;

use thiserror::Error;

pub type MailportResult<T> = Result<T, MailportError>;

/// Field-level validation messages keyed by input field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field shorthand.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// First message overall, used as the summary line of a 422 response.
    pub fn first_message(&self) -> Option<&str> {
        self.0
            .values()
            .next()
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> MailportResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(MailportError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum MailportError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Mail transport error: {0}")]
    Mail(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl MailportError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }
}
