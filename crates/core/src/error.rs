//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only. Storage and transport failures have
/// their own error types in the crates that own them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more fields failed validation. Every message is kept so the
    /// caller can report them all at once.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Field messages for `Validation`, empty otherwise.
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Validation(msgs) => msgs,
            _ => &[],
        }
    }
}

/// Accumulates field-level validation messages.
///
/// ```ignore
/// let mut v = Validator::default();
/// v.check(name.len() >= 2, "name must be at least 2 characters");
/// v.finish()?;
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn check(&mut self, ok: bool, msg: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(msg.into());
        }
        self
    }

    /// Record the message of a failed result and return its value if any.
    pub fn absorb<T>(&mut self, result: DomainResult<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                match e {
                    DomainError::Validation(msgs) => self.errors.extend(msgs),
                    other => self.errors.push(other.to_string()),
                }
                None
            }
        }
    }

    pub fn finish(&mut self) -> DomainResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_collects_every_message() {
        let mut v = Validator::default();
        v.check(false, "a").check(true, "b").check(false, "c");
        let err = v.finish().unwrap_err();
        assert_eq!(err.messages(), &["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn validator_passes_when_clean() {
        let mut v = Validator::default();
        v.check(true, "never");
        assert!(v.finish().is_ok());
    }
}
