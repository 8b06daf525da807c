use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_message_is_reported() {
        let error = DomainError::invariant("feed subject is not a group");
        assert_eq!(
            error.to_string(),
            "domain invariant violated: feed subject is not a group"
        );
    }
}
