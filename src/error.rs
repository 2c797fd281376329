use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmortizationError {
    #[error("Invalid input: {field} ({reason})")]
    InvalidInput { field: String, reason: String },

    #[error("Numeric overflow: {0}")]
    NumericOverflow(String),
}

impl AmortizationError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        AmortizationError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AmortizationError>;

#[cfg(test)]
mod tests {
    use super::AmortizationError;
    use test_log::test;

    #[test]
    fn test_error_messages() {
        let err = AmortizationError::invalid("principal", "must be greater than zero, got 0");
        assert_eq!(
            err.to_string(),
            "Invalid input: principal (must be greater than zero, got 0)"
        );

        let err = AmortizationError::NumericOverflow("(1 + 1)^2000 is not representable".into());
        assert_eq!(
            err.to_string(),
            "Numeric overflow: (1 + 1)^2000 is not representable"
        );
    }
}
