use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::answers::{FenceType, Surface};
use crate::estimate::EstimateError;
use crate::savings::SavingsError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("percentage split must sum to 100, got {total}")]
    InvalidSplit { total: u32 },
    #[error("a gate can only be placed on a screen, not on {fence_type:?}")]
    GateNotAllowed { fence_type: FenceType },
    #[error("material set for {surface:?} while its share is 0%")]
    MaterialWithoutShare { surface: Surface },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Estimate(#[from] EstimateError),
    #[error(transparent)]
    Savings(#[from] SavingsError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("invalid input: {0}")]
    Input(String),
}

impl ApplicationError {
    /// Customer-safe text; never exposes internal detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(_) | Self::Input(_) => {
                "De ingevoerde gegevens zijn niet geldig. Controleer ze en probeer het opnieuw."
            }
            Self::Estimate(_) => {
                "Op basis van de ingevulde gegevens kan ik nu nog geen betrouwbare prijsindicatie geven."
            }
            Self::Savings(SavingsError::LimitReached { .. }) => {
                "Het maximale aantal aanpassingen is bereikt. We denken graag persoonlijk met u mee."
            }
            Self::Savings(_) => "Deze bespaaroptie is nu niet beschikbaar.",
            Self::Configuration(_) => "Er ging intern iets mis. Probeer het later opnieuw.",
        }
    }

    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConfigError;
    use crate::domain::answers::FenceType;
    use crate::errors::{ApplicationError, DomainError};
    use crate::savings::SavingsError;

    #[test]
    fn domain_error_maps_to_input_message() {
        let error = ApplicationError::from(DomainError::InvalidSplit { total: 110 });

        assert!(error.is_user_error());
        assert_eq!(
            error.user_message(),
            "De ingevoerde gegevens zijn niet geldig. Controleer ze en probeer het opnieuw."
        );
        assert_eq!(error.to_string(), "percentage split must sum to 100, got 110");
    }

    #[test]
    fn limit_reached_has_dedicated_customer_message() {
        let error = ApplicationError::from(SavingsError::LimitReached { max_applied_changes: 5 });

        assert!(error.user_message().contains("maximale aantal aanpassingen"));
    }

    #[test]
    fn configuration_error_is_not_a_user_error() {
        let error = ApplicationError::from(ConfigError::Validation(
            "savings.max_applied_changes must be greater than 0".to_owned(),
        ));

        assert!(!error.is_user_error());
        assert_eq!(error.user_message(), "Er ging intern iets mis. Probeer het later opnieuw.");
    }

    #[test]
    fn gate_error_names_the_fence_type() {
        let error = DomainError::GateNotAllowed { fence_type: FenceType::Hedge };
        assert!(error.to_string().contains("Hedge"));
    }
}
