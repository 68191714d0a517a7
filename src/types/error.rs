//! Error types for the billing bridge
//!
//! `BridgeError` covers caller-side defects only: missing or malformed input,
//! no foreground context, and (under the `require` readiness policy) calling
//! an operation before the connection is ready. These are raised before any
//! native call is made and are not retryable.
//!
//! Native-reported failures are never errors. They arrive as a resolved
//! [`crate::types::BillingResult`] with a non-OK response code.

use thiserror::Error;

/// Main error type for the billing bridge
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// A required input field was absent
    #[error("{field} is required")]
    MissingField {
        /// Boundary name of the missing field
        field: String,
    },

    /// A required input field was present but unusable
    #[error("{field} is invalid: {reason}")]
    InvalidField {
        /// Boundary name of the invalid field
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// The billing flow needs a foreground activity and none is available
    #[error("No foreground activity is available to host the billing flow")]
    NoForegroundContext,

    /// An operation was issued before the connection reached Ready
    #[error("Billing connection is not ready; call start_connection first")]
    NotConnected,

    /// I/O error while reading harness input or writing its report
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// A product catalog for the simulated store could not be loaded
    #[error("Invalid catalog: {message}")]
    Catalog {
        /// Description of the catalog problem
        message: String,
    },
}

impl From<std::io::Error> for BridgeError {
    fn from(error: std::io::Error) -> Self {
        BridgeError::Io {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(error: serde_json::Error) -> Self {
        if error.is_io() {
            BridgeError::Io {
                message: error.to_string(),
            }
        } else {
            BridgeError::Catalog {
                message: error.to_string(),
            }
        }
    }
}

impl BridgeError {
    /// Create a MissingField error
    pub fn missing_field(field: &str) -> Self {
        BridgeError::MissingField {
            field: field.to_string(),
        }
    }

    /// Create an InvalidField error
    pub fn invalid_field(field: &str, reason: &str) -> Self {
        BridgeError::InvalidField {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a Catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        BridgeError::Catalog {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::missing_products(BridgeError::missing_field("products"), "products is required")]
    #[case::invalid_product_id(
        BridgeError::invalid_field("products[0].productId", "must not be empty"),
        "products[0].productId is invalid: must not be empty"
    )]
    #[case::no_foreground(
        BridgeError::NoForegroundContext,
        "No foreground activity is available to host the billing flow"
    )]
    #[case::not_connected(
        BridgeError::NotConnected,
        "Billing connection is not ready; call start_connection first"
    )]
    #[case::catalog(BridgeError::catalog("empty"), "Invalid catalog: empty")]
    fn test_error_display(#[case] error: BridgeError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error: BridgeError = io_error.into();
        assert!(matches!(error, BridgeError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: no such file");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let error: BridgeError = json_error.into();
        assert!(matches!(error, BridgeError::Catalog { .. }));
    }
}
