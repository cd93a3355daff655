//! The sale record.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SaleId;

/// Rejected input when creating a sale.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SaleValidationError {
    #[error("Product name is required")]
    ProductRequired,

    #[error("Invalid amount: {0} (must be finite and non-negative)")]
    InvalidAmount(f64),
}

/// A single sale transaction.
///
/// `processed` only ever moves from `false` to `true`; the worker flips it
/// once the sale has been finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub product: String,
    pub amount: f64,
    pub processed: bool,
    /// Creation time, epoch seconds.
    pub timestamp: i64,
}

impl Sale {
    /// Creates a new unprocessed sale stamped with a fresh id and the current time.
    pub fn new(product: impl Into<String>, amount: f64) -> Result<Self, SaleValidationError> {
        let product = product.into();
        if product.trim().is_empty() {
            return Err(SaleValidationError::ProductRequired);
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(SaleValidationError::InvalidAmount(amount));
        }

        Ok(Self {
            id: SaleId::new(),
            product,
            amount,
            processed: false,
            timestamp: chrono::Utc::now().timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sale_is_unprocessed() {
        let sale = Sale::new("Widget", 9.99).unwrap();
        assert!(!sale.processed);
        assert_eq!(sale.product, "Widget");
        assert!(sale.timestamp > 0);
    }

    #[test]
    fn test_rejects_negative_amount() {
        assert_eq!(
            Sale::new("Widget", -1.0),
            Err(SaleValidationError::InvalidAmount(-1.0))
        );
    }

    #[test]
    fn test_rejects_non_finite_amount() {
        assert!(Sale::new("Widget", f64::NAN).is_err());
        assert!(Sale::new("Widget", f64::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_blank_product() {
        assert_eq!(
            Sale::new("  ", 1.0),
            Err(SaleValidationError::ProductRequired)
        );
    }

    #[test]
    fn test_zero_amount_is_allowed() {
        assert!(Sale::new("Freebie", 0.0).is_ok());
    }

    #[test]
    fn test_deserializes_wire_format() {
        let body = r#"{"id":"abc","product":"Widget","amount":9.99,"processed":false,"timestamp":1700000000}"#;
        let sale: Sale = serde_json::from_str(body).unwrap();
        assert_eq!(sale.id, SaleId::from("abc"));
        assert_eq!(sale.product, "Widget");
        assert_eq!(sale.amount, 9.99);
        assert!(!sale.processed);
        assert_eq!(sale.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let body = r#"{"id":"abc","product":"Widget"}"#;
        assert!(serde_json::from_str::<Sale>(body).is_err());
    }
}
