//! Shared types for the sales worker.
//!
//! The [`Sale`] record is the wire format carried on the queue and the
//! shape persisted by the sale store.

pub mod sale;
pub mod types;

pub use sale::{Sale, SaleValidationError};
pub use types::SaleId;
