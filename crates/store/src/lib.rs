//! Keyed stores backing the sales worker.
//!
//! - [`SaleStore`] holds sale records and supports the targeted
//!   processed-flag update the worker performs.
//! - [`IdempotencyStore`] records which sales have completed the pipeline.
//!
//! Both come with an in-memory implementation for tests and a PostgreSQL
//! implementation for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{Sale, SaleId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryIdempotencyStore, InMemorySaleStore};
pub use postgres::{PostgresIdempotencyStore, PostgresSaleStore, run_migrations};
pub use store::{IdempotencyStore, SaleStore};
