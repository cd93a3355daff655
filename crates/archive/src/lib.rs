//! Write-once object archive for processed sale messages.
//!
//! Objects are addressed by bucket and key. Keys for sales are partitioned by
//! UTC day (see [`sale_key`]) so retention can be applied by date prefix.

pub mod error;
pub mod fs;
pub mod key;
pub mod memory;
pub mod store;

pub use error::{ArchiveError, Result};
pub use fs::FsBlobStore;
pub use key::sale_key;
pub use memory::InMemoryBlobStore;
pub use store::BlobStore;
